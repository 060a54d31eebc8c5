//! Data models for loanbook
//!
//! Defines equipment, its status/condition vocabularies, and lending records.
//! Borrowers live in [`crate::people`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status or condition string that is not part of the vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Lifecycle state of a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Available,
    /// Only ever set by the ledger while an active loan references the item
    Borrowed,
    Unavailable,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "Available",
            EquipmentStatus::Borrowed => "Borrowed",
            EquipmentStatus::Unavailable => "Unavailable",
        }
    }

    /// Available and Borrowed share the in-service condition vocabulary
    pub fn in_service(&self) -> bool {
        !matches!(self, EquipmentStatus::Unavailable)
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            EquipmentStatus::Available,
            EquipmentStatus::Borrowed,
            EquipmentStatus::Unavailable,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ParseValueError {
            kind: "equipment status",
            value: s.to_string(),
            expected: "Available, Borrowed, Unavailable",
        })
    }
}

/// Physical condition of a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Brand New")]
    BrandNew,
    Good,
    Damaged,
    #[serde(rename = "Needs Maintenance")]
    NeedsMaintenance,
    #[serde(rename = "Out of Service")]
    OutOfService,
}

impl Condition {
    /// Conditions for Available or Borrowed equipment
    pub const IN_SERVICE: [Condition; 2] = [Condition::BrandNew, Condition::Good];

    /// Conditions for Unavailable equipment
    pub const OUT_OF_SERVICE: [Condition; 3] = [
        Condition::Damaged,
        Condition::NeedsMaintenance,
        Condition::OutOfService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::BrandNew => "Brand New",
            Condition::Good => "Good",
            Condition::Damaged => "Damaged",
            Condition::NeedsMaintenance => "Needs Maintenance",
            Condition::OutOfService => "Out of Service",
        }
    }

    /// The condition vocabulary for a status
    pub fn allowed_for(status: EquipmentStatus) -> &'static [Condition] {
        if status.in_service() {
            &Self::IN_SERVICE
        } else {
            &Self::OUT_OF_SERVICE
        }
    }

    pub fn is_allowed_for(&self, status: EquipmentStatus) -> bool {
        Self::allowed_for(status).contains(self)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Condition::IN_SERVICE
            .into_iter()
            .chain(Condition::OUT_OF_SERVICE)
            .find(|condition| condition.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseValueError {
                kind: "condition",
                value: s.to_string(),
                expected: "Brand New, Good, Damaged, Needs Maintenance, Out of Service",
            })
    }
}

/// A piece of loanable equipment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    /// Unique, stable identifier (e.g. `EQ001`)
    pub id: String,
    pub name: String,
    pub status: EquipmentStatus,
    /// Acquisition date, unknown for some legacy records
    pub purchase_date: Option<NaiveDate>,
    pub condition: Condition,
}

impl Equipment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        status: EquipmentStatus,
        purchase_date: Option<NaiveDate>,
        condition: Condition,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into().trim().to_string(),
            status,
            purchase_date,
            condition,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == EquipmentStatus::Available
    }
}

/// State of a lending record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LendingStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl LendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LendingStatus::Borrowed => "Borrowed",
            LendingStatus::Returned => "Returned",
            LendingStatus::Overdue => "Overdue",
        }
    }

    /// Anything not yet returned holds its equipment
    pub fn is_active(&self) -> bool {
        !matches!(self, LendingStatus::Returned)
    }
}

impl fmt::Display for LendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LendingStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [
            LendingStatus::Borrowed,
            LendingStatus::Returned,
            LendingStatus::Overdue,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| ParseValueError {
            kind: "lending status",
            value: s.to_string(),
            expected: "Borrowed, Returned, Overdue",
        })
    }
}

/// A lending transaction binding one borrower to one or more items
///
/// Borrower, supervisor and equipment are referenced by identifier only;
/// their entities are owned by the people directory and the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LendingRecord {
    pub id: String,
    pub borrower_id: String,
    /// Non-empty, duplicates collapsed, in the order given
    pub equipment_ids: Vec<String>,
    /// Academic supervising a student borrower
    pub supervisor_id: Option<String>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: LendingStatus,
    pub purpose: String,
}

impl LendingRecord {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn references(&self, equipment_id: &str) -> bool {
        self.equipment_ids.iter().any(|id| id == equipment_id)
    }
}
