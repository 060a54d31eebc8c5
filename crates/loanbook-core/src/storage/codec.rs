//! Positional line codecs
//!
//! Each resource is one line per entity, fields separated by `,` and trimmed
//! on read. Lists inside a field use `;`.
//!
//! ```text
//! EQ001, Camera, Available, 2024-03-01, Good
//! L001, S01, EQ001;EQ002, A01, 2025-01-01, 2025-01-10, Borrowed, Lab work
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::ids::dedupe_preserving_order;
use crate::models::{Equipment, LendingRecord};

pub const FIELD_DELIMITER: char = ',';
pub const LIST_DELIMITER: char = ';';
/// Supervisor placeholder for borrowers without one
pub const NO_SUPERVISOR: &str = "-";
/// Placeholder for an unknown optional date
pub const NO_DATE: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A durable line that failed field-count or field parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed {kind} record '{line}': {reason}")]
pub struct MalformedRecord {
    pub kind: &'static str,
    pub line: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(kind: &'static str, line: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// A record type with a fixed positional line format
pub trait LineRecord: Sized {
    /// Human-readable resource name used in diagnostics
    const KIND: &'static str;
    const FIELD_COUNT: usize;

    /// The identifier stored in the first field
    fn record_id(&self) -> &str;

    fn to_fields(&self) -> Vec<String>;

    /// Build a record from already split and trimmed fields
    fn from_fields(fields: &[&str]) -> Result<Self, String>;

    fn encode(&self) -> String {
        self.to_fields().join(", ")
    }

    fn decode(line: &str) -> Result<Self, MalformedRecord> {
        let fields = split_fields(line);
        if fields.len() != Self::FIELD_COUNT {
            return Err(MalformedRecord::new(
                Self::KIND,
                line,
                format!(
                    "expected {} fields, found {}",
                    Self::FIELD_COUNT,
                    fields.len()
                ),
            ));
        }
        Self::from_fields(&fields).map_err(|reason| MalformedRecord::new(Self::KIND, line, reason))
    }
}

/// Split a line into trimmed fields
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_DELIMITER).map(str::trim).collect()
}

/// The identifier of a raw line, if it has one
pub fn line_id(line: &str) -> Option<&str> {
    line.split(FIELD_DELIMITER)
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}': {}", value, e))
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| NO_DATE.to_string())
}

pub fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, String> {
    if value.is_empty() || value.eq_ignore_ascii_case(NO_DATE) {
        Ok(None)
    } else {
        parse_date(value).map(Some)
    }
}

fn require_id(value: &str, field: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(value.to_string())
    }
}

impl LineRecord for Equipment {
    const KIND: &'static str = "equipment";
    const FIELD_COUNT: usize = 5;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.status.to_string(),
            format_optional_date(self.purchase_date),
            self.condition.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        Ok(Equipment::new(
            require_id(fields[0], "equipment id")?,
            fields[1],
            fields[2].parse().map_err(|e| format!("{}", e))?,
            parse_optional_date(fields[3])?,
            fields[4].parse().map_err(|e| format!("{}", e))?,
        ))
    }
}

impl LineRecord for LendingRecord {
    const KIND: &'static str = "lending";
    const FIELD_COUNT: usize = 8;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn to_fields(&self) -> Vec<String> {
        let separator = LIST_DELIMITER.to_string();
        vec![
            self.id.clone(),
            self.borrower_id.clone(),
            self.equipment_ids.join(&separator),
            self.supervisor_id
                .clone()
                .unwrap_or_else(|| NO_SUPERVISOR.to_string()),
            format_date(self.borrow_date),
            format_date(self.return_date),
            self.status.to_string(),
            self.purpose.clone(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        let equipment_ids = dedupe_preserving_order(
            fields[2]
                .split(LIST_DELIMITER)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        );
        if equipment_ids.is_empty() {
            return Err("no equipment listed".to_string());
        }

        let supervisor_id = match fields[3] {
            "" | NO_SUPERVISOR => None,
            id => Some(id.to_string()),
        };

        let borrow_date = parse_date(fields[4])?;
        let return_date = parse_date(fields[5])?;
        if return_date < borrow_date {
            return Err(format!(
                "return date {} precedes borrow date {}",
                return_date, borrow_date
            ));
        }

        Ok(LendingRecord {
            id: require_id(fields[0], "record id")?,
            borrower_id: require_id(fields[1], "borrower id")?,
            equipment_ids,
            supervisor_id,
            borrow_date,
            return_date,
            status: fields[6].parse().map_err(|e| format!("{}", e))?,
            purpose: fields[7].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, EquipmentStatus, LendingStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_decode_equipment_line() {
        let equipment = Equipment::decode("EQ001,  Camera , available, 2024-03-01, good").unwrap();
        assert_eq!(equipment.id, "EQ001");
        assert_eq!(equipment.name, "Camera");
        assert_eq!(equipment.status, EquipmentStatus::Available);
        assert_eq!(equipment.purchase_date, Some(date(2024, 3, 1)));
        assert_eq!(equipment.condition, Condition::Good);
    }

    #[test]
    fn test_equipment_without_date() {
        let equipment = Equipment::decode("EQ002, Tripod, Unavailable, N/A, Damaged").unwrap();
        assert_eq!(equipment.purchase_date, None);
        assert_eq!(
            equipment.encode(),
            "EQ002, Tripod, Unavailable, N/A, Damaged"
        );
    }

    #[test]
    fn test_equipment_field_count_rejected() {
        let err = Equipment::decode("EQ001, Camera, Available, 2024-03-01").unwrap_err();
        assert_eq!(err.kind, "equipment");
        assert!(err.reason.contains("expected 5 fields, found 4"));

        assert!(Equipment::decode("EQ001, Cam, era, Available, 2024-03-01, Good").is_err());
    }

    #[test]
    fn test_equipment_bad_values_rejected() {
        assert!(Equipment::decode("EQ001, Camera, Lost, 2024-03-01, Good").is_err());
        assert!(Equipment::decode("EQ001, Camera, Available, 03/01/2024, Good").is_err());
        assert!(Equipment::decode(", Camera, Available, 2024-03-01, Good").is_err());
    }

    #[test]
    fn test_decode_lending_line() {
        let record = LendingRecord::decode(
            "L001, S01, EQ001;EQ002;EQ001, A01, 2025-01-01, 2025-01-10, Borrowed, Lab work",
        )
        .unwrap();
        assert_eq!(record.id, "L001");
        assert_eq!(record.borrower_id, "S01");
        assert_eq!(record.equipment_ids, vec!["EQ001", "EQ002"]);
        assert_eq!(record.supervisor_id.as_deref(), Some("A01"));
        assert_eq!(record.borrow_date, date(2025, 1, 1));
        assert_eq!(record.return_date, date(2025, 1, 10));
        assert_eq!(record.status, LendingStatus::Borrowed);
        assert_eq!(record.purpose, "Lab work");
    }

    #[test]
    fn test_lending_line_without_supervisor() {
        let line = "L002, P01, EQ003, -, 2025-02-01, 2025-02-03, Overdue, Workshop";
        let record = LendingRecord::decode(line).unwrap();
        assert!(record.supervisor_id.is_none());
        assert_eq!(record.encode(), line);
    }

    #[test]
    fn test_lending_line_rejections() {
        // Purpose containing the delimiter splits into too many fields
        assert!(LendingRecord::decode(
            "L001, S01, EQ001, A01, 2025-01-01, 2025-01-10, Borrowed, Lab, work"
        )
        .is_err());
        // Return before borrow
        assert!(LendingRecord::decode(
            "L001, S01, EQ001, A01, 2025-01-10, 2025-01-01, Borrowed, Lab work"
        )
        .is_err());
        // No equipment
        assert!(
            LendingRecord::decode("L001, S01, ;, A01, 2025-01-01, 2025-01-10, Borrowed, Lab")
                .is_err()
        );
    }

    #[test]
    fn test_line_id() {
        assert_eq!(line_id(" L001 , S01"), Some("L001"));
        assert_eq!(line_id(""), None);
    }
}
