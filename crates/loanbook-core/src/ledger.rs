//! Lending ledger
//!
//! The ledger owns every [`LendingRecord`] and three lookup indices over them:
//! by record ID, by borrower ID and by equipment ID. The record vector is the
//! only owner; indices hold identifiers.
//!
//! Every mutation keeps equipment state in step with the records: an item is
//! `Borrowed` exactly when an active (not Returned) record references it.
//! Status pushes go through [`Registry::set_loan_state`].
//!
//! ## Write order
//!
//! 1. Validate the whole request against memory. Nothing is written on failure.
//! 2. Write the lending file (append, single-line replace or full rewrite).
//! 3. Push equipment status in one equipment-file rewrite. If that fails the
//!    lending file is rewritten from the unchanged in-memory records.
//! 4. Apply the change in memory and refresh the indices.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result, Violation};
use crate::ids::{contains_reserved, dedupe_preserving_order, next_sequential_id, LENDING_PREFIX};
use crate::index::ReverseIndex;
use crate::models::{EquipmentStatus, LendingRecord, LendingStatus};
use crate::people::{Academic, Borrower, People};
use crate::registry::Registry;
use crate::storage::Table;

const KIND: &str = "lending record";

/// Everything needed to open a new loan
#[derive(Debug, Clone)]
pub struct LoanRequest<'a> {
    pub borrower: &'a Borrower,
    pub equipment_ids: Vec<String>,
    /// Required for student borrowers, ignored otherwise
    pub supervisor: Option<&'a Academic>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub purpose: String,
}

/// Sparse patch for an existing loan; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct LoanUpdate<'a> {
    pub borrower: Option<&'a Borrower>,
    pub supervisor: Option<&'a Academic>,
    pub equipment_ids: Option<Vec<String>>,
    pub borrow_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub status: Option<LendingStatus>,
    pub purpose: Option<String>,
}

#[derive(Debug)]
pub struct Ledger {
    table: Table<LendingRecord>,
    records: Vec<LendingRecord>,
    by_id: HashMap<String, usize>,
    by_borrower: ReverseIndex,
    by_equipment: ReverseIndex,
}

impl Ledger {
    /// Load the ledger, resolving references against people and equipment
    pub fn load(table: Table<LendingRecord>, people: &People, registry: &Registry) -> Result<Self> {
        let mut ledger = Self {
            table,
            records: Vec::new(),
            by_id: HashMap::new(),
            by_borrower: ReverseIndex::new(),
            by_equipment: ReverseIndex::new(),
        };
        ledger.reload(people, registry)?;
        Ok(ledger)
    }

    /// Replace in-memory records with the contents of the lending file
    ///
    /// Records with an unknown borrower are skipped. Unknown equipment is
    /// dropped from a record, and the record skipped when none remains.
    /// Supervisors are kept only for student borrowers.
    pub fn reload(&mut self, people: &People, registry: &Registry) -> Result<()> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for record in self.table.load()? {
            if seen.contains(&record.id) {
                warn!(record = %record.id, "Skipping duplicate lending record ID");
                continue;
            }
            if let Some(record) = resolve(record, people, registry) {
                seen.insert(record.id.clone());
                records.push(record);
            }
        }

        debug!(count = records.len(), "Lending ledger loaded");
        self.records = records;
        self.rebuild_indices();
        Ok(())
    }

    /// Identifier a newly created loan would receive
    pub fn next_id(&self) -> String {
        next_sequential_id(LENDING_PREFIX, self.records.iter().map(|r| r.id.as_str()))
    }

    /// Open a loan and mark its equipment Borrowed
    pub fn create_loan(
        &mut self,
        registry: &mut Registry,
        id: impl Into<String>,
        request: LoanRequest<'_>,
    ) -> Result<&LendingRecord> {
        let id = id.into();
        validate_text("record id", &id, false)?;
        if self.by_id.contains_key(&id) {
            return Err(Error::AlreadyExists { kind: KIND, id });
        }

        let equipment_ids = normalize_equipment(request.equipment_ids)?;
        check_dates(request.borrow_date, request.return_date)?;
        validate_text("purpose", &request.purpose, true)?;

        let supervisor_id = if request.borrower.requires_supervisor() {
            match request.supervisor {
                Some(academic) => Some(academic.staff_id.clone()),
                None => {
                    return Err(Violation::MissingSupervisor {
                        borrower_id: request.borrower.borrower_id().to_string(),
                    }
                    .into())
                }
            }
        } else {
            None
        };

        for equipment_id in &equipment_ids {
            self.ensure_lendable(registry, equipment_id, &id)?;
        }

        let record = LendingRecord {
            id,
            borrower_id: request.borrower.borrower_id().to_string(),
            equipment_ids,
            supervisor_id,
            borrow_date: request.borrow_date,
            return_date: request.return_date,
            status: LendingStatus::Borrowed,
            purpose: request.purpose.trim().to_string(),
        };
        let changes: Vec<(String, EquipmentStatus)> = record
            .equipment_ids
            .iter()
            .map(|eid| (eid.clone(), EquipmentStatus::Borrowed))
            .collect();

        self.table.append(&record)?;
        if let Err(err) = registry.set_loan_state(&changes) {
            self.restore_file();
            return Err(err);
        }

        info!(
            record = %record.id,
            borrower = %record.borrower_id,
            equipment = ?record.equipment_ids,
            "Created loan"
        );
        let idx = self.records.len();
        self.records.push(record);
        self.index_record(idx);
        Ok(&self.records[idx])
    }

    /// Apply a sparse patch to a loan
    ///
    /// Equipment status is pushed on every update: Borrowed for an active
    /// result, Available once Returned. Items dropped from an active record
    /// are released. Items still held by another active record are never
    /// released.
    pub fn update_loan(
        &mut self,
        registry: &mut Registry,
        people: &People,
        id: &str,
        update: LoanUpdate<'_>,
    ) -> Result<&LendingRecord> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::not_found(KIND, id))?;
        let current = &self.records[idx];
        let mut updated = current.clone();

        let was_student = people.is_student(&current.borrower_id);
        let is_student = match update.borrower {
            Some(borrower) => {
                updated.borrower_id = borrower.borrower_id().to_string();
                borrower.requires_supervisor()
            }
            None => was_student,
        };

        if let Some(ids) = update.equipment_ids {
            updated.equipment_ids = normalize_equipment(ids)?;
            for equipment_id in &updated.equipment_ids {
                if !registry.contains(equipment_id) {
                    return Err(Error::not_found("equipment", equipment_id.as_str()));
                }
            }
        }
        if let Some(date) = update.borrow_date {
            updated.borrow_date = date;
        }
        if let Some(date) = update.return_date {
            updated.return_date = date;
        }
        check_dates(updated.borrow_date, updated.return_date)?;
        if let Some(status) = update.status {
            updated.status = status;
        }
        if let Some(purpose) = update.purpose {
            validate_text("purpose", &purpose, true)?;
            updated.purpose = purpose.trim().to_string();
        }

        updated.supervisor_id = if is_student {
            match update.supervisor {
                Some(academic) => Some(academic.staff_id.clone()),
                None if !was_student => {
                    return Err(Violation::MissingSupervisor {
                        borrower_id: updated.borrower_id.clone(),
                    }
                    .into())
                }
                None => current.supervisor_id.clone(),
            }
        } else {
            None
        };
        if is_student && updated.supervisor_id.is_none() && updated.is_active() {
            return Err(Violation::MissingSupervisor {
                borrower_id: updated.borrower_id.clone(),
            }
            .into());
        }

        let changes = self.equipment_changes(registry, current, &updated)?;

        if !self.table.replace(&updated)? {
            warn!(record = %updated.id, "Lending line missing from file, appending");
            self.table.append(&updated)?;
        }
        if let Err(err) = registry.set_loan_state(&changes) {
            self.restore_file();
            return Err(err);
        }

        info!(record = %updated.id, status = %updated.status, "Updated loan");
        self.records[idx] = updated;
        self.rebuild_indices();
        Ok(&self.records[idx])
    }

    /// Delete a loan, returning its equipment to Available
    pub fn delete_loan(&mut self, registry: &mut Registry, id: &str) -> Result<LendingRecord> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::not_found(KIND, id))?;
        let record = &self.records[idx];
        let lookup: &Registry = registry;

        let changes: Vec<(String, EquipmentStatus)> = record
            .equipment_ids
            .iter()
            .filter(|eid| self.releasable(lookup, eid.as_str(), id))
            .map(|eid| (eid.clone(), EquipmentStatus::Available))
            .collect();

        self.table
            .save_all(self.records.iter().filter(|r| r.id != id))?;
        if let Err(err) = registry.set_loan_state(&changes) {
            self.restore_file();
            return Err(err);
        }

        let removed = self.records.remove(idx);
        self.rebuild_indices();
        info!(record = %removed.id, "Deleted loan");
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&LendingRecord> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    /// Every record in load and creation order
    pub fn all(&self) -> &[LendingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of a borrower; empty when none
    pub fn by_borrower(&self, borrower_id: &str) -> Vec<&LendingRecord> {
        self.lookup(self.by_borrower.get(borrower_id))
    }

    /// Records referencing an item, including returned ones; empty when none
    pub fn by_equipment(&self, equipment_id: &str) -> Vec<&LendingRecord> {
        self.lookup(self.by_equipment.get(equipment_id))
    }

    /// Records marked Overdue, oldest borrow date first
    ///
    /// Reports the stored status only. Nothing here compares dates with
    /// today; use `Store::overdue_loans` to read fresh state from disk.
    pub fn overdue(&self) -> Vec<&LendingRecord> {
        let mut overdue: Vec<&LendingRecord> = self
            .records
            .iter()
            .filter(|r| r.status == LendingStatus::Overdue)
            .collect();
        overdue.sort_by_key(|r| r.borrow_date);
        overdue
    }

    /// Students an academic supervises on active loans
    pub fn supervised_students(&self, academic_id: &str) -> Vec<&str> {
        let mut students: Vec<&str> = Vec::new();
        for record in self.records.iter().filter(|r| r.is_active()) {
            if record.supervisor_id.as_deref() == Some(academic_id)
                && !students.contains(&record.borrower_id.as_str())
            {
                students.push(&record.borrower_id);
            }
        }
        students
    }

    /// Supervisor on a student's most recent supervised loan
    pub fn latest_supervisor(&self, student_id: &str) -> Option<&str> {
        self.by_borrower(student_id)
            .into_iter()
            .filter(|r| r.supervisor_id.is_some())
            .max_by_key(|r| r.borrow_date)
            .and_then(|r| r.supervisor_id.as_deref())
    }

    /// The active record other than `exclude` holding an item, if any
    pub fn active_holder(&self, equipment_id: &str, exclude: &str) -> Option<&LendingRecord> {
        self.by_equipment(equipment_id)
            .into_iter()
            .find(|r| r.id != exclude && r.is_active())
    }

    fn lookup(&self, ids: &[String]) -> Vec<&LendingRecord> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// An item can join a loan when Available and not held elsewhere
    fn ensure_lendable(&self, registry: &Registry, equipment_id: &str, record_id: &str) -> Result<()> {
        let equipment = registry
            .get(equipment_id)
            .ok_or_else(|| Error::not_found("equipment", equipment_id))?;
        if !equipment.is_available() {
            return Err(Violation::EquipmentNotAvailable {
                id: equipment_id.to_string(),
                status: equipment.status,
            }
            .into());
        }
        if let Some(holder) = self.active_holder(equipment_id, record_id) {
            warn!(
                equipment = equipment_id,
                record = %holder.id,
                "Equipment marked Available is held by an active loan"
            );
            return Err(Violation::EquipmentNotAvailable {
                id: equipment_id.to_string(),
                status: EquipmentStatus::Borrowed,
            }
            .into());
        }
        Ok(())
    }

    /// Whether deleting or returning `record_id` may set an item Available
    ///
    /// Items held by another active record stay Borrowed.
    fn releasable(&self, registry: &Registry, equipment_id: &str, record_id: &str) -> bool {
        registry.contains(equipment_id) && self.active_holder(equipment_id, record_id).is_none()
    }

    /// Status pushes needed to move from `current` to `updated`
    fn equipment_changes(
        &self,
        registry: &Registry,
        current: &LendingRecord,
        updated: &LendingRecord,
    ) -> Result<Vec<(String, EquipmentStatus)>> {
        let held_before = |eid: &str| current.is_active() && current.references(eid);
        let mut changes: Vec<(String, EquipmentStatus)> = Vec::new();

        if updated.is_active() {
            for eid in &updated.equipment_ids {
                if !held_before(eid.as_str()) {
                    self.ensure_lendable(registry, eid, &current.id)?;
                }
                changes.push((eid.clone(), EquipmentStatus::Borrowed));
            }
        }

        let still_held = |eid: &str| updated.is_active() && updated.references(eid);
        let released = current
            .equipment_ids
            .iter()
            .filter(|eid| current.is_active() && !still_held(eid.as_str()))
            .chain(updated.equipment_ids.iter().filter(|_| !updated.is_active()));
        for eid in released {
            if changes.iter().any(|(id, _)| id == eid) {
                continue;
            }
            if self.releasable(registry, eid, &current.id) {
                changes.push((eid.clone(), EquipmentStatus::Available));
            }
        }

        Ok(changes)
    }

    /// Put the lending file back in line with memory after a failed push
    fn restore_file(&self) {
        if let Err(err) = self.table.save_all(&self.records) {
            error!(error = %err, path = ?self.table.path(), "Failed to restore lending file");
        }
    }

    fn index_record(&mut self, idx: usize) {
        let record = &self.records[idx];
        self.by_id.insert(record.id.clone(), idx);
        self.by_borrower.insert(&record.borrower_id, &record.id);
        for equipment_id in &record.equipment_ids {
            self.by_equipment.insert(equipment_id, &record.id);
        }
    }

    fn rebuild_indices(&mut self) {
        self.by_id.clear();
        self.by_borrower.clear();
        self.by_equipment.clear();
        for idx in 0..self.records.len() {
            self.index_record(idx);
        }
    }
}

/// Check a loaded record's references, dropping what cannot be resolved
fn resolve(mut record: LendingRecord, people: &People, registry: &Registry) -> Option<LendingRecord> {
    let Some(borrower) = people.borrower(&record.borrower_id) else {
        warn!(
            record = %record.id,
            borrower = %record.borrower_id,
            "Skipping lending record with unknown borrower"
        );
        return None;
    };

    record.equipment_ids.retain(|eid| {
        let known = registry.contains(eid);
        if !known {
            warn!(record = %record.id, equipment = %eid, "Dropping unknown equipment from lending record");
        }
        known
    });
    if record.equipment_ids.is_empty() {
        warn!(record = %record.id, "Skipping lending record with no known equipment");
        return None;
    }

    record.supervisor_id = if borrower.requires_supervisor() {
        match record.supervisor_id.take() {
            Some(sid) if people.academic(&sid).is_some() => Some(sid),
            Some(sid) => {
                warn!(record = %record.id, supervisor = %sid, "Dropping unknown supervisor");
                None
            }
            None => {
                warn!(record = %record.id, "Student loan has no supervisor");
                None
            }
        }
    } else {
        None
    };

    Some(record)
}

fn normalize_equipment(ids: Vec<String>) -> Result<Vec<String>> {
    let ids = dedupe_preserving_order(
        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
    );
    if ids.is_empty() {
        return Err(Violation::EmptyEquipment.into());
    }
    for id in &ids {
        validate_text("equipment id", id, false)?;
    }
    Ok(ids)
}

fn check_dates(borrow_date: NaiveDate, return_date: NaiveDate) -> Result<()> {
    if return_date < borrow_date {
        return Err(Violation::ReturnBeforeBorrow.into());
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str, allow_empty: bool) -> Result<()> {
    if !allow_empty && value.trim().is_empty() {
        return Err(Error::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if contains_reserved(value) {
        return Err(Error::InvalidField {
            field,
            reason: format!("'{}' contains a reserved delimiter", value),
        });
    }
    Ok(())
}
