//! Equipment registry
//!
//! Owns every [`Equipment`] entity and the ID index over them, and enforces
//! the status/condition rules. In-memory state is the source of truth between
//! explicit [`Registry::reload`] calls; every mutation is written to the
//! equipment file before memory changes.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{Error, Result, Violation};
use crate::ids::{contains_reserved, next_sequential_id, EQUIPMENT_PREFIX};
use crate::models::{Condition, Equipment, EquipmentStatus};
use crate::storage::Table;

const KIND: &str = "equipment";

#[derive(Debug)]
pub struct Registry {
    table: Table<Equipment>,
    equipment: Vec<Equipment>,
    by_id: HashMap<String, usize>,
}

impl Registry {
    /// Load the registry from its table
    pub fn load(table: Table<Equipment>) -> Result<Self> {
        let mut registry = Self {
            table,
            equipment: Vec::new(),
            by_id: HashMap::new(),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Replace in-memory state with the contents of the equipment file
    ///
    /// Lines repeating an earlier identifier are skipped.
    pub fn reload(&mut self) -> Result<()> {
        let loaded = self.table.load()?;
        let mut equipment = Vec::with_capacity(loaded.len());
        let mut by_id = HashMap::with_capacity(loaded.len());

        for item in loaded {
            if by_id.contains_key(&item.id) {
                warn!(id = %item.id, path = ?self.table.path(), "Skipping duplicate equipment ID");
                continue;
            }
            by_id.insert(item.id.clone(), equipment.len());
            equipment.push(item);
        }

        debug!(count = equipment.len(), "Equipment registry loaded");
        self.equipment = equipment;
        self.by_id = by_id;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Equipment> {
        self.by_id.get(id).map(|&idx| &self.equipment[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.equipment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty()
    }

    /// First item whose name matches `name`, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&Equipment> {
        let name = name.trim();
        self.equipment
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Identifier a newly registered item would receive
    pub fn next_id(&self) -> String {
        next_sequential_id(EQUIPMENT_PREFIX, self.equipment.iter().map(|e| e.id.as_str()))
    }

    /// Add a new item
    ///
    /// Names are not required to be unique.
    pub fn register(&mut self, equipment: Equipment) -> Result<()> {
        validate_text("equipment id", &equipment.id)?;
        validate_text("name", &equipment.name)?;

        if self.contains(&equipment.id) {
            return Err(Error::AlreadyExists {
                kind: KIND,
                id: equipment.id,
            });
        }
        if equipment.status == EquipmentStatus::Borrowed {
            return Err(Violation::BorrowedReserved.into());
        }
        if !equipment.condition.is_allowed_for(equipment.status) {
            return Err(Violation::ConditionNotAllowed {
                condition: equipment.condition,
                status: equipment.status,
            }
            .into());
        }

        self.table.append(&equipment)?;

        info!(id = %equipment.id, name = %equipment.name, "Registered equipment");
        self.by_id.insert(equipment.id.clone(), self.equipment.len());
        self.equipment.push(equipment);
        Ok(())
    }

    /// Change the status of an item that is not on loan
    ///
    /// Moving between Available and Unavailable requires a condition from
    /// the new status's vocabulary. Keeping the status with no condition is a
    /// no-op.
    pub fn apply_status_change(
        &mut self,
        id: &str,
        new_status: EquipmentStatus,
        condition: Option<Condition>,
    ) -> Result<&Equipment> {
        let current = self.get(id).ok_or_else(|| Error::not_found(KIND, id))?;

        if current.status == EquipmentStatus::Borrowed {
            return Err(Violation::EquipmentOnLoan { id: id.to_string() }.into());
        }
        if new_status == EquipmentStatus::Borrowed {
            return Err(Violation::BorrowedReserved.into());
        }

        let condition = match condition {
            Some(condition) => condition,
            None if new_status == current.status => return self.existing(id),
            None => {
                return Err(Violation::ConditionRequired {
                    id: id.to_string(),
                    from: current.status,
                    to: new_status,
                }
                .into())
            }
        };
        if !condition.is_allowed_for(new_status) {
            return Err(Violation::ConditionNotAllowed {
                condition,
                status: new_status,
            }
            .into());
        }

        let mut updated = current.clone();
        let from = updated.status;
        updated.status = new_status;
        updated.condition = condition;
        self.persist(updated)?;

        info!(id, %from, to = %new_status, %condition, "Equipment status changed");
        self.existing(id)
    }

    /// Change only the condition, keeping the status
    ///
    /// Allowed while on loan since the status itself is untouched.
    pub fn set_condition(&mut self, id: &str, condition: Condition) -> Result<&Equipment> {
        let current = self.get(id).ok_or_else(|| Error::not_found(KIND, id))?;
        if !condition.is_allowed_for(current.status) {
            return Err(Violation::ConditionNotAllowed {
                condition,
                status: current.status,
            }
            .into());
        }
        if current.condition == condition {
            return self.existing(id);
        }

        let mut updated = current.clone();
        updated.condition = condition;
        self.persist(updated)?;

        info!(id, %condition, "Equipment condition changed");
        self.existing(id)
    }

    /// Remove an item that is not on loan, rewriting the whole file
    pub fn remove(&mut self, id: &str) -> Result<Equipment> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::not_found(KIND, id))?;
        if self.equipment[idx].status == EquipmentStatus::Borrowed {
            return Err(Violation::EquipmentOnLoan { id: id.to_string() }.into());
        }

        self.table
            .save_all(self.equipment.iter().filter(|e| e.id != id))?;

        let removed = self.equipment.remove(idx);
        self.rebuild_index();
        info!(id, name = %removed.name, "Removed equipment");
        Ok(removed)
    }

    /// Every item in load and registration order
    pub fn list_all(&self) -> &[Equipment] {
        &self.equipment
    }

    /// Available items sorted by name, then acquisition date
    ///
    /// Empty names and unknown dates sort last.
    pub fn list_available(&self) -> Vec<&Equipment> {
        let mut available: Vec<&Equipment> = self
            .equipment
            .iter()
            .filter(|e| e.is_available())
            .collect();
        available.sort_by(|a, b| {
            compare_name(&a.name, &b.name)
                .then_with(|| compare_dates(a, b))
                .then_with(|| a.id.cmp(&b.id))
        });
        available
    }

    /// Push a loan-driven status onto several items in one write
    ///
    /// Only the ledger calls this. Items already in the target status are
    /// left alone; unknown identifiers fail before anything is written. An
    /// item released from Unavailable comes back in Good condition.
    pub(crate) fn set_loan_state(&mut self, changes: &[(String, EquipmentStatus)]) -> Result<()> {
        let mut pending: HashMap<&str, Equipment> = HashMap::new();
        for (id, status) in changes {
            let current = self.existing(id)?;
            if current.status == *status {
                continue;
            }
            let mut updated = current.clone();
            updated.status = *status;
            if !updated.condition.is_allowed_for(*status) {
                updated.condition = Condition::Good;
            }
            pending.insert(id.as_str(), updated);
        }
        if pending.is_empty() {
            return Ok(());
        }

        let changed = self.table.replace_each(|id| pending.get(id))?;
        if changed < pending.len() {
            warn!(
                expected = pending.len(),
                changed,
                path = ?self.table.path(),
                "Some equipment lines were missing from the file"
            );
        }

        for (id, updated) in pending {
            if let Some(&idx) = self.by_id.get(id) {
                self.equipment[idx] = updated;
            }
        }
        Ok(())
    }

    fn existing(&self, id: &str) -> Result<&Equipment> {
        self.get(id).ok_or_else(|| Error::not_found(KIND, id))
    }

    /// Write one changed item, then apply it in memory
    fn persist(&mut self, updated: Equipment) -> Result<()> {
        if !self.table.replace(&updated)? {
            warn!(id = %updated.id, "Equipment line missing from file, appending");
            self.table.append(&updated)?;
        }
        if let Some(&idx) = self.by_id.get(&updated.id) {
            self.equipment[idx] = updated;
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.by_id = self
            .equipment
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id.clone(), idx))
            .collect();
    }
}

fn validate_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
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

fn compare_name(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

fn compare_dates(a: &Equipment, b: &Equipment) -> Ordering {
    match (a.purchase_date, b.purchase_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
