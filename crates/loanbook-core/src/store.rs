//! Unified storage interface
//!
//! The `Store` is the single process-scoped context. It owns:
//! - the people directory (students and staff, read-only here)
//! - the equipment registry
//! - the lending ledger
//!
//! and keeps them consistent with the record files in the data directory.
//! In-memory state is only refreshed by an explicit [`Store::reload`], or by
//! [`Store::overdue_loans`], which reloads by contract.
//!
//! The data directory is assumed to be owned by one running instance. Files
//! are not locked, so a second writer can corrupt state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let camera = store.register_equipment(NewEquipment::available("Camera"))?.id.clone();
//! store.create_loan(NewLoan {
//!     borrower_id: "S01".into(),
//!     equipment_ids: vec![camera],
//!     supervisor_id: Some("A01".into()),
//!     borrow_date,
//!     return_date,
//!     purpose: "Lab work".into(),
//! })?;
//! ```

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, LoanRequest, LoanUpdate};
use crate::models::{Condition, Equipment, EquipmentStatus, LendingRecord, LendingStatus};
use crate::people::{Academic, Borrower, People, Student};
use crate::registry::Registry;
use crate::report::Report;
use crate::storage::{RecordFile, Table};

/// Equipment to register under a generated identifier
#[derive(Debug, Clone)]
pub struct NewEquipment {
    pub name: String,
    pub status: EquipmentStatus,
    pub purchase_date: Option<NaiveDate>,
    pub condition: Condition,
}

impl NewEquipment {
    /// An Available item in Good condition with no known purchase date
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: EquipmentStatus::Available,
            purchase_date: None,
            condition: Condition::Good,
        }
    }
}

/// A loan described by identifiers
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub borrower_id: String,
    pub equipment_ids: Vec<String>,
    pub supervisor_id: Option<String>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub purpose: String,
}

/// Sparse loan changes described by identifiers
#[derive(Debug, Clone, Default)]
pub struct LoanChanges {
    pub borrower_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub equipment_ids: Option<Vec<String>>,
    pub borrow_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub status: Option<LendingStatus>,
    pub purpose: Option<String>,
}

/// Unified storage interface for loanbook
pub struct Store {
    config: Config,
    people: People,
    registry: Registry,
    ledger: Ledger,
}

impl Store {
    /// Open the store using the default configuration
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    ///
    /// Missing record files are treated as empty.
    pub fn open_with_config(config: Config) -> anyhow::Result<Self> {
        config.ensure_data_dir()?;

        let people = People::load(&config.students_path(), &config.staff_path())
            .context("Failed to load people")?;
        let registry = Registry::load(Table::new(RecordFile::new(config.equipment_path())))
            .context("Failed to load equipment")?;
        let ledger = Ledger::load(
            Table::new(RecordFile::new(config.lending_path())),
            &people,
            &registry,
        )
        .context("Failed to load lending records")?;

        Ok(Self {
            config,
            people,
            registry,
            ledger,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn people(&self) -> &People {
        &self.people
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Re-read people, equipment and lending records from disk, in that order
    pub fn reload(&mut self) -> Result<()> {
        self.people = People::load(&self.config.students_path(), &self.config.staff_path())?;
        self.registry.reload()?;
        self.ledger.reload(&self.people, &self.registry)?;
        debug!(
            people = self.people.len(),
            equipment = self.registry.len(),
            loans = self.ledger.len(),
            "Store reloaded"
        );
        Ok(())
    }

    // ==================== Equipment Operations ====================

    /// Register equipment under the next free identifier
    pub fn register_equipment(&mut self, new: NewEquipment) -> Result<&Equipment> {
        let id = self.registry.next_id();
        self.add_equipment(Equipment::new(
            id,
            new.name,
            new.status,
            new.purchase_date,
            new.condition,
        ))
    }

    /// Register equipment carrying its own identifier
    pub fn add_equipment(&mut self, equipment: Equipment) -> Result<&Equipment> {
        let id = equipment.id.clone();
        self.registry.register(equipment)?;
        self.registry
            .get(&id)
            .ok_or_else(|| Error::not_found("equipment", id))
    }

    pub fn get_equipment(&self, id: &str) -> Option<&Equipment> {
        self.registry.get(id)
    }

    pub fn list_equipment(&self) -> &[Equipment] {
        self.registry.list_all()
    }

    pub fn list_available(&self) -> Vec<&Equipment> {
        self.registry.list_available()
    }

    pub fn set_equipment_status(
        &mut self,
        id: &str,
        status: EquipmentStatus,
        condition: Option<Condition>,
    ) -> Result<&Equipment> {
        self.registry.apply_status_change(id, status, condition)
    }

    pub fn set_equipment_condition(&mut self, id: &str, condition: Condition) -> Result<&Equipment> {
        self.registry.set_condition(id, condition)
    }

    /// Remove equipment that is not on loan
    ///
    /// Lending history keeps referring to the identifier; those references
    /// are dropped on the next reload.
    pub fn remove_equipment(&mut self, id: &str) -> Result<Equipment> {
        self.registry.remove(id)
    }

    // ==================== Loan Operations ====================

    /// Open a loan under the next free identifier
    pub fn create_loan(&mut self, loan: NewLoan) -> Result<&LendingRecord> {
        let borrower = find_borrower(&self.people, &loan.borrower_id)?;
        let supervisor = if borrower.requires_supervisor() {
            loan.supervisor_id
                .as_deref()
                .map(|id| find_academic(&self.people, id))
                .transpose()?
        } else {
            None
        };

        let id = self.ledger.next_id();
        self.ledger.create_loan(
            &mut self.registry,
            id,
            LoanRequest {
                borrower,
                equipment_ids: loan.equipment_ids,
                supervisor,
                borrow_date: loan.borrow_date,
                return_date: loan.return_date,
                purpose: loan.purpose,
            },
        )
    }

    /// Apply sparse changes to a loan
    pub fn update_loan(&mut self, id: &str, changes: LoanChanges) -> Result<&LendingRecord> {
        let borrower = changes
            .borrower_id
            .as_deref()
            .map(|bid| find_borrower(&self.people, bid))
            .transpose()?;
        let supervisor = changes
            .supervisor_id
            .as_deref()
            .map(|sid| find_academic(&self.people, sid))
            .transpose()?;

        self.ledger.update_loan(
            &mut self.registry,
            &self.people,
            id,
            LoanUpdate {
                borrower,
                supervisor,
                equipment_ids: changes.equipment_ids,
                borrow_date: changes.borrow_date,
                return_date: changes.return_date,
                status: changes.status,
                purpose: changes.purpose,
            },
        )
    }

    /// Mark a loan Returned, releasing its equipment
    pub fn return_loan(&mut self, id: &str) -> Result<&LendingRecord> {
        self.update_loan(
            id,
            LoanChanges {
                status: Some(LendingStatus::Returned),
                ..Default::default()
            },
        )
    }

    pub fn delete_loan(&mut self, id: &str) -> Result<LendingRecord> {
        self.ledger.delete_loan(&mut self.registry, id)
    }

    pub fn get_loan(&self, id: &str) -> Option<&LendingRecord> {
        self.ledger.get(id)
    }

    pub fn all_loans(&self) -> &[LendingRecord] {
        self.ledger.all()
    }

    pub fn loans_by_borrower(&self, borrower_id: &str) -> Vec<&LendingRecord> {
        self.ledger.by_borrower(borrower_id)
    }

    pub fn loans_by_equipment(&self, equipment_id: &str) -> Vec<&LendingRecord> {
        self.ledger.by_equipment(equipment_id)
    }

    /// Reload everything from disk, then list Overdue loans oldest first
    pub fn overdue_loans(&mut self) -> Result<Vec<&LendingRecord>> {
        self.reload()?;
        Ok(self.ledger.overdue())
    }

    // ==================== Reports ====================

    /// Write the overdue report to `path`, reloading first
    ///
    /// Returns the number of loans written.
    pub fn export_overdue(&mut self, path: &Path) -> Result<usize> {
        let report = Report::overdue_loans(&self.overdue_loans()?);
        report.write_to(path)?;
        info!(path = ?path, count = report.len(), "Exported overdue report");
        Ok(report.len())
    }

    /// Write the available-equipment report to `path`
    ///
    /// Returns the number of items written.
    pub fn export_available(&self, path: &Path) -> Result<usize> {
        let report = Report::available_equipment(&self.list_available());
        report.write_to(path)?;
        info!(path = ?path, count = report.len(), "Exported available equipment report");
        Ok(report.len())
    }

    // ==================== People ====================

    /// Students an academic supervises on active loans
    pub fn supervised_students(&self, academic_id: &str) -> Result<Vec<&Student>> {
        find_academic(&self.people, academic_id)?;
        Ok(self
            .ledger
            .supervised_students(academic_id)
            .into_iter()
            .filter_map(|id| self.people.student(id))
            .collect())
    }

    /// The academic on a student's most recent supervised loan
    pub fn latest_supervisor(&self, student_id: &str) -> Option<&Academic> {
        self.ledger
            .latest_supervisor(student_id)
            .and_then(|id| self.people.academic(id))
    }

    // ==================== Statistics ====================

    pub fn equipment_count(&self) -> usize {
        self.registry.len()
    }

    pub fn loan_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn active_loan_count(&self) -> usize {
        self.ledger.all().iter().filter(|r| r.is_active()).count()
    }
}

fn find_borrower<'a>(people: &'a People, id: &str) -> Result<&'a Borrower> {
    people
        .borrower(id)
        .ok_or_else(|| Error::not_found("borrower", id))
}

fn find_academic<'a>(people: &'a People, id: &str) -> Result<&'a Academic> {
    people
        .academic(id)
        .ok_or_else(|| Error::not_found("academic", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let config = Config::with_data_dir(temp_dir.path());
        std::fs::write(
            config.students_path(),
            "S01, P100, Ada Lovelace, 2003-12-10, ada@example.edu\n\
             S02, P101, Grace Hopper, 2004-01-02, grace@example.edu\n",
        )
        .unwrap();
        std::fs::write(
            config.staff_path(),
            "A01, P200, Alan Turing, 1970-06-23, alan@example.edu, academic, Computing\n\
             P01, P300, Ken Thompson, N/A, ken@example.edu, professional, IT Services\n",
        )
        .unwrap();
        config
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lab_loan(borrower: &str, supervisor: Option<&str>, equipment: &[&str]) -> NewLoan {
        NewLoan {
            borrower_id: borrower.to_string(),
            equipment_ids: equipment.iter().map(|s| s.to_string()).collect(),
            supervisor_id: supervisor.map(str::to_string),
            borrow_date: date(2025, 1, 1),
            return_date: date(2025, 1, 10),
            purpose: "Lab work".to_string(),
        }
    }

    #[test]
    fn test_open_empty_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(Config::with_data_dir(temp_dir.path())).unwrap();
        assert_eq!(store.equipment_count(), 0);
        assert_eq!(store.loan_count(), 0);
        assert!(store.people().is_empty());
    }

    #[test]
    fn test_generated_identifiers() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        let first = store
            .register_equipment(NewEquipment::available("Camera"))
            .unwrap()
            .id
            .clone();
        let second = store
            .register_equipment(NewEquipment::available("Tripod"))
            .unwrap()
            .id
            .clone();
        assert_eq!(first, "EQ001");
        assert_eq!(second, "EQ002");

        let loan = store.create_loan(lab_loan("P01", None, &["EQ001"])).unwrap();
        assert_eq!(loan.id, "L001");
    }

    #[test]
    fn test_lend_and_return_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut store = Store::open_with_config(config.clone()).unwrap();
        store
            .register_equipment(NewEquipment::available("Camera"))
            .unwrap();

        store
            .create_loan(lab_loan("S01", Some("A01"), &["EQ001"]))
            .unwrap();
        assert_eq!(
            store.get_equipment("EQ001").unwrap().status,
            EquipmentStatus::Borrowed
        );

        store.return_loan("L001").unwrap();
        assert_eq!(
            store.get_equipment("EQ001").unwrap().status,
            EquipmentStatus::Available
        );
        let history = store.loans_by_equipment("EQ001");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, LendingStatus::Returned);

        // Everything survives a reopen
        let reopened = Store::open_with_config(config).unwrap();
        assert_eq!(reopened.all_loans(), store.all_loans());
        assert_eq!(reopened.list_equipment(), store.list_equipment());
    }

    #[test]
    fn test_remove_borrowed_equipment_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        store
            .register_equipment(NewEquipment::available("Camera"))
            .unwrap();
        store
            .create_loan(lab_loan("S01", Some("A01"), &["EQ001"]))
            .unwrap();

        let err = store.remove_equipment("EQ001").unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(Violation::EquipmentOnLoan { .. })
        ));
        assert_eq!(
            store.get_equipment("EQ001").unwrap().status,
            EquipmentStatus::Borrowed
        );
        assert_eq!(store.loans_by_equipment("EQ001").len(), 1);
        assert!(store.get_loan("L001").unwrap().is_active());
    }

    #[test]
    fn test_unknown_people_are_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        store
            .register_equipment(NewEquipment::available("Camera"))
            .unwrap();

        assert!(store
            .create_loan(lab_loan("S99", Some("A01"), &["EQ001"]))
            .unwrap_err()
            .is_not_found());
        // A professional is not an academic supervisor
        assert!(store
            .create_loan(lab_loan("S01", Some("P01"), &["EQ001"]))
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            store.get_equipment("EQ001").unwrap().status,
            EquipmentStatus::Available
        );
    }

    #[test]
    fn test_overdue_loans_reload_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut store = Store::open_with_config(config.clone()).unwrap();
        for name in ["Camera", "Tripod"] {
            store
                .register_equipment(NewEquipment::available(name))
                .unwrap();
        }
        store.create_loan(lab_loan("P01", None, &["EQ001"])).unwrap();
        store.create_loan(lab_loan("A01", None, &["EQ002"])).unwrap();
        assert!(store.overdue_loans().unwrap().is_empty());

        // Another process marks L002 overdue
        let mut other = Store::open_with_config(config).unwrap();
        other
            .update_loan(
                "L002",
                LoanChanges {
                    status: Some(LendingStatus::Overdue),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(store.get_loan("L002").unwrap().status, LendingStatus::Borrowed);
        let overdue: Vec<String> = store
            .overdue_loans()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(overdue, vec!["L002"]);
        assert_eq!(store.get_loan("L002").unwrap().status, LendingStatus::Overdue);
    }

    #[test]
    fn test_export_reports() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        for name in ["Tripod", "Camera", "Microphone"] {
            store
                .register_equipment(NewEquipment::available(name))
                .unwrap();
        }
        store.create_loan(lab_loan("P01", None, &["EQ001"])).unwrap();
        store
            .update_loan(
                "L001",
                LoanChanges {
                    status: Some(LendingStatus::Overdue),
                    ..Default::default()
                },
            )
            .unwrap();

        let overdue_path = temp_dir.path().join("overdue_report.txt");
        assert_eq!(store.export_overdue(&overdue_path).unwrap(), 1);
        let overdue = std::fs::read_to_string(&overdue_path).unwrap();
        let lines: Vec<&str> = overdue.lines().collect();
        assert_eq!(lines[0], crate::report::OVERDUE_TITLE);
        assert!(lines[2].starts_with("1. L001 | Borrower: P01 | Equipment: EQ001"));

        let available_path = temp_dir.path().join("available_report.txt");
        assert_eq!(store.export_available(&available_path).unwrap(), 2);
        let available = std::fs::read_to_string(&available_path).unwrap();
        let lines: Vec<&str> = available.lines().collect();
        assert_eq!(lines[0], crate::report::AVAILABLE_TITLE);
        assert!(lines[2].starts_with("1. EQ002 | Camera |"));
        assert!(lines[3].starts_with("2. EQ003 | Microphone |"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_supervision_lookups() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        for name in ["Camera", "Tripod"] {
            store
                .register_equipment(NewEquipment::available(name))
                .unwrap();
        }
        store
            .create_loan(lab_loan("S01", Some("A01"), &["EQ001"]))
            .unwrap();
        store
            .create_loan(lab_loan("S02", Some("A01"), &["EQ002"]))
            .unwrap();

        let names: Vec<&str> = store
            .supervised_students("A01")
            .unwrap()
            .iter()
            .map(|s| s.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper"]);
        assert_eq!(store.latest_supervisor("S02").unwrap().staff_id, "A01");
        assert!(store.supervised_students("P01").unwrap_err().is_not_found());
        assert_eq!(store.active_loan_count(), 2);
    }

    #[test]
    fn test_reload_picks_up_new_people() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut store = Store::open_with_config(config.clone()).unwrap();
        assert!(store.people().borrower("S03").is_none());

        let mut students = std::fs::read_to_string(config.students_path()).unwrap();
        students.push_str("S03, P102, Katherine Johnson, N/A, kj@example.edu\n");
        std::fs::write(config.students_path(), students).unwrap();

        store.reload().unwrap();
        assert_eq!(
            store.people().borrower("S03").unwrap().full_name(),
            "Katherine Johnson"
        );
    }
}
