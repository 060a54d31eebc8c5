//! Plain-text reports
//!
//! A report is a title, a dashed rule, then one numbered line per entry.
//! Entries keep the order they were given in, so callers pass the already
//! sorted output of `Ledger::overdue` or `Registry::list_available`.

use std::path::Path;

use crate::models::{Equipment, LendingRecord};
use crate::storage::codec::{format_date, format_optional_date};
use crate::storage::{RecordFile, StorageResult};

pub const OVERDUE_TITLE: &str = "Overdue Lending Records Report";
pub const AVAILABLE_TITLE: &str = "Available Equipment Report";

const RULE: &str = "----------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    title: String,
    entries: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    /// Overdue loans, in the order given
    pub fn overdue_loans(records: &[&LendingRecord]) -> Self {
        let mut report = Self::new(OVERDUE_TITLE);
        for record in records {
            report.push(describe_loan(record));
        }
        report
    }

    /// Available equipment, in the order given
    pub fn available_equipment(items: &[&Equipment]) -> Self {
        let mut report = Self::new(AVAILABLE_TITLE);
        for item in items {
            report.push(describe_equipment(item));
        }
        report
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header lines followed by numbered entries
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        [self.title.clone(), RULE.to_string()].into_iter().chain(
            self.entries
                .iter()
                .enumerate()
                .map(|(i, entry)| format!("{}. {}", i + 1, entry)),
        )
    }

    /// Write the report to `path`, replacing any previous file
    pub fn write_to(&self, path: &Path) -> StorageResult<()> {
        RecordFile::new(path).rewrite(self.lines())
    }
}

fn describe_loan(record: &LendingRecord) -> String {
    let mut line = format!(
        "{} | Borrower: {} | Equipment: {} | {} to {} | {}",
        record.id,
        record.borrower_id,
        record.equipment_ids.join(", "),
        format_date(record.borrow_date),
        format_date(record.return_date),
        record.status
    );
    if let Some(ref supervisor) = record.supervisor_id {
        line.push_str(&format!(" | Supervisor: {}", supervisor));
    }
    if !record.purpose.is_empty() {
        line.push_str(&format!(" | Purpose: {}", record.purpose));
    }
    line
}

fn describe_equipment(item: &Equipment) -> String {
    format!(
        "{} | {} | {} | {} | Purchased: {}",
        item.id,
        item.name,
        item.status,
        item.condition,
        format_optional_date(item.purchase_date)
    )
}
