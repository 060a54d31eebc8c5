//! Loan command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use loanbook_core::{LendingRecord, LendingStatus, LoanChanges, NewLoan, Store};

use crate::output::Output;
use crate::prompt::confirm;

/// Arguments for `loan create`
pub struct CreateArgs {
    pub borrower: String,
    pub equipment: Vec<String>,
    pub supervisor: Option<String>,
    pub from: Option<NaiveDate>,
    pub until: NaiveDate,
    pub purpose: String,
}

/// Open a new loan
pub fn create(store: &mut Store, args: CreateArgs, output: &Output) -> Result<()> {
    let borrow_date = args.from.unwrap_or_else(|| Local::now().date_naive());
    let supervisor = match args.supervisor {
        Some(id) => Some(id),
        None => store.latest_supervisor(&args.borrower).map(|academic| {
            output.message(&format!(
                "Using supervisor {} from the latest loan",
                academic.staff_id
            ));
            academic.staff_id.clone()
        }),
    };

    let record = store
        .create_loan(NewLoan {
            borrower_id: args.borrower,
            equipment_ids: args.equipment,
            supervisor_id: supervisor,
            borrow_date,
            return_date: args.until,
            purpose: args.purpose,
        })
        .context("Failed to create loan")?
        .clone();

    output.success(&format!("Created loan: {}", record.id));
    output.print_loan(&record, store.people(), store.registry())
}

/// List loans, filtered by borrower or equipment
pub fn list(
    store: &Store,
    borrower: Option<String>,
    equipment: Option<String>,
    active: bool,
    output: &Output,
) -> Result<()> {
    let mut records: Vec<&LendingRecord> = match (borrower, equipment) {
        (Some(_), Some(_)) => bail!("Use either --borrower or --equipment, not both"),
        (Some(ref id), None) => store.loans_by_borrower(id),
        (None, Some(ref id)) => store.loans_by_equipment(id),
        (None, None) => store.all_loans().iter().collect(),
    };
    if active {
        records.retain(|r| r.is_active());
    }
    output.print_loans(&records, store.people())
}

/// Show a single loan
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let record = store
        .get_loan(&id)
        .ok_or_else(|| anyhow::anyhow!("Loan not found: {}", id))?;
    output.print_loan(record, store.people(), store.registry())
}

/// Apply the given changes to a loan
pub fn update(store: &mut Store, id: String, changes: LoanChanges, output: &Output) -> Result<()> {
    let record = store
        .update_loan(&id, changes)
        .with_context(|| format!("Failed to update loan {}", id))?
        .clone();

    output.success(&format!("Updated loan: {} ({})", record.id, record.status));
    Ok(())
}

/// Mark a loan returned
pub fn return_loan(store: &mut Store, id: String, output: &Output) -> Result<()> {
    update(
        store,
        id,
        LoanChanges {
            status: Some(LendingStatus::Returned),
            ..Default::default()
        },
        output,
    )
}

/// Delete a loan, releasing its equipment
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let record = store
        .get_loan(&id)
        .ok_or_else(|| anyhow::anyhow!("Loan not found: {}", id))?;

    if !yes && output.should_prompt() {
        println!(
            "Delete loan: {} - {} ({})",
            record.id,
            record.borrower_id,
            record.equipment_ids.join(", ")
        );
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    store.delete_loan(&id).context("Failed to delete loan")?;

    output.success(&format!("Deleted loan: {}", id));
    Ok(())
}

/// List loans marked Overdue, re-reading the data files first
pub fn overdue(store: &mut Store, output: &Output) -> Result<()> {
    let records: Vec<LendingRecord> = store
        .overdue_loans()
        .context("Failed to reload lending records")?
        .into_iter()
        .cloned()
        .collect();
    let refs: Vec<&LendingRecord> = records.iter().collect();
    output.print_loans(&refs, store.people())
}

/// Write the overdue report, re-reading the data files first
pub fn export_overdue(store: &mut Store, path: &Path, output: &Output) -> Result<()> {
    let count = store
        .export_overdue(path)
        .with_context(|| format!("Failed to export report to {}", path.display()))?;

    output.success(&format!(
        "Exported {} overdue loan(s) to {}",
        count,
        path.display()
    ));
    Ok(())
}
