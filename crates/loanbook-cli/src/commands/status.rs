//! Status command handler

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use loanbook_core::{EquipmentStatus, LendingStatus, Store};

use crate::output::{print_json, Output, OutputFormat};

#[derive(Debug, Serialize)]
struct StatusReport {
    data_dir: PathBuf,
    equipment: EquipmentCounts,
    loans: LoanCounts,
    people: usize,
}

#[derive(Debug, Serialize)]
struct EquipmentCounts {
    total: usize,
    available: usize,
    borrowed: usize,
    unavailable: usize,
}

#[derive(Debug, Serialize)]
struct LoanCounts {
    total: usize,
    active: usize,
    overdue: usize,
}

impl StatusReport {
    fn collect(store: &Store) -> Self {
        let items = store.list_equipment();
        let count_status =
            |status: EquipmentStatus| items.iter().filter(|e| e.status == status).count();
        let loans = store.all_loans();

        Self {
            data_dir: store.config().data_dir.clone(),
            equipment: EquipmentCounts {
                total: items.len(),
                available: count_status(EquipmentStatus::Available),
                borrowed: count_status(EquipmentStatus::Borrowed),
                unavailable: count_status(EquipmentStatus::Unavailable),
            },
            loans: LoanCounts {
                total: loans.len(),
                active: store.active_loan_count(),
                overdue: loans
                    .iter()
                    .filter(|r| r.status == LendingStatus::Overdue)
                    .count(),
            },
            people: store.people().len(),
        }
    }
}

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let report = StatusReport::collect(store);

    match output.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Quiet => {
            println!("{}", report.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Loanbook Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", report.data_dir.display());
            println!();
            println!("Equipment:");
            println!("  Total:       {}", report.equipment.total);
            println!("  Available:   {}", report.equipment.available);
            println!("  Borrowed:    {}", report.equipment.borrowed);
            println!("  Unavailable: {}", report.equipment.unavailable);
            println!();
            println!("Loans:");
            println!("  Total:   {}", report.loans.total);
            println!("  Active:  {}", report.loans.active);
            println!("  Overdue: {}", report.loans.overdue);
            println!();
            println!("People: {}", report.people);
        }
    }

    Ok(())
}
