//! Equipment command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use loanbook_core::{Condition, Equipment, EquipmentStatus, NewEquipment, Store};

use crate::output::Output;
use crate::prompt::confirm;

/// Register a new piece of equipment
///
/// Names must be unique (ignoring case) unless `allow_duplicate` is set.
pub fn add(
    store: &mut Store,
    name: String,
    status: EquipmentStatus,
    condition: Option<Condition>,
    purchased: Option<NaiveDate>,
    allow_duplicate: bool,
    output: &Output,
) -> Result<()> {
    if !allow_duplicate {
        if let Some(existing) = store.registry().find_by_name(&name) {
            bail!(
                "Equipment named '{}' already exists ({}). Use --allow-duplicate to add it anyway.",
                existing.name,
                existing.id
            );
        }
    }

    let condition = condition.unwrap_or(match status {
        EquipmentStatus::Unavailable => Condition::NeedsMaintenance,
        _ => Condition::Good,
    });

    let equipment = store
        .register_equipment(NewEquipment {
            name,
            status,
            purchase_date: purchased,
            condition,
        })
        .context("Failed to register equipment")?
        .clone();

    output.success(&format!("Registered equipment: {}", equipment.id));
    output.print_equipment(&equipment)
}

/// List equipment, optionally only what can be lent right now
pub fn list(store: &Store, available: bool, output: &Output) -> Result<()> {
    let items: Vec<&Equipment> = if available {
        store.list_available()
    } else {
        store.list_equipment().iter().collect()
    };
    output.print_equipment_list(&items)
}

/// Write the available equipment report
pub fn export_available(store: &Store, path: &Path, output: &Output) -> Result<()> {
    let count = store
        .export_available(path)
        .with_context(|| format!("Failed to export report to {}", path.display()))?;

    output.success(&format!(
        "Exported {} available item(s) to {}",
        count,
        path.display()
    ));
    Ok(())
}

/// Show one item and its lending history
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let equipment = store
        .get_equipment(&id)
        .ok_or_else(|| anyhow::anyhow!("Equipment not found: {}", id))?;

    output.print_equipment(equipment)?;

    if !output.is_json() && !output.is_quiet() {
        let history = store.loans_by_equipment(&id);
        if !history.is_empty() {
            println!();
            println!("── Loans ({}) ──", history.len());
            output.print_loans(&history, store.people())?;
        }
    }
    Ok(())
}

/// Change status, with the condition the new status needs
pub fn set_status(
    store: &mut Store,
    id: String,
    status: EquipmentStatus,
    condition: Option<Condition>,
    output: &Output,
) -> Result<()> {
    let equipment = store
        .set_equipment_status(&id, status, condition)
        .with_context(|| format!("Failed to change status of {}", id))?
        .clone();

    output.success(&format!(
        "{} is now {} ({})",
        equipment.id, equipment.status, equipment.condition
    ));
    Ok(())
}

/// Change condition only
pub fn set_condition(
    store: &mut Store,
    id: String,
    condition: Condition,
    output: &Output,
) -> Result<()> {
    let equipment = store
        .set_equipment_condition(&id, condition)
        .with_context(|| format!("Failed to change condition of {}", id))?
        .clone();

    output.success(&format!(
        "{} condition set to {}",
        equipment.id, equipment.condition
    ));
    Ok(())
}

/// Remove equipment that is not on loan
pub fn remove(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let equipment = store
        .get_equipment(&id)
        .ok_or_else(|| anyhow::anyhow!("Equipment not found: {}", id))?;

    if !yes && output.should_prompt() {
        println!("Remove equipment: {} - {}", equipment.id, equipment.name);
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    store
        .remove_equipment(&id)
        .context("Failed to remove equipment")?;

    output.success(&format!("Removed equipment: {}", id));
    Ok(())
}
