//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use loanbook_core::{Borrower, Equipment, LendingRecord, People, Registry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single piece of equipment
    pub fn print_equipment(&self, equipment: &Equipment) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", equipment.id);
                println!("Name:      {}", equipment.name);
                println!("Status:    {}", equipment.status);
                println!("Condition: {}", equipment.condition);
                println!("Purchased: {}", format_date(equipment.purchase_date));
            }
            OutputFormat::Json => print_json(equipment)?,
            OutputFormat::Quiet => println!("{}", equipment.id),
        }
        Ok(())
    }

    /// Print a list of equipment
    pub fn print_equipment_list(&self, items: &[&Equipment]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No equipment found.");
                    return Ok(());
                }
                for item in items {
                    println!(
                        "{:<6} | {:<30} | {:<11} | {:<17} | {}",
                        item.id,
                        truncate(&item.name, 30),
                        item.status,
                        item.condition,
                        format_date(item.purchase_date)
                    );
                }
                println!("\n{} item(s)", items.len());
            }
            OutputFormat::Json => print_json(items)?,
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
        Ok(())
    }

    /// Print a single loan with its borrower and equipment resolved
    pub fn print_loan(
        &self,
        record: &LendingRecord,
        people: &People,
        registry: &Registry,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", record.id);
                println!("Borrower:   {}", describe_borrower(people, &record.borrower_id));
                if let Some(ref supervisor) = record.supervisor_id {
                    println!("Supervisor: {}", describe_borrower(people, supervisor));
                }
                println!("Status:     {}", record.status);
                println!("Borrowed:   {}", record.borrow_date);
                println!("Due:        {}", record.return_date);
                if !record.purpose.is_empty() {
                    println!("Purpose:    {}", record.purpose);
                }
                println!();
                println!("── Equipment ({}) ──", record.equipment_ids.len());
                for id in &record.equipment_ids {
                    match registry.get(id) {
                        Some(item) => println!("{} | {} | {}", item.id, item.name, item.status),
                        None => println!("{} | (removed)", id),
                    }
                }
            }
            OutputFormat::Json => print_json(record)?,
            OutputFormat::Quiet => println!("{}", record.id),
        }
        Ok(())
    }

    /// Print a list of loans
    pub fn print_loans(&self, records: &[&LendingRecord], people: &People) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No loans found.");
                    return Ok(());
                }
                for record in records {
                    let borrower = people
                        .borrower(&record.borrower_id)
                        .map(|b| b.full_name().to_string())
                        .unwrap_or_else(|| record.borrower_id.clone());
                    println!(
                        "{:<5} | {:<24} | {:<8} | {} → {} | {}",
                        record.id,
                        truncate(&borrower, 24),
                        record.status,
                        record.borrow_date,
                        record.return_date,
                        record.equipment_ids.join(", ")
                    );
                }
                println!("\n{} loan(s)", records.len());
            }
            OutputFormat::Json => print_json(records)?,
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id);
                }
            }
        }
        Ok(())
    }

    /// Print a list of borrowers
    pub fn print_people(&self, people: &[&Borrower]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if people.is_empty() {
                    println!("No people found.");
                    return Ok(());
                }
                for person in people {
                    println!(
                        "{:<6} | {:<12} | {}",
                        person.borrower_id(),
                        person.kind(),
                        person.full_name()
                    );
                }
                println!("\n{} person(s)", people.len());
            }
            OutputFormat::Json => print_json(people)?,
            OutputFormat::Quiet => {
                for person in people {
                    println!("{}", person.borrower_id());
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// "Name (ID, Kind)", or the bare ID when unknown
fn describe_borrower(people: &People, id: &str) -> String {
    match people.borrower(id) {
        Some(person) => format!("{} ({}, {})", person.full_name(), id, person.kind()),
        None => id.to_string(),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
