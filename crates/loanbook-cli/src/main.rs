//! Loanbook CLI
//!
//! Command-line interface for loanbook - equipment inventory and lending.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use loanbook_core::{
    Condition, Config, EquipmentStatus, LendingStatus, LoanChanges, StorageError, Store,
};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "loanbook")]
#[command(about = "Loanbook - equipment inventory and lending ledger")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage equipment
    #[command(alias = "eq")]
    Equipment {
        #[command(subcommand)]
        command: EquipmentCommands,
    },
    /// Manage loans
    Loan {
        #[command(subcommand)]
        command: LoanCommands,
    },
    /// Browse students and staff
    People {
        #[command(subcommand)]
        command: Option<PeopleCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show data location and counts
    Status,
}

#[derive(Subcommand)]
enum EquipmentCommands {
    /// Register new equipment
    #[command(alias = "create")]
    Add {
        /// Display name
        name: String,
        /// Initial status (Available or Unavailable)
        #[arg(short, long, default_value = "Available")]
        status: EquipmentStatus,
        /// Initial condition (defaults to Good, or Needs Maintenance when Unavailable)
        #[arg(short, long)]
        condition: Option<Condition>,
        /// Purchase date (YYYY-MM-DD)
        #[arg(short, long)]
        purchased: Option<NaiveDate>,
        /// Register even if another item has the same name
        #[arg(long)]
        allow_duplicate: bool,
    },
    /// List equipment
    #[command(alias = "ls")]
    List {
        /// Only Available equipment, sorted by name then purchase date
        #[arg(short, long)]
        available: bool,
        /// Write an available equipment report to this file
        #[arg(long, value_name = "PATH", requires = "available")]
        export: Option<PathBuf>,
    },
    /// Show equipment details and its loans
    Show {
        /// Equipment ID
        id: String,
    },
    /// Change status (a new condition is required between Available and Unavailable)
    Status {
        /// Equipment ID
        id: String,
        /// New status
        status: EquipmentStatus,
        /// New condition
        #[arg(short, long)]
        condition: Option<Condition>,
    },
    /// Change condition only
    Condition {
        /// Equipment ID
        id: String,
        /// New condition
        condition: Condition,
    },
    /// Remove equipment that is not on loan
    #[command(alias = "rm")]
    Remove {
        /// Equipment ID
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LoanCommands {
    /// Lend equipment to a borrower
    #[command(alias = "add")]
    Create {
        /// Borrower ID (student or staff)
        borrower: String,
        /// Equipment ID (repeat for several items)
        #[arg(short, long = "equipment", required = true)]
        equipment: Vec<String>,
        /// Supervising academic, required for students (defaults to the
        /// supervisor on the student's latest loan)
        #[arg(short, long)]
        supervisor: Option<String>,
        /// Borrow date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Return date (YYYY-MM-DD)
        #[arg(long)]
        until: NaiveDate,
        /// Purpose of the loan
        #[arg(short, long, default_value = "")]
        purpose: String,
    },
    /// List loans
    #[command(alias = "ls")]
    List {
        /// Only loans of this borrower
        #[arg(short, long)]
        borrower: Option<String>,
        /// Only loans including this equipment
        #[arg(short, long)]
        equipment: Option<String>,
        /// Hide returned loans
        #[arg(short, long)]
        active: bool,
    },
    /// Show loan details
    Show {
        /// Loan ID
        id: String,
    },
    /// Change fields of a loan; unspecified fields keep their value
    Update {
        /// Loan ID
        id: String,
        /// New borrower ID
        #[arg(short, long)]
        borrower: Option<String>,
        /// New supervising academic
        #[arg(short, long)]
        supervisor: Option<String>,
        /// Replace the equipment list (repeat for several items)
        #[arg(short, long = "equipment")]
        equipment: Vec<String>,
        /// New borrow date
        #[arg(long)]
        from: Option<NaiveDate>,
        /// New return date
        #[arg(long)]
        until: Option<NaiveDate>,
        /// New status (Borrowed, Overdue, Returned)
        #[arg(long)]
        status: Option<LendingStatus>,
        /// New purpose
        #[arg(short, long)]
        purpose: Option<String>,
    },
    /// Mark a loan returned
    Return {
        /// Loan ID
        id: String,
    },
    /// Delete a loan and release its equipment
    #[command(alias = "rm")]
    Delete {
        /// Loan ID
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// List loans marked Overdue, oldest first
    Overdue {
        /// Write an overdue report to this file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum PeopleCommands {
    /// List students and staff
    List,
    /// Students an academic supervises on active loans
    Supervised {
        /// Academic staff ID
        academic_id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let result = Store::open_with_config(config).and_then(|mut store| match cli.command {
        Commands::Equipment { command } => handle_equipment_command(command, &mut store, &output),
        Commands::Loan { command } => handle_loan_command(command, &mut store, &output),
        Commands::People { command } => handle_people_command(command, &store, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&store, &output),
    });

    if let Err(ref err) = result {
        print_recovery_hint(err, &output);
    }
    result
}

/// Point at a fix when a record file could not be read or written
fn print_recovery_hint(err: &anyhow::Error, output: &Output) {
    if output.is_quiet() {
        return;
    }
    let hint = err.chain().find_map(|cause| {
        match cause.downcast_ref::<loanbook_core::Error>() {
            Some(loanbook_core::Error::Storage(storage)) => storage.recovery_suggestion(),
            _ => cause
                .downcast_ref::<StorageError>()
                .and_then(StorageError::recovery_suggestion),
        }
    });
    if let Some(hint) = hint {
        eprintln!("hint: {}", hint);
    }
}

fn handle_equipment_command(
    command: EquipmentCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        EquipmentCommands::Add {
            name,
            status,
            condition,
            purchased,
            allow_duplicate,
        } => commands::equipment::add(
            store,
            name,
            status,
            condition,
            purchased,
            allow_duplicate,
            output,
        ),
        EquipmentCommands::List { available, export } => match export {
            Some(path) => commands::equipment::export_available(store, &path, output),
            None => commands::equipment::list(store, available, output),
        },
        EquipmentCommands::Show { id } => commands::equipment::show(store, id, output),
        EquipmentCommands::Status {
            id,
            status,
            condition,
        } => commands::equipment::set_status(store, id, status, condition, output),
        EquipmentCommands::Condition { id, condition } => {
            commands::equipment::set_condition(store, id, condition, output)
        }
        EquipmentCommands::Remove { id, yes } => commands::equipment::remove(store, id, yes, output),
    }
}

fn handle_loan_command(command: LoanCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        LoanCommands::Create {
            borrower,
            equipment,
            supervisor,
            from,
            until,
            purpose,
        } => commands::loan::create(
            store,
            commands::loan::CreateArgs {
                borrower,
                equipment,
                supervisor,
                from,
                until,
                purpose,
            },
            output,
        ),
        LoanCommands::List {
            borrower,
            equipment,
            active,
        } => commands::loan::list(store, borrower, equipment, active, output),
        LoanCommands::Show { id } => commands::loan::show(store, id, output),
        LoanCommands::Update {
            id,
            borrower,
            supervisor,
            equipment,
            from,
            until,
            status,
            purpose,
        } => {
            let changes = LoanChanges {
                borrower_id: borrower,
                supervisor_id: supervisor,
                equipment_ids: (!equipment.is_empty()).then_some(equipment),
                borrow_date: from,
                return_date: until,
                status,
                purpose,
            };
            commands::loan::update(store, id, changes, output)
        }
        LoanCommands::Return { id } => commands::loan::return_loan(store, id, output),
        LoanCommands::Delete { id, yes } => commands::loan::delete(store, id, yes, output),
        LoanCommands::Overdue { export } => match export {
            Some(path) => commands::loan::export_overdue(store, &path, output),
            None => commands::loan::overdue(store, output),
        },
    }
}

fn handle_people_command(
    command: Option<PeopleCommands>,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(PeopleCommands::List) | None => commands::people::list(store, output),
        Some(PeopleCommands::Supervised { academic_id }) => {
            commands::people::supervised(store, academic_id, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Level comes from LOANBOOK_LOG (default "warn"). Logs go to stderr, or
/// to config.log_file when set.
fn init_logging(config: &Config) {
    let log_level = std::env::var("LOANBOOK_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!(
        "loanbook_core={},loanbook_cli={}",
        log_level, log_level
    ));

    let Some(log_path) = config.log_file.as_ref() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    debug!("Logging to {:?}", log_path);
}
