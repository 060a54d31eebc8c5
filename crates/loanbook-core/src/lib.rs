//! Loanbook Core Library
//!
//! This crate provides the core functionality for loanbook, an equipment
//! lending tracker: an equipment registry, a lending ledger, and the rules
//! that keep them consistent with each other and with flat record files.
//!
//! # Architecture
//!
//! - **Record files**: one line per entity, the durable source of truth
//! - **Registry / Ledger**: in-memory owners of equipment and lending records,
//!   with lookup indices, refreshed by explicit reloads
//!
//! Every mutation is validated in full, written to disk, then applied in
//! memory. A failed call leaves both unchanged.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! // Register equipment
//! store.register_equipment(NewEquipment::available("Camera"))?;
//!
//! // Lend it
//! store.create_loan(NewLoan { borrower_id: "P01".into(), equipment_ids: vec!["EQ001".into()], .. })?;
//!
//! // Query
//! let overdue = store.overdue_loans()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Process-wide context and main entry point
//! - `models`: Equipment, lending records and their vocabularies
//! - `people`: Students, academics and professionals
//! - `registry`: Equipment ownership and status rules
//! - `ledger`: Lending records, indices and cross-entity invariants
//! - `report`: Plain-text overdue and availability reports
//! - `storage`: Line-record files and codecs
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod ids;
pub mod index;
pub mod ledger;
pub mod models;
pub mod people;
pub mod registry;
pub mod report;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result, Violation};
pub use ledger::{Ledger, LoanRequest, LoanUpdate};
pub use models::{Condition, Equipment, EquipmentStatus, LendingRecord, LendingStatus};
pub use people::{Academic, Borrower, BorrowerKind, People, Professional, Student};
pub use registry::Registry;
pub use report::Report;
pub use storage::{StorageError, StorageResult};
pub use store::{LoanChanges, NewEquipment, NewLoan, Store};
