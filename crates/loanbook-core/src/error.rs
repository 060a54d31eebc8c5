//! Domain errors for registry and ledger operations

use thiserror::Error;

use crate::models::{Condition, EquipmentStatus};
use crate::storage::StorageError;

/// A rule that a requested mutation would break
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("equipment {id} is on loan and cannot be changed or removed")]
    EquipmentOnLoan { id: String },

    #[error("equipment {id} is {status}, not Available")]
    EquipmentNotAvailable { id: String, status: EquipmentStatus },

    #[error("student {borrower_id} needs an academic supervisor to borrow equipment")]
    MissingSupervisor { borrower_id: String },

    #[error("return date precedes borrow date")]
    ReturnBeforeBorrow,

    #[error("a loan needs at least one piece of equipment")]
    EmptyEquipment,

    #[error("changing {id} from {from} to {to} requires a new condition")]
    ConditionRequired {
        id: String,
        from: EquipmentStatus,
        to: EquipmentStatus,
    },

    #[error("condition {condition} is not valid for {status} equipment")]
    ConditionNotAllowed {
        condition: Condition,
        status: EquipmentStatus,
    },

    #[error("Borrowed status is only set by lending records")]
    BorrowedReserved,
}

/// Errors returned by registry, ledger and store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] Violation),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// The violated rule, for invalid-transition errors
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::InvalidTransition(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
