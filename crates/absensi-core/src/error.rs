//! Error taxonomy.
//!
//! - `StoreError`: the remote store failed; the operation is aborted and
//!   nothing local changes.
//! - `PolicyError`: the request was rejected before any remote call.
//! - `ReportError`: a report document could not be written.
//!
//! Local-storage failures (`StorageError`) never appear here: the cache layer
//! logs and swallows them.

use thiserror::Error;

use crate::access::Action;
use crate::models::Role;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Sheet {0} is locked and cannot be edited")]
    SheetLocked(String),

    #[error("Sheet {0} is already locked")]
    AlreadyLocked(String),

    #[error("Sheet {0} is not locked")]
    NotLocked(String),

    #[error("Save the changes before locking the sheet")]
    UnsavedChanges,

    #[error("Only locked sheets can be exported")]
    ExportRequiresLock,

    #[error("No attendance sheet is open")]
    NoSheetOpen,

    #[error("Student {0} is not on this sheet")]
    UnknownStudent(String),

    #[error("Class {0} has no active students")]
    EmptyRoster(String),

    #[error("NIS {0} is already registered")]
    DuplicateNis(String),

    #[error("Class {0} already exists")]
    DuplicateClass(String),

    #[error("Class {0} does not exist")]
    ClassNotFound(String),

    #[error("Role {role} may not {action}")]
    NotPermitted { role: Role, action: Action },

    #[error("Account has not been verified by an administrator")]
    NotVerified,

    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl Error {
    pub fn policy(&self) -> Option<&PolicyError> {
        match self {
            Error::Policy(p) => Some(p),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
