//! FILENAME: app/src/error.rs
// PURPOSE: Error types for grid view operations.

use engine::{RowId, ValidationError};
use persistence::PersistenceError;
use thiserror::Error;

/// Failure reported by a remote service (data, settings or labels).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Row not found: {0}")]
    UnknownRow(RowId),

    #[error("Rejected by server: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Cell {row}/{field} is already saving")]
    CellBusy { row: RowId, field: String },

    #[error("Unknown row: {0}")]
    UnknownRow(RowId),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
