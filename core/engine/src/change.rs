//! FILENAME: core/engine/src/change.rs
//! PURPOSE: Records applied cell writes so a batch can be compensated.
//! CONTEXT: The remote database offers no multi-row transaction, so an
//! all-or-nothing batch rolls back by writing each previous value again,
//! newest first.

use crate::row::RowId;
use crate::value::CellValue;

/// A single applied write.
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub row_id: RowId,
    pub field: String,
    pub previous: CellValue,
    pub next: CellValue,
}

impl CellChange {
    pub fn new(row_id: RowId, field: impl Into<String>, previous: CellValue, next: CellValue) -> Self {
        CellChange {
            row_id,
            field: field.into(),
            previous,
            next,
        }
    }

    /// The write that undoes this one.
    pub fn inverted(&self) -> CellChange {
        CellChange {
            row_id: self.row_id.clone(),
            field: self.field.clone(),
            previous: self.next.clone(),
            next: self.previous.clone(),
        }
    }
}

/// A transaction groups the writes of one batch (e.g. "Paste 10 cells").
#[derive(Debug, Clone)]
pub struct Transaction {
    pub description: String,
    /// Changes in the order they were applied.
    pub changes: Vec<CellChange>,
}

impl Transaction {
    pub fn new(description: impl Into<String>) -> Self {
        Transaction {
            description: description.into(),
            changes: Vec::new(),
        }
    }

    pub fn add_change(&mut self, change: CellChange) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Compensating writes, newest change first.
    pub fn compensation(&self) -> Vec<CellChange> {
        self.changes.iter().rev().map(CellChange::inverted).collect()
    }
}
