//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the grid data model.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod change;
pub mod coerce;
pub mod date;
pub mod field;
pub mod row;
pub mod rules;
pub mod value;

// Re-export commonly used types at the crate root
pub use change::{CellChange, Transaction};
pub use coerce::{coerce_input, ValidationError};
pub use date::parse_date;
pub use field::{Field, FieldOptions, FieldType, SelectChoice};
pub use row::{Row, RowId};
pub use rules::{DateBucket, GroupRule, RowHeightPreset, SortDirection, SortRule};
pub use value::{format_plain_number, CellValue};
