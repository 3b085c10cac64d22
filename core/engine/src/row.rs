//! FILENAME: core/engine/src/row.rs
//! PURPOSE: A record fetched from the remote table.
//! CONTEXT: Rows are created remotely and only ever patched one field at a
//! time. Callers share them as `Arc<Row>` and replace them wholesale.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::value::CellValue;

/// Stable identifier assigned by the remote database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        RowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId(value)
    }
}

macro_rules! row_id_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for RowId {
            fn from(value: $t) -> Self {
                RowId(value.to_string())
            }
        })*
    };
}

row_id_from_int!(i32, i64, u32, u64, usize);

/// A row: its id plus a field-name keyed value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(flatten)]
    pub values: BTreeMap<String, CellValue>,
}

static EMPTY: CellValue = CellValue::Empty;

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Row {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Value at a field; missing fields read as `Empty`.
    pub fn get(&self, field: &str) -> &CellValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }

    /// Returns a copy of this row with one field replaced.
    pub fn patched(&self, field: &str, value: CellValue) -> Row {
        let mut next = self.clone();
        if value == CellValue::Empty {
            next.values.remove(field);
        } else {
            next.values.insert(field.to_string(), value);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_empty() {
        let row = Row::new(1).with("status", "A");
        assert_eq!(row.get("status"), &CellValue::text("A"));
        assert_eq!(row.get("missing"), &CellValue::Empty);
    }

    #[test]
    fn test_patched_leaves_original_untouched() {
        let row = Row::new("r1").with("name", "old");
        let next = row.patched("name", CellValue::text("new"));
        assert_eq!(row.get("name"), &CellValue::text("old"));
        assert_eq!(next.get("name"), &CellValue::text("new"));
        assert_eq!(next.id, row.id);
    }

    #[test]
    fn test_row_json_is_flat() {
        let row: Row = serde_json::from_str(r#"{"id": "7", "status": "A", "count": 2}"#).unwrap();
        assert_eq!(row.id, RowId::new("7"));
        assert_eq!(row.get("count"), &CellValue::Number(2.0));
    }
}
