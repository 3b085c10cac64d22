//! FILENAME: core/engine/src/value.rs
//! PURPOSE: Defines the value a single row holds for a single field.
//! CONTEXT: Values come from the remote database as JSON-like data, so the
//! enum mirrors that shape (scalar, list, or record) instead of a fixed
//! spreadsheet type set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cell value as stored on a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<CellValue>),
    Record(BTreeMap<String, CellValue>),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// True for values that count as "nothing here": empty, blank text and
    /// empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// First element of a list, or the value itself.
    pub fn first(&self) -> &CellValue {
        match self {
            CellValue::List(items) => items.first().unwrap_or(&CellValue::Empty),
            other => other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Identity of a record value: its `id` member, falling back to `name`.
    pub fn record_key(&self) -> Option<String> {
        match self {
            CellValue::Record(map) => map
                .get("id")
                .or_else(|| map.get("name"))
                .map(|v| v.plain_text()),
            _ => None,
        }
    }

    /// Raw text without any field-aware formatting.
    pub fn plain_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::List(items) => items
                .iter()
                .map(|v| v.plain_text())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            CellValue::Record(_) => self.record_key().unwrap_or_default(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Format without unnecessary decimal places.
pub fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}
