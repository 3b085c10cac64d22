//! FILENAME: core/engine/src/field.rs
//! PURPOSE: Column descriptors and field-aware display text.
//! CONTEXT: The grid never mutates a field descriptor; only dimension state
//! (width, wrap) lives elsewhere and is keyed by the field name.

use serde::{Deserialize, Serialize};

use crate::date::parse_date;
use crate::value::{format_plain_number, CellValue};

// ============================================================================
// FIELD TYPE
// ============================================================================

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    LongText,
    Number,
    Currency,
    Percent,
    Date,
    DateTime,
    Checkbox,
    SingleSelect,
    MultiSelect,
    Attachment,
    Link,
    Formula,
    Lookup,
    Rollup,
    Email,
    Url,
    Phone,
    Rating,
    CreatedTime,
    ModifiedTime,
    AutoNumber,
}

impl FieldType {
    /// Computed or system-maintained types cannot be written from the grid.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            FieldType::Formula
                | FieldType::Lookup
                | FieldType::Rollup
                | FieldType::CreatedTime
                | FieldType::ModifiedTime
                | FieldType::AutoNumber
        )
    }

    pub fn is_select(&self) -> bool {
        matches!(self, FieldType::SingleSelect | FieldType::MultiSelect)
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::DateTime | FieldType::CreatedTime | FieldType::ModifiedTime
        )
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectChoice {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectChoice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        SelectChoice {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }
}

/// Type-specific options bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<SelectChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
}

impl FieldOptions {
    pub fn choice_by_id(&self, id: &str) -> Option<&SelectChoice> {
        self.choices.iter().find(|c| c.id == id)
    }

    pub fn choice_by_name(&self, name: &str) -> Option<&SelectChoice> {
        let name = name.trim();
        self.choices
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.choices.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }
}

// ============================================================================
// FIELD
// ============================================================================

/// A column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub options: FieldOptions,
    /// Declared position; fields without one sort after indexed fields.
    #[serde(default)]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub hidden: bool,
}

impl Field {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            id: id.into(),
            name: name.into(),
            field_type,
            options: FieldOptions::default(),
            order_index: None,
            hidden: false,
        }
    }

    pub fn with_order(mut self, order_index: i64) -> Self {
        self.order_index = Some(order_index);
        self
    }

    pub fn with_choices(mut self, choices: Vec<SelectChoice>) -> Self {
        self.options.choices = choices;
        self
    }

    pub fn with_linked_table(mut self, table: impl Into<String>) -> Self {
        self.options.linked_table = Some(table.into());
        self
    }

    /// Text shown in the grid for a value of this field.
    /// Used by search, group labels and copy.
    pub fn display_text(&self, value: &CellValue) -> String {
        match (self.field_type, value) {
            (_, CellValue::Empty) => String::new(),
            (FieldType::Checkbox, v) => {
                if truthy(v) { "checked".to_string() } else { String::new() }
            }
            (FieldType::SingleSelect | FieldType::MultiSelect, CellValue::List(items)) => items
                .iter()
                .map(|item| self.choice_label(item))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            (FieldType::SingleSelect | FieldType::MultiSelect, v) => self.choice_label(v),
            (FieldType::Number | FieldType::Rating, CellValue::Number(n)) => self.format_number(*n),
            (FieldType::Currency, CellValue::Number(n)) => {
                let symbol = self.options.currency_symbol.as_deref().unwrap_or("$");
                format!("{}{}", symbol, self.format_number_with(*n, Some(self.options.precision.unwrap_or(2))))
            }
            (FieldType::Percent, CellValue::Number(n)) => {
                format!("{}%", self.format_number(*n * 100.0))
            }
            (FieldType::Date, v) => match v.as_str().and_then(parse_date) {
                Some(dt) => dt.format("%Y-%m-%d").to_string(),
                None => v.plain_text(),
            },
            (FieldType::Attachment, CellValue::List(items)) => items
                .iter()
                .map(attachment_name)
                .collect::<Vec<_>>()
                .join(", "),
            (_, v) => v.plain_text(),
        }
    }

    fn choice_label(&self, value: &CellValue) -> String {
        let raw = value.plain_text();
        match self.options.choice_by_id(&raw) {
            Some(choice) => choice.name.clone(),
            None => raw,
        }
    }

    fn format_number(&self, n: f64) -> String {
        self.format_number_with(n, self.options.precision)
    }

    fn format_number_with(&self, n: f64, precision: Option<u8>) -> String {
        match precision {
            Some(p) => format!("{:.*}", p as usize, n),
            None => format_plain_number(n),
        }
    }
}

fn truthy(value: &CellValue) -> bool {
    match value {
        CellValue::Boolean(b) => *b,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "checked"),
        _ => false,
    }
}

fn attachment_name(item: &CellValue) -> String {
    match item {
        CellValue::Record(map) => map
            .get("name")
            .or_else(|| map.get("filename"))
            .or_else(|| map.get("url"))
            .map(|v| v.plain_text())
            .unwrap_or_default(),
        other => other.plain_text(),
    }
}
