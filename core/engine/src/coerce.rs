//! FILENAME: core/engine/src/coerce.rs
//! PURPOSE: Turns typed or pasted text into a value for a given field.
//! CONTEXT: Used by paste, fill and bulk edit. A failure here is a per-cell
//! validation error, never a batch-level one.

use thiserror::Error;

use crate::date::parse_date;
use crate::field::{Field, FieldType};
use crate::value::CellValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field '{0}' is read-only")]
    ReadOnly(String),

    #[error("'{input}' is not a number for field '{field}'")]
    NotANumber { field: String, input: String },

    #[error("'{input}' is not a date for field '{field}'")]
    NotADate { field: String, input: String },

    #[error("'{input}' is not an option of field '{field}'")]
    UnknownOption { field: String, input: String },

    #[error("Field '{0}' cannot be set from text")]
    Unsupported(String),
}

/// Coerces raw text into a value for `field`. Blank input clears the cell.
pub fn coerce_input(field: &Field, input: &str) -> Result<CellValue, ValidationError> {
    if field.field_type.is_read_only() {
        return Err(ValidationError::ReadOnly(field.name.clone()));
    }

    let text = input.trim();
    if text.is_empty() {
        return Ok(match field.field_type {
            FieldType::Checkbox => CellValue::Boolean(false),
            FieldType::MultiSelect | FieldType::Link => CellValue::List(Vec::new()),
            _ => CellValue::Empty,
        });
    }

    match field.field_type {
        FieldType::Number | FieldType::Currency | FieldType::Rating => parse_number(field, text),
        FieldType::Percent => {
            let stripped = text.trim_end_matches('%');
            let n = parse_number(field, stripped)?;
            match n {
                CellValue::Number(n) if text.ends_with('%') => Ok(CellValue::Number(n / 100.0)),
                other => Ok(other),
            }
        }
        FieldType::Checkbox => Ok(CellValue::Boolean(matches!(
            text.to_lowercase().as_str(),
            "true" | "yes" | "1" | "x" | "checked" | "✓" | "✔"
        ))),
        FieldType::Date => match parse_date(text) {
            Some(dt) => Ok(CellValue::Text(dt.format("%Y-%m-%d").to_string())),
            None => Err(ValidationError::NotADate {
                field: field.name.clone(),
                input: text.to_string(),
            }),
        },
        FieldType::DateTime => match parse_date(text) {
            Some(dt) => Ok(CellValue::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
            None => Err(ValidationError::NotADate {
                field: field.name.clone(),
                input: text.to_string(),
            }),
        },
        FieldType::SingleSelect => resolve_choice(field, text).map(CellValue::Text),
        FieldType::MultiSelect => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| resolve_choice(field, name).map(CellValue::Text))
            .collect::<Result<Vec<_>, _>>()
            .map(CellValue::List),
        FieldType::Attachment | FieldType::Link => {
            Err(ValidationError::Unsupported(field.name.clone()))
        }
        _ => Ok(CellValue::Text(input.to_string())),
    }
}

fn parse_number(field: &Field, text: &str) -> Result<CellValue, ValidationError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .map(CellValue::Number)
        .map_err(|_| ValidationError::NotANumber {
            field: field.name.clone(),
            input: text.to_string(),
        })
}

/// Select values are stored by choice id; pasted text names the choice.
fn resolve_choice(field: &Field, text: &str) -> Result<String, ValidationError> {
    if let Some(choice) = field.options.choice_by_name(text) {
        return Ok(choice.id.clone());
    }
    if let Some(choice) = field.options.choice_by_id(text) {
        return Ok(choice.id.clone());
    }
    Err(ValidationError::UnknownOption {
        field: field.name.clone(),
        input: text.to_string(),
    })
}
