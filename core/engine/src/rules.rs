//! FILENAME: core/engine/src/rules.rs
//! PURPOSE: View configuration shared by the pipeline: grouping rules,
//! sort rules and row height presets.

use serde::{Deserialize, Serialize};

// ============================================================================
// GROUPING
// ============================================================================

/// Date bucket granularity for date grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    Year,
    Month,
}

/// One level of grouping. An ordered list of rules defines nesting depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupRule {
    /// Group rows sharing the same value of `field`.
    Field { field: String },
    /// Group rows by the year or month of a date value.
    Date { field: String, bucket: DateBucket },
}

impl GroupRule {
    pub fn field(field: impl Into<String>) -> Self {
        GroupRule::Field { field: field.into() }
    }

    pub fn date(field: impl Into<String>, bucket: DateBucket) -> Self {
        GroupRule::Date {
            field: field.into(),
            bucket,
        }
    }

    pub fn field_name(&self) -> &str {
        match self {
            GroupRule::Field { field } | GroupRule::Date { field, .. } => field,
        }
    }

    /// A rule without a field name cannot group anything.
    pub fn is_valid(&self) -> bool {
        !self.field_name().trim().is_empty()
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Ordering requested from the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortRule {
    pub fn asc(field: impl Into<String>) -> Self {
        SortRule {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortRule {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

// ============================================================================
// ROW HEIGHT
// ============================================================================

/// Global row height preset. Individual rows may override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RowHeightPreset {
    #[default]
    Short,
    Medium,
    Tall,
    ExtraTall,
}

impl RowHeightPreset {
    /// Pixel height of a row using this preset.
    pub fn pixels(&self) -> f64 {
        match self {
            RowHeightPreset::Short => 32.0,
            RowHeightPreset::Medium => 56.0,
            RowHeightPreset::Tall => 88.0,
            RowHeightPreset::ExtraTall => 128.0,
        }
    }
}
