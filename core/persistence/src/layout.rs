//! FILENAME: core/persistence/src/layout.rs
//! PURPOSE: User-adjustable grid presentation state and its settings record.
//! CONTEXT: Widths, wrap flags and order are keyed by field name; row height
//! overrides by row id. Every mutator reports whether anything changed so
//! the caller can mark the layout dirty.

use engine::{RowHeightPreset, RowId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// WIDTH LIMITS
// ============================================================================

/// Column width bounds applied on resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthLimits {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl Default for WidthLimits {
    fn default() -> Self {
        WidthLimits {
            min: 60.0,
            max: 800.0,
            default: 180.0,
        }
    }
}

impl WidthLimits {
    pub fn clamp(&self, width: f64) -> f64 {
        width.clamp(self.min, self.max.max(self.min))
    }
}

// ============================================================================
// LAYOUT STATE
// ============================================================================

/// Per-view layout owned by the grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutState {
    pub column_widths: BTreeMap<String, f64>,
    pub column_order: Vec<String>,
    pub wrap_text: BTreeMap<String, bool>,
    /// Row id -> pixel height.
    pub row_heights: BTreeMap<String, f64>,
    pub row_height_preset: RowHeightPreset,
    pub frozen_columns: u32,
}

impl LayoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column_width(&self, field: &str, limits: &WidthLimits) -> f64 {
        self.column_widths.get(field).copied().unwrap_or(limits.default)
    }

    /// Widths for `order`, in that order.
    pub fn widths_for(&self, order: &[String], limits: &WidthLimits) -> Vec<f64> {
        order.iter().map(|f| self.column_width(f, limits)).collect()
    }

    pub fn set_column_width(&mut self, field: &str, width: f64, limits: &WidthLimits) -> bool {
        let width = limits.clamp(width);
        if self.column_widths.get(field) == Some(&width) {
            return false;
        }
        self.column_widths.insert(field.to_string(), width);
        true
    }

    /// Moves the column at `from` to position `to` (both clamped).
    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        let len = self.column_order.len();
        if len == 0 || from >= len {
            return false;
        }
        let to = to.min(len - 1);
        if from == to {
            return false;
        }
        let name = self.column_order.remove(from);
        self.column_order.insert(to, name);
        true
    }

    pub fn move_column_named(&mut self, field: &str, to: usize) -> bool {
        match self.column_order.iter().position(|f| f == field) {
            Some(from) => self.move_column(from, to),
            None => false,
        }
    }

    pub fn wraps(&self, field: &str) -> bool {
        self.wrap_text.get(field).copied().unwrap_or(false)
    }

    pub fn set_wrap(&mut self, field: &str, wrap: bool) -> bool {
        if self.wraps(field) == wrap {
            return false;
        }
        self.wrap_text.insert(field.to_string(), wrap);
        true
    }

    /// `None` (or a non-positive height) removes the override.
    pub fn set_row_height(&mut self, row: &RowId, height: Option<f64>) -> bool {
        match height.filter(|h| *h > 0.0) {
            Some(h) => {
                if self.row_heights.get(row.as_str()) == Some(&h) {
                    return false;
                }
                self.row_heights.insert(row.as_str().to_string(), h);
                true
            }
            None => self.row_heights.remove(row.as_str()).is_some(),
        }
    }

    pub fn set_row_height_preset(&mut self, preset: RowHeightPreset) -> bool {
        if self.row_height_preset == preset {
            return false;
        }
        self.row_height_preset = preset;
        true
    }

    pub fn set_frozen_columns(&mut self, count: u32) -> bool {
        if self.frozen_columns == count {
            return false;
        }
        self.frozen_columns = count;
        true
    }

    /// Overrides in the shape the height model wants.
    pub fn height_overrides(&self) -> HashMap<RowId, f64> {
        self.row_heights
            .iter()
            .map(|(id, h)| (RowId::new(id.clone()), *h))
            .collect()
    }
}

// ============================================================================
// SETTINGS RECORD
// ============================================================================

/// The remote settings record, one per view, read and written wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub view_id: String,
    #[serde(default)]
    pub column_widths: BTreeMap<String, f64>,
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default)]
    pub wrap_text: BTreeMap<String, bool>,
    #[serde(default)]
    pub row_heights: BTreeMap<String, f64>,
    #[serde(default)]
    pub default_row_height: RowHeightPreset,
    #[serde(default)]
    pub frozen_columns: u32,
}

impl ViewSettings {
    pub fn from_layout(view_id: impl Into<String>, layout: &LayoutState) -> Self {
        ViewSettings {
            view_id: view_id.into(),
            column_widths: layout.column_widths.clone(),
            column_order: layout.column_order.clone(),
            wrap_text: layout.wrap_text.clone(),
            row_heights: layout.row_heights.clone(),
            default_row_height: layout.row_height_preset,
            frozen_columns: layout.frozen_columns,
        }
    }

    pub fn into_layout(self) -> LayoutState {
        LayoutState {
            column_widths: self.column_widths,
            column_order: self.column_order,
            wrap_text: self.wrap_text,
            row_heights: self.row_heights,
            row_height_preset: self.default_row_height,
            frozen_columns: self.frozen_columns,
        }
    }
}
