//! FILENAME: core/view-engine/src/window.rs
//! Virtualization window - which render items intersect the viewport.
//!
//! A linear scan over item heights per call; no prefix-sum tree. Only the
//! items in `[start_index, end_index)` are instantiated, the rest are
//! replaced by a top and a bottom spacer.

use std::collections::HashMap;
use std::ops::Range;

use engine::{RowHeightPreset, RowId};
use serde::{Deserialize, Serialize};

use crate::flatten::RenderItem;

pub const DEFAULT_GROUP_HEADER_HEIGHT: f64 = 40.0;

// ============================================================================
// CONFIG
// ============================================================================

/// Overscan buffers around the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Pixels above the viewport that still count as visible.
    pub overscan_before: f64,
    /// Pixels below the viewport that are rendered ahead of scrolling.
    pub overscan_after: f64,
    /// Extra items kept above the first visible one for smooth scroll-up.
    pub lookback: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            overscan_before: 100.0,
            overscan_after: 200.0,
            lookback: 2,
        }
    }
}

// ============================================================================
// HEIGHTS
// ============================================================================

/// Pixel height of every render item.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightModel {
    pub preset: RowHeightPreset,
    /// Per-row overrides; these win over the preset.
    pub overrides: HashMap<RowId, f64>,
    pub group_header_height: f64,
}

impl Default for HeightModel {
    fn default() -> Self {
        HeightModel {
            preset: RowHeightPreset::default(),
            overrides: HashMap::new(),
            group_header_height: DEFAULT_GROUP_HEADER_HEIGHT,
        }
    }
}

impl HeightModel {
    pub fn new(preset: RowHeightPreset) -> Self {
        HeightModel {
            preset,
            ..HeightModel::default()
        }
    }

    /// Effective height of a row: its override, else the preset.
    pub fn row_height(&self, id: &RowId) -> f64 {
        self.overrides
            .get(id)
            .copied()
            .filter(|h| *h > 0.0)
            .unwrap_or_else(|| self.preset.pixels())
    }

    pub fn height_of(&self, item: &RenderItem) -> f64 {
        match item {
            RenderItem::GroupHeader { .. } => self.group_header_height,
            RenderItem::Row { row, .. } => self.row_height(&row.id),
        }
    }
}

// ============================================================================
// WINDOW
// ============================================================================

/// The visible slice and its spacers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VirtualWindow {
    pub start_index: usize,
    /// Exclusive.
    pub end_index: usize,
    /// Height of everything before `start_index`.
    pub offset_top: f64,
    /// Height of everything from `end_index` on.
    pub offset_bottom: f64,
    pub total_height: f64,
}

impl VirtualWindow {
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height of the rendered slice.
    pub fn window_height(&self) -> f64 {
        self.total_height - self.offset_top - self.offset_bottom
    }
}

/// Computes the window over any sized items.
///
/// `start_index` is the first item whose bottom edge passes
/// `scroll_top - overscan_before`, moved back by `lookback` items.
/// `end_index` follows the first item at which the height accumulated from
/// `start_index` passes the viewport bottom plus `overscan_after`.
pub fn compute_window<T>(
    items: &[T],
    height_of: impl Fn(&T) -> f64,
    scroll_top: f64,
    container_height: f64,
    config: &WindowConfig,
) -> VirtualWindow {
    if items.is_empty() {
        return VirtualWindow::default();
    }

    let heights: Vec<f64> = items.iter().map(|item| height_of(item).max(0.0)).collect();
    let total: f64 = heights.iter().sum();
    let viewport = container_height.max(0.0);
    let count = heights.len();

    // Content fits: the whole list is the window.
    if total <= viewport {
        return VirtualWindow {
            start_index: 0,
            end_index: count,
            offset_top: 0.0,
            offset_bottom: 0.0,
            total_height: total,
        };
    }

    let scroll_top = scroll_top.clamp(0.0, total - viewport);
    let threshold = scroll_top - config.overscan_before;

    let mut first_visible = count - 1;
    let mut cumulative = 0.0;
    for (i, h) in heights.iter().enumerate() {
        cumulative += h;
        if cumulative > threshold {
            first_visible = i;
            break;
        }
    }

    let start_index = first_visible.saturating_sub(config.lookback);
    let offset_top: f64 = heights[..start_index].iter().sum();

    let target = (scroll_top - offset_top) + viewport + config.overscan_after;
    let mut end_index = count;
    let mut accumulated = 0.0;
    for (i, h) in heights.iter().enumerate().skip(start_index) {
        accumulated += h;
        if accumulated > target {
            end_index = i + 1;
            break;
        }
    }

    let offset_bottom: f64 = heights[end_index..].iter().sum();

    VirtualWindow {
        start_index,
        end_index,
        offset_top,
        offset_bottom,
        total_height: total,
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

/// Horizontal window: frozen columns always render, the rest scroll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnWindow {
    /// Number of frozen leading columns actually present.
    pub frozen: usize,
    pub frozen_width: f64,
    /// Scrolled slice, in absolute column indices.
    pub start_index: usize,
    pub end_index: usize,
    pub offset_left: f64,
    pub offset_right: f64,
}

impl ColumnWindow {
    /// Indices to instantiate: frozen ones first, then the scrolled slice.
    pub fn indices(&self) -> Vec<usize> {
        (0..self.frozen).chain(self.start_index..self.end_index).collect()
    }
}

/// Column counterpart of `compute_window`. `scroll_left` scrolls only the
/// unfrozen columns; the frozen block eats into the container width.
pub fn compute_column_window(
    widths: &[f64],
    frozen: usize,
    scroll_left: f64,
    container_width: f64,
    overscan: f64,
) -> ColumnWindow {
    let frozen = frozen.min(widths.len());
    let frozen_width: f64 = widths[..frozen].iter().map(|w| w.max(0.0)).sum();
    let scrollable = &widths[frozen..];

    let config = WindowConfig {
        overscan_before: overscan,
        overscan_after: overscan,
        lookback: 0,
    };
    let inner = compute_window(
        scrollable,
        |w| *w,
        scroll_left,
        (container_width - frozen_width).max(0.0),
        &config,
    );

    ColumnWindow {
        frozen,
        frozen_width,
        start_index: inner.start_index + frozen,
        end_index: inner.end_index + frozen,
        offset_left: inner.offset_top,
        offset_right: inner.offset_bottom,
    }
}
