//! FILENAME: app/src/layout.rs
// PURPOSE: Layout state owner: mutations, dirty tracking, load and flush
// planning.
// CONTEXT: Holds no lock across I/O. The grid controller asks this type what
// to load or write, performs the remote call itself, then hands the result
// back. The local cache is written synchronously on every flush.

use engine::{Field, RowHeightPreset, RowId};
use persistence::{
    fields_fingerprint, repair_column_order, resolve_layout, KeyValueStore, LayoutCache,
    LayoutSource, LayoutState, ViewKey, ViewSettings, WidthLimits,
};
use view_engine::HeightModel;

use crate::logging::{log_debug, log_warn};

/// What a flush has to do after the local cache is written.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushPlan {
    /// Nothing changed since the last flush.
    Clean,
    /// The view has no remote key; the cache write was all there is.
    LocalOnly,
    /// Upsert this record.
    Remote(ViewSettings),
}

pub struct LayoutController<K: KeyValueStore> {
    table: String,
    view: ViewKey,
    cache: LayoutCache<K>,
    limits: WidthLimits,
    state: LayoutState,
    dirty: bool,
    loaded_fingerprint: Option<u64>,
    source: Option<LayoutSource>,
}

impl<K: KeyValueStore> LayoutController<K> {
    pub fn new(
        table: impl Into<String>,
        view_id: &str,
        cache: LayoutCache<K>,
        limits: WidthLimits,
        default_preset: RowHeightPreset,
    ) -> Self {
        LayoutController {
            table: table.into(),
            view: ViewKey::normalize(view_id),
            cache,
            limits,
            state: LayoutState {
                row_height_preset: default_preset,
                ..LayoutState::default()
            },
            dirty: false,
            loaded_fingerprint: None,
            source: None,
        }
    }

    pub fn view_key(&self) -> &ViewKey {
        &self.view
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn limits(&self) -> &WidthLimits {
        &self.limits
    }

    pub fn cache(&self) -> &LayoutCache<K> {
        &self.cache
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Where the current layout came from; `None` before the first load.
    pub fn source(&self) -> Option<LayoutSource> {
        self.source
    }

    pub fn column_order(&self) -> &[String] {
        &self.state.column_order
    }

    // ========================================================================
    // LOAD
    // ========================================================================

    /// True when `fields` differ from the set the layout was loaded for.
    pub fn needs_load(&self, fields: &[Field]) -> bool {
        self.loaded_fingerprint != Some(fields_fingerprint(fields))
    }

    /// Applies a load for `fields` given the remote record (if any).
    ///
    /// Unsaved local changes win over a reload: when dirty, only the column
    /// order is repaired against the new field set.
    pub fn apply_loaded(&mut self, remote: Option<ViewSettings>, fields: &[Field]) -> LayoutSource {
        self.loaded_fingerprint = Some(fields_fingerprint(fields));

        if self.dirty {
            self.state.column_order = repair_column_order(&self.state.column_order, fields);
            let source = self.source.unwrap_or(LayoutSource::Default);
            log_debug!("LAYOUT", "reload while dirty; kept local layout for {}", self.view.as_str());
            return source;
        }

        let cached = self.cache.load(&self.table, self.view.as_str());
        let (mut layout, source) = resolve_layout(remote, cached, fields);
        if source != LayoutSource::Remote {
            // The cache has no slot for these two.
            layout.row_height_preset = self.state.row_height_preset;
            layout.frozen_columns = self.state.frozen_columns;
        }
        for width in layout.column_widths.values_mut() {
            *width = self.limits.clamp(*width);
        }

        self.state = layout;
        self.source = Some(source);
        source
    }

    /// Re-fits the column order to `fields` without a reload.
    pub fn repair_order(&mut self, fields: &[Field]) -> bool {
        let repaired = repair_column_order(&self.state.column_order, fields);
        if repaired == self.state.column_order {
            return false;
        }
        self.state.column_order = repaired;
        true
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    fn mark(&mut self, changed: bool) -> bool {
        if changed {
            self.dirty = true;
        }
        changed
    }

    pub fn resize_column(&mut self, field: &str, width: f64) -> bool {
        let limits = self.limits;
        let changed = self.state.set_column_width(field, width, &limits);
        self.mark(changed)
    }

    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        let changed = self.state.move_column(from, to);
        self.mark(changed)
    }

    pub fn move_column_named(&mut self, field: &str, to: usize) -> bool {
        let changed = self.state.move_column_named(field, to);
        self.mark(changed)
    }

    pub fn set_wrap(&mut self, field: &str, wrap: bool) -> bool {
        let changed = self.state.set_wrap(field, wrap);
        self.mark(changed)
    }

    /// Flips the wrap flag and returns the new value.
    pub fn toggle_wrap(&mut self, field: &str) -> bool {
        let next = !self.state.wraps(field);
        self.set_wrap(field, next);
        next
    }

    pub fn set_row_height(&mut self, row: &RowId, height: Option<f64>) -> bool {
        let changed = self.state.set_row_height(row, height);
        self.mark(changed)
    }

    pub fn set_row_height_preset(&mut self, preset: RowHeightPreset) -> bool {
        let changed = self.state.set_row_height_preset(preset);
        self.mark(changed)
    }

    pub fn set_frozen_columns(&mut self, count: u32) -> bool {
        let changed = self.state.set_frozen_columns(count);
        self.mark(changed)
    }

    // ========================================================================
    // FLUSH
    // ========================================================================

    /// Mirrors the layout into the cache and says what remains to be done
    /// remotely. Clears the dirty flag; a failed remote write is not retried.
    pub fn take_flush(&mut self) -> FlushPlan {
        if !self.dirty {
            return FlushPlan::Clean;
        }
        self.dirty = false;

        for err in self.cache.save(&self.table, self.view.as_str(), &self.state) {
            log_warn!("LAYOUT", "cache write failed for {}: {}", self.view.as_str(), err);
        }

        match &self.view {
            ViewKey::Remote(key) => FlushPlan::Remote(ViewSettings::from_layout(key.clone(), &self.state)),
            ViewKey::LocalOnly(_) => FlushPlan::LocalOnly,
        }
    }

    // ========================================================================
    // DERIVED
    // ========================================================================

    pub fn column_widths(&self, order: &[String]) -> Vec<f64> {
        self.state.widths_for(order, &self.limits)
    }

    pub fn height_model(&self, group_header_height: f64) -> HeightModel {
        HeightModel {
            preset: self.state.row_height_preset,
            overrides: self.state.height_overrides(),
            group_header_height,
        }
    }
}
