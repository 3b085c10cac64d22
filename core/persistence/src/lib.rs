//! FILENAME: core/persistence/src/lib.rs
//! Grid Persistence Module
//!
//! Layout state, the per-view settings record, column-order repair and the
//! local key/value cache that mirrors layout when the settings record is
//! unavailable.

mod cache;
mod error;
mod layout;
mod order;
mod view_key;

pub use cache::{CacheArtifact, FileStore, KeyValueStore, LayoutCache, MemoryStore, DEFAULT_NAMESPACE};
pub use error::PersistenceError;
pub use layout::{LayoutState, ViewSettings, WidthLimits};
pub use order::{default_column_order, fields_fingerprint, repair_column_order};
pub use view_key::ViewKey;

/// Picks the layout to start from, in precedence order: remote record,
/// local cache, fresh default. The column order is repaired in every case.
pub fn resolve_layout(
    remote: Option<ViewSettings>,
    cached: Option<LayoutState>,
    fields: &[engine::Field],
) -> (LayoutState, LayoutSource) {
    let (mut layout, source) = match (remote, cached) {
        (Some(record), _) => (record.into_layout(), LayoutSource::Remote),
        (None, Some(layout)) => (layout, LayoutSource::Cache),
        (None, None) => (LayoutState::default(), LayoutSource::Default),
    };
    layout.column_order = repair_column_order(&layout.column_order, fields);
    (layout, source)
}

/// Where a loaded layout came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSource {
    Remote,
    Cache,
    Default,
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Field, FieldType};

    fn fields() -> Vec<Field> {
        vec![
            Field::new("1", "Name", FieldType::Text).with_order(0),
            Field::new("2", "Status", FieldType::SingleSelect).with_order(1),
        ]
    }

    #[test]
    fn test_remote_wins_over_cache() {
        let remote = ViewSettings {
            column_order: vec!["Status".to_string()],
            ..ViewSettings::from_layout("v", &LayoutState::default())
        };
        let cached = LayoutState {
            column_order: vec!["Name".to_string(), "Status".to_string()],
            ..LayoutState::default()
        };
        let (layout, source) = resolve_layout(Some(remote), Some(cached), &fields());
        assert_eq!(source, LayoutSource::Remote);
        assert_eq!(layout.column_order, vec!["Status", "Name"]);
    }

    #[test]
    fn test_cache_then_default() {
        let cached = LayoutState {
            column_order: vec!["Gone".to_string(), "Status".to_string()],
            ..LayoutState::default()
        };
        let (layout, source) = resolve_layout(None, Some(cached), &fields());
        assert_eq!(source, LayoutSource::Cache);
        assert_eq!(layout.column_order, vec!["Status", "Name"]);

        let (layout, source) = resolve_layout(None, None, &fields());
        assert_eq!(source, LayoutSource::Default);
        assert_eq!(layout.column_order, vec!["Name", "Status"]);
    }
}
