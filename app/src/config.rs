//! FILENAME: app/src/config.rs
// PURPOSE: Grid configuration, read from JSON.
// CONTEXT: Every field has a default, so a partial file (or none at all)
// still yields a complete config.

use std::path::{Path, PathBuf};

use engine::RowHeightPreset;
use persistence::{WidthLimits, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use view_engine::{GroupOptions, LabelMaps, WindowConfig, DEFAULT_EMPTY_LABEL, DEFAULT_GROUP_HEADER_HEIGHT};

use crate::error::GridError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub window: WindowConfig,
    pub group_header_height: f64,
    /// Preset used until a layout says otherwise.
    pub default_row_height: RowHeightPreset,
    pub empty_label: String,
    pub empty_last: bool,
    pub column_widths: WidthLimits,
    /// Horizontal overscan for the column window, in pixels.
    pub column_overscan: f64,
    pub cache_namespace: String,
    pub log_file: Option<PathBuf>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            window: WindowConfig::default(),
            group_header_height: DEFAULT_GROUP_HEADER_HEIGHT,
            default_row_height: RowHeightPreset::Short,
            empty_label: DEFAULT_EMPTY_LABEL.to_string(),
            empty_last: true,
            column_widths: WidthLimits::default(),
            column_overscan: 200.0,
            cache_namespace: DEFAULT_NAMESPACE.to_string(),
            log_file: None,
        }
    }
}

impl GridConfig {
    /// Reads a config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(GridConfig::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, GridError> {
        serde_json::from_str(raw).map_err(|e| GridError::Config(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GridError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| GridError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Group builder options with the given label maps.
    pub fn group_options(&self, empty_last: bool, label_maps: LabelMaps) -> GroupOptions {
        GroupOptions {
            empty_label: self.empty_label.clone(),
            empty_last,
            label_maps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GridConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GridConfig::default());
        assert_eq!(config.window.overscan_before, 100.0);
        assert_eq!(config.window.overscan_after, 200.0);
        assert_eq!(config.window.lookback, 2);
        assert_eq!(config.column_widths.min, 60.0);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = GridConfig::from_json(
            r#"{"window": {"overscan_after": 400.0}, "empty_label": "None", "empty_last": false}"#,
        )
        .unwrap();
        assert_eq!(config.window.overscan_after, 400.0);
        assert_eq!(config.window.overscan_before, 100.0);
        assert_eq!(config.empty_label, "None");
        assert!(!config.empty_last);
        assert_eq!(config.group_header_height, 40.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let config = GridConfig {
            default_row_height: RowHeightPreset::Tall,
            cache_namespace: "tasks-app".to_string(),
            ..GridConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(GridConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let err = GridConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }
}
