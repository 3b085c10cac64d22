//! FILENAME: core/persistence/src/cache.rs
//! PURPOSE: Local key/value cache mirroring the layout settings.
//! CONTEXT: Plays the role of browser local storage: string values under
//! namespaced keys. Used when the settings record is unavailable or the
//! view has no remote key.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;
use crate::layout::LayoutState;

pub const DEFAULT_NAMESPACE: &str = "grid";

// ============================================================================
// STORES
// ============================================================================

/// String key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
}

/// In-process store with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStore {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(PersistenceError::Storage("quota exceeded".to_string()));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// LAYOUT CACHE
// ============================================================================

/// The four layout artifacts kept in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheArtifact {
    ColumnWidths,
    ColumnOrder,
    WrapText,
    RowHeights,
}

impl CacheArtifact {
    pub const ALL: [CacheArtifact; 4] = [
        CacheArtifact::ColumnWidths,
        CacheArtifact::ColumnOrder,
        CacheArtifact::WrapText,
        CacheArtifact::RowHeights,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CacheArtifact::ColumnWidths => "columnWidths",
            CacheArtifact::ColumnOrder => "columnOrder",
            CacheArtifact::WrapText => "wrapText",
            CacheArtifact::RowHeights => "rowHeights",
        }
    }
}

/// Layout mirror over any key/value store.
pub struct LayoutCache<S: KeyValueStore> {
    store: S,
    namespace: String,
}

impl<S: KeyValueStore> LayoutCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
        LayoutCache {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `<namespace>:<table>:<view>:<artifact>`
    pub fn key(&self, table: &str, view: &str, artifact: CacheArtifact) -> String {
        format!("{}:{}:{}:{}", self.namespace, table, view, artifact.name())
    }

    /// Reads whatever artifacts exist. `None` when none do.
    /// Unreadable or corrupt entries count as absent.
    pub fn load(&self, table: &str, view: &str) -> Option<LayoutState> {
        let widths: Option<BTreeMap<String, f64>> =
            self.read(table, view, CacheArtifact::ColumnWidths);
        let order: Option<Vec<String>> = self.read(table, view, CacheArtifact::ColumnOrder);
        let wrap: Option<BTreeMap<String, bool>> = self.read(table, view, CacheArtifact::WrapText);
        let heights: Option<BTreeMap<String, f64>> =
            self.read(table, view, CacheArtifact::RowHeights);

        if widths.is_none() && order.is_none() && wrap.is_none() && heights.is_none() {
            return None;
        }

        Some(LayoutState {
            column_widths: widths.unwrap_or_default(),
            column_order: order.unwrap_or_default(),
            wrap_text: wrap.unwrap_or_default(),
            row_heights: heights.unwrap_or_default(),
            ..LayoutState::default()
        })
    }

    /// Writes every artifact, continuing past failures.
    /// Returns the failures so the caller can log them.
    pub fn save(&self, table: &str, view: &str, layout: &LayoutState) -> Vec<PersistenceError> {
        let mut errors = Vec::new();
        let writes = [
            self.write(table, view, CacheArtifact::ColumnWidths, &layout.column_widths),
            self.write(table, view, CacheArtifact::ColumnOrder, &layout.column_order),
            self.write(table, view, CacheArtifact::WrapText, &layout.wrap_text),
            self.write(table, view, CacheArtifact::RowHeights, &layout.row_heights),
        ];
        for result in writes {
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }

    pub fn clear(&self, table: &str, view: &str) -> Result<(), PersistenceError> {
        for artifact in CacheArtifact::ALL {
            self.store.remove(&self.key(table, view, artifact))?;
        }
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, table: &str, view: &str, artifact: CacheArtifact) -> Option<T> {
        let raw = self.store.get(&self.key(table, view, artifact)).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn write<T: Serialize>(
        &self,
        table: &str,
        view: &str,
        artifact: CacheArtifact,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(value)?;
        self.store.set(&self.key(table, view, artifact), &json)
    }
}
