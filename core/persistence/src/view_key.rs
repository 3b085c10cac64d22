//! FILENAME: core/persistence/src/view_key.rs
//! PURPOSE: Normalizes view identifiers into persistence keys.
//! CONTEXT: The settings table is keyed by UUID. Views whose identifier is
//! not a UUID (e.g. built-in or unsaved views) persist to the local cache only.

use uuid::Uuid;

use crate::error::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    /// Valid remote key, lower-case hyphenated.
    Remote(String),
    /// Anything else; trimmed and lower-cased.
    LocalOnly(String),
}

impl ViewKey {
    pub fn normalize(raw: &str) -> ViewKey {
        let trimmed = raw.trim();
        match Uuid::parse_str(trimmed) {
            Ok(id) => ViewKey::Remote(id.hyphenated().to_string()),
            Err(_) => ViewKey::LocalOnly(trimmed.to_lowercase()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ViewKey::Remote(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ViewKey::Remote(s) | ViewKey::LocalOnly(s) => s,
        }
    }

    /// The remote key, or an error for local-only views.
    pub fn remote_id(&self) -> Result<&str, PersistenceError> {
        match self {
            ViewKey::Remote(s) => Ok(s),
            ViewKey::LocalOnly(s) => Err(PersistenceError::InvalidViewKey(s.clone())),
        }
    }
}
