//! FILENAME: app/src/service.rs
// PURPOSE: Seams to the remote database, the settings record store and the
// linked-record label lookup.
// CONTEXT: The grid never talks to a wire protocol directly. Everything it
// needs from the outside world goes through these traits; `memory` ships
// in-process implementations for tests and offline use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use engine::{CellValue, Field, Row, RowId, SortRule};
use persistence::ViewSettings;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// ============================================================================
// QUERY
// ============================================================================

/// One server-side row filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryFilter {
    /// Plain-text equality.
    Eq { field: String, value: String },
    /// SQL-style pattern: `%` any run, `_` any single character.
    Like {
        field: String,
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    IsNull { field: String },
}

impl QueryFilter {
    pub fn field(&self) -> &str {
        match self {
            QueryFilter::Eq { field, .. }
            | QueryFilter::Like { field, .. }
            | QueryFilter::IsNull { field } => field,
        }
    }
}

/// What `fetch_rows` asks for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowQuery {
    pub table: String,
    /// Columns to return; empty means all.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    #[serde(default)]
    pub order: Vec<SortRule>,
}

impl RowQuery {
    pub fn table(table: impl Into<String>) -> Self {
        RowQuery {
            table: table.into(),
            ..RowQuery::default()
        }
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Remote table access.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn fetch_fields(&self, table: &str) -> Result<Vec<Field>, ServiceError>;

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ServiceError>;

    /// Writes one cell and returns the row as the server now has it.
    async fn update_cell(
        &self,
        table: &str,
        row_id: &RowId,
        field: &str,
        value: &CellValue,
    ) -> Result<Row, ServiceError>;

    async fn insert_row(
        &self,
        table: &str,
        values: Vec<(String, CellValue)>,
    ) -> Result<Row, ServiceError>;

    async fn delete_row(&self, table: &str, row_id: &RowId) -> Result<(), ServiceError>;
}

/// Per-view settings records, read and written wholesale.
#[async_trait]
pub trait SettingsService: Send + Sync {
    async fn load(&self, view_key: &str) -> Result<Option<ViewSettings>, ServiceError>;

    async fn upsert(&self, record: &ViewSettings) -> Result<(), ServiceError>;
}

/// Display labels of linked records.
#[async_trait]
pub trait LabelService: Send + Sync {
    /// Record id -> label for the ids that exist; missing ids are left out.
    async fn resolve_labels(
        &self,
        table: &str,
        ids: &[String],
    ) -> Result<HashMap<String, String>, ServiceError>;
}

// ============================================================================
// SHARED HANDLES
// ============================================================================

#[async_trait]
impl<T: DataService + ?Sized> DataService for Arc<T> {
    async fn fetch_fields(&self, table: &str) -> Result<Vec<Field>, ServiceError> {
        (**self).fetch_fields(table).await
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ServiceError> {
        (**self).fetch_rows(query).await
    }

    async fn update_cell(
        &self,
        table: &str,
        row_id: &RowId,
        field: &str,
        value: &CellValue,
    ) -> Result<Row, ServiceError> {
        (**self).update_cell(table, row_id, field, value).await
    }

    async fn insert_row(
        &self,
        table: &str,
        values: Vec<(String, CellValue)>,
    ) -> Result<Row, ServiceError> {
        (**self).insert_row(table, values).await
    }

    async fn delete_row(&self, table: &str, row_id: &RowId) -> Result<(), ServiceError> {
        (**self).delete_row(table, row_id).await
    }
}

#[async_trait]
impl<T: SettingsService + ?Sized> SettingsService for Arc<T> {
    async fn load(&self, view_key: &str) -> Result<Option<ViewSettings>, ServiceError> {
        (**self).load(view_key).await
    }

    async fn upsert(&self, record: &ViewSettings) -> Result<(), ServiceError> {
        (**self).upsert(record).await
    }
}

#[async_trait]
impl<T: LabelService + ?Sized> LabelService for Arc<T> {
    async fn resolve_labels(
        &self,
        table: &str,
        ids: &[String],
    ) -> Result<HashMap<String, String>, ServiceError> {
        (**self).resolve_labels(table, ids).await
    }
}
