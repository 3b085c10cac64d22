//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for grid view integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use app_lib::{GridConfig, GridView, MemoryDataService, MemorySettingsService};
use engine::{Field, FieldType, Row, RowId, SelectChoice};
use persistence::MemoryStore;
use view_engine::RenderItem;

pub const TABLE: &str = "tasks";
pub const PEOPLE: &str = "people";
pub const VIEW_ID: &str = "5f0c6a9e-2d41-4b8a-9c3e-7a1b2c3d4e5f";
pub const LOCAL_VIEW: &str = "Grid view";

/// Grid over shared services, so a second grid can reopen the same view.
pub type SharedGrid = GridView<Arc<MemoryDataService>, Arc<MemorySettingsService>, Arc<MemoryStore>>;

/// Test harness for creating and managing grid state.
pub struct TestHarness {
    pub data: Arc<MemoryDataService>,
    pub settings: Arc<MemorySettingsService>,
    pub store: Arc<MemoryStore>,
    pub view_id: String,
    pub grid: SharedGrid,
}

impl TestHarness {
    /// Sample task table on the remote view, not yet fetched.
    pub fn new() -> Self {
        Self::with_view(VIEW_ID)
    }

    pub fn with_view(view_id: &str) -> Self {
        Self::with_service(view_id, sample_service())
    }

    /// A task table of `count` plain rows.
    pub fn with_large_data(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| Row::new(i + 1).with("Name", format!("Task {}", i + 1)))
            .collect();
        let data = MemoryDataService::new().with_table(TABLE, sample_fields(), rows);
        Self::with_service(VIEW_ID, data)
    }

    pub fn with_service(view_id: &str, data: MemoryDataService) -> Self {
        let data = Arc::new(data);
        let settings = Arc::new(MemorySettingsService::new());
        let store = Arc::new(MemoryStore::new());
        let grid = GridView::new(
            TABLE,
            view_id,
            Arc::clone(&data),
            Arc::clone(&settings),
            Arc::clone(&store),
            GridConfig::default(),
        );
        TestHarness {
            data,
            settings,
            store,
            view_id: view_id.to_string(),
            grid,
        }
    }

    /// Sample data, already fetched.
    pub async fn loaded() -> Self {
        let harness = Self::new();
        harness.grid.refresh().await.unwrap();
        harness
    }

    /// A second grid over the same services and cache.
    pub fn reopen(&self) -> SharedGrid {
        self.reopen_as(&self.view_id)
    }

    /// Like `reopen`, but under a differently spelled view id.
    pub fn reopen_as(&self, view_id: &str) -> SharedGrid {
        GridView::new(
            TABLE,
            view_id,
            Arc::clone(&self.data),
            Arc::clone(&self.settings),
            Arc::clone(&self.store),
            GridConfig::default(),
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn status_field() -> Field {
    Field::new("fld_status", "Status", FieldType::SingleSelect)
        .with_order(1)
        .with_choices(vec![SelectChoice::new("sA", "A"), SelectChoice::new("sB", "B")])
}

pub fn sample_fields() -> Vec<Field> {
    vec![
        Field::new("fld_name", "Name", FieldType::Text).with_order(0),
        status_field(),
        Field::new("fld_points", "Points", FieldType::Number).with_order(2),
        Field::new("fld_due", "Due", FieldType::Date).with_order(3),
        Field::new("fld_owner", "Owner", FieldType::Link)
            .with_order(4)
            .with_linked_table(PEOPLE),
        Field::new("fld_created", "Created", FieldType::CreatedTime).with_order(5),
    ]
}

/// Four tasks. Row 4 has no status, due date or owner.
pub fn sample_rows() -> Vec<Row> {
    vec![
        Row::new(1)
            .with("Name", "Write spec")
            .with("Status", "sA")
            .with("Points", 3.0)
            .with("Due", "2024-01-15")
            .with("Owner", "p1"),
        Row::new(2)
            .with("Name", "Build")
            .with("Status", "sB")
            .with("Points", 5.0)
            .with("Due", "2024-02-03")
            .with("Owner", "p2"),
        Row::new(3)
            .with("Name", "Test")
            .with("Status", "sA")
            .with("Points", 2.0)
            .with("Due", "2024-01-28")
            .with("Owner", "p1"),
        Row::new(4).with("Name", "Ship").with("Points", 1.0),
    ]
}

pub fn people_fields() -> Vec<Field> {
    vec![Field::new("fld_person", "Full name", FieldType::Text).with_order(0)]
}

pub fn people_rows() -> Vec<Row> {
    vec![
        Row::new("p1").with("Full name", "Ada"),
        Row::new("p2").with("Full name", "Grace"),
    ]
}

pub fn sample_service() -> MemoryDataService {
    MemoryDataService::new()
        .with_table(TABLE, sample_fields(), sample_rows())
        .with_table(PEOPLE, people_fields(), people_rows())
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn id(raw: impl Into<RowId>) -> RowId {
    raw.into()
}

/// Compact rendering of an item list: `#key` for headers, the id for rows.
pub fn outline(items: &[RenderItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            RenderItem::GroupHeader { key, .. } => format!("#{}", key),
            RenderItem::Row { row, .. } => row.id.to_string(),
        })
        .collect()
}

pub fn header_sizes(items: &[RenderItem]) -> Vec<(String, usize)> {
    items
        .iter()
        .filter_map(|item| match item {
            RenderItem::GroupHeader { label, size, .. } => Some((label.clone(), *size)),
            RenderItem::Row { .. } => None,
        })
        .collect()
}
