//! FILENAME: app/src/lib.rs
// PURPOSE: Main library entry point for the grid view core.
// CONTEXT: Wires the data model (`engine`), the view pipeline (`view-engine`)
// and layout persistence (`persistence`) into a grid controller that talks
// to the outside world through the service traits.

pub mod batch;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod grid;
pub mod layout;
pub mod logging;
pub mod memory;
pub mod service;

pub use batch::{plan_bulk_edit, plan_fill, plan_paste, BatchMode, BatchPlan, BatchReport, CellFailure, PlannedWrite};
pub use clipboard::{copy_range, parse_tsv, to_tsv, CellRange};
pub use config::GridConfig;
pub use error::{GridError, ServiceError};
pub use events::{GridEvent, SubscriptionId, Subscribers};
pub use fetch::{FetchGenerations, FetchTicket};
pub use grid::{ColumnViewport, FetchOutcome, FlushOutcome, GridView, GroupTree, Viewport};
pub use layout::{FlushPlan, LayoutController};
pub use logging::{close_log_file, get_log_path, init_log_file, next_seq, write_log};
pub use memory::{like_to_regex, MemoryDataService, MemorySettingsService};
pub use service::{DataService, LabelService, QueryFilter, RowQuery, SettingsService};

use persistence::MemoryStore;

/// Grid view backed entirely by in-process services.
pub type MemoryGridView = GridView<MemoryDataService, MemorySettingsService, MemoryStore>;

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Opens the log file named by the config, if any. Logging to the `log`
/// facade works without it.
pub fn init_logging(config: &GridConfig) -> Result<(), GridError> {
    if let Some(path) = &config.log_file {
        init_log_file(path).map_err(GridError::Config)?;
        log_info!("SYS", "Logging to {:?}", path);
    }
    Ok(())
}

/// Creates an in-memory grid view over `table`.
pub fn create_memory_grid(
    table: &str,
    view_id: &str,
    data: MemoryDataService,
    settings: MemorySettingsService,
    config: GridConfig,
) -> MemoryGridView {
    log_info!("SYS", "Creating in-memory grid for {}", table);
    GridView::new(table, view_id, data, settings, MemoryStore::new(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Field, FieldType, Row};

    #[tokio::test]
    async fn test_create_memory_grid() {
        let data = MemoryDataService::new().with_table(
            "tasks",
            vec![Field::new("1", "Name", FieldType::Text)],
            vec![Row::new(1).with("Name", "First")],
        );
        let grid = create_memory_grid("tasks", "Grid", data, MemorySettingsService::new(), GridConfig::default());

        assert_eq!(grid.refresh().await.unwrap(), FetchOutcome::Applied { rows: 1 });
        assert_eq!(grid.render_items().len(), 1);
    }

    #[test]
    fn test_init_logging_without_file() {
        assert!(init_logging(&GridConfig::default()).is_ok());
    }
}
