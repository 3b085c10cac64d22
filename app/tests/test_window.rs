//! FILENAME: app/tests/test_window.rs
//! PURPOSE: Tests for row and column virtualization over the grid view.

mod common;

use app_lib::MemoryDataService;
use common::{id, outline, sample_fields, sample_rows, TestHarness, TABLE, VIEW_ID};
use engine::{GroupRule, RowHeightPreset};

// ============================================================================
// ROW WINDOW
// ============================================================================

#[tokio::test]
async fn test_window_at_top() {
    let harness = TestHarness::with_large_data(1000);
    harness.grid.refresh().await.unwrap();

    let viewport = harness.grid.window(0.0, 320.0);
    assert_eq!(viewport.window.start_index, 0);
    assert_eq!(viewport.window.end_index, 17);
    assert_eq!(viewport.window.offset_top, 0.0);
    assert_eq!(viewport.window.offset_bottom, 983.0 * 32.0);
    assert_eq!(viewport.window.total_height, 32000.0);
    assert_eq!(viewport.items.len(), 17);
}

#[tokio::test]
async fn test_window_covers_viewport_mid_list() {
    let harness = TestHarness::with_large_data(1000);
    harness.grid.refresh().await.unwrap();

    let viewport = harness.grid.window(3200.0, 320.0);
    let window = viewport.window;
    assert_eq!(window.start_index, 94);
    assert_eq!(window.end_index, 117);
    assert_eq!(window.offset_top, 94.0 * 32.0);

    assert!(window.offset_top <= 3200.0);
    assert!(window.offset_top + window.window_height() >= 3200.0 + 320.0);
    assert_eq!(
        window.offset_top + window.window_height() + window.offset_bottom,
        window.total_height
    );
    assert_eq!(viewport.items[0].row_id(), Some(&id(95)));
}

#[tokio::test]
async fn test_window_clamps_past_the_end() {
    let harness = TestHarness::with_large_data(1000);
    harness.grid.refresh().await.unwrap();

    let window = harness.grid.window(1.0e9, 320.0).window;
    assert_eq!(window.end_index, 1000);
    assert_eq!(window.offset_bottom, 0.0);
    assert_eq!(window.start_index, 984);
}

#[tokio::test]
async fn test_short_list_renders_whole() {
    let harness = TestHarness::loaded().await;
    harness.grid.set_group_rules(vec![GroupRule::field("Status")]);

    // Three headers at 40 and four rows at 32.
    let viewport = harness.grid.window(0.0, 1000.0);
    assert_eq!(viewport.window.total_height, 3.0 * 40.0 + 4.0 * 32.0);
    assert_eq!(viewport.window.range(), 0..7);
    assert_eq!(outline(&viewport.items)[0], "#sA");
}

#[tokio::test]
async fn test_empty_grid_has_empty_window() {
    let data = MemoryDataService::new().with_table(TABLE, sample_fields(), Vec::new());
    let harness = TestHarness::with_service(VIEW_ID, data);
    harness.grid.refresh().await.unwrap();

    let viewport = harness.grid.window(0.0, 500.0);
    assert!(viewport.window.is_empty());
    assert!(viewport.items.is_empty());
}

// ============================================================================
// ROW HEIGHTS
// ============================================================================

#[tokio::test]
async fn test_row_height_override() {
    let harness = TestHarness::with_large_data(1000);
    harness.grid.refresh().await.unwrap();

    assert!(harness.grid.set_row_height(&id(1), Some(200.0)));
    assert!(!harness.grid.set_row_height(&id(1), Some(200.0)));
    let window = harness.grid.window(0.0, 320.0).window;
    assert_eq!(window.total_height, 32000.0 - 32.0 + 200.0);

    assert!(harness.grid.set_row_height(&id(1), None));
    assert_eq!(harness.grid.window(0.0, 320.0).window.total_height, 32000.0);
}

#[tokio::test]
async fn test_row_height_preset() {
    let harness = TestHarness::with_large_data(100);
    harness.grid.refresh().await.unwrap();

    assert!(harness.grid.set_row_height_preset(RowHeightPreset::Medium));
    assert_eq!(harness.grid.window(0.0, 320.0).window.total_height, 5600.0);
    assert!(harness.grid.is_layout_dirty());
}

// ============================================================================
// COLUMN WINDOW
// ============================================================================

#[tokio::test]
async fn test_column_window_without_scroll() {
    let harness = TestHarness::loaded().await;
    assert!(harness.grid.set_frozen_columns(1));

    let viewport = harness.grid.column_window(0.0, 500.0);
    assert_eq!(viewport.window.frozen_width, 180.0);
    assert_eq!(viewport.columns, vec!["Name", "Status", "Points", "Due"]);
}

#[tokio::test]
async fn test_frozen_column_stays_while_scrolling() {
    let harness = TestHarness::loaded().await;
    harness.grid.set_frozen_columns(1);

    let viewport = harness.grid.column_window(400.0, 500.0);
    assert_eq!(viewport.columns, vec!["Name", "Points", "Due", "Owner", "Created"]);
    assert_eq!(viewport.window.offset_left, 180.0);
    assert_eq!(viewport.window.offset_right, 0.0);
}

#[tokio::test]
async fn test_resized_columns_are_clamped() {
    let harness = TestHarness::loaded().await;

    assert!(harness.grid.resize_column("Name", 20.0));
    assert!(harness.grid.resize_column("Status", 5000.0));
    let state = harness.grid.layout_state();
    assert_eq!(state.column_widths["Name"], 60.0);
    assert_eq!(state.column_widths["Status"], 800.0);
}

#[tokio::test]
async fn test_hidden_fields_are_not_columns() {
    let mut fields = sample_fields();
    for field in fields.iter_mut().filter(|f| f.name == "Created") {
        field.hidden = true;
    }
    let data = MemoryDataService::new().with_table(TABLE, fields, sample_rows());
    let harness = TestHarness::with_service(VIEW_ID, data);
    harness.grid.refresh().await.unwrap();

    let names: Vec<String> = harness.grid.visible_fields().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Name", "Status", "Points", "Due", "Owner"]);
    assert_eq!(harness.grid.column_window(0.0, 5000.0).columns, names);
}
