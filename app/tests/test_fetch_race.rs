//! FILENAME: app/tests/test_fetch_race.rs
//! PURPOSE: Tests for refresh ordering, server-side filters and sort.

mod common;

use std::time::Duration;

use app_lib::{FetchOutcome, GridError, MemoryDataService, QueryFilter, ServiceError};
use common::{TestHarness, TABLE, VIEW_ID};
use engine::{Row, SortRule};

fn names(harness: &TestHarness) -> Vec<String> {
    harness
        .grid
        .rows()
        .iter()
        .map(|r| r.get("Name").plain_text())
        .collect()
}

// ============================================================================
// STALE RESPONSES
// ============================================================================

#[tokio::test]
async fn test_stale_response_is_dropped() {
    let harness = TestHarness::loaded().await;
    harness.data.push_fetch_delay(Duration::from_millis(40));

    let (slow, fast) = tokio::join!(harness.grid.refresh(), async {
        harness.data.push_row(TABLE, Row::new(5).with("Name", "Late"));
        harness.grid.refresh().await
    });

    assert_eq!(slow.unwrap(), FetchOutcome::Stale);
    assert_eq!(fast.unwrap(), FetchOutcome::Applied { rows: 5 });
    assert_eq!(harness.grid.rows().len(), 5);
}

#[tokio::test]
async fn test_superseded_filter_is_dropped() {
    let harness = TestHarness::loaded().await;
    harness.data.push_fetch_delay(Duration::from_millis(40));

    let (slow, fast) = tokio::join!(
        harness.grid.set_filters(vec![QueryFilter::Eq {
            field: "Name".to_string(),
            value: "Build".to_string(),
        }]),
        harness.grid.set_filters(Vec::new()),
    );

    assert_eq!(slow.unwrap(), FetchOutcome::Stale);
    assert_eq!(fast.unwrap(), FetchOutcome::Applied { rows: 4 });
}

#[tokio::test]
async fn test_failed_refresh_keeps_rows() {
    let harness = TestHarness::loaded().await;
    harness.data.set_fail_fetches(true);

    let result = harness.grid.refresh().await;
    assert!(matches!(
        result,
        Err(GridError::Service(ServiceError::Request(_)))
    ));
    assert_eq!(harness.grid.rows().len(), 4);

    harness.data.clear_failures();
    assert_eq!(
        harness.grid.refresh().await.unwrap(),
        FetchOutcome::Applied { rows: 4 }
    );
}

#[tokio::test]
async fn test_unknown_table_is_an_error() {
    let harness = TestHarness::with_service(VIEW_ID, MemoryDataService::new());
    assert!(matches!(
        harness.grid.refresh().await,
        Err(GridError::Service(ServiceError::UnknownTable(_)))
    ));
    assert!(harness.grid.rows().is_empty());
}

// ============================================================================
// FILTERS AND SORT
// ============================================================================

#[tokio::test]
async fn test_like_filter_is_applied_by_the_service() {
    let harness = TestHarness::loaded().await;
    let before = harness.data.fetch_count();

    let outcome = harness
        .grid
        .set_filters(vec![QueryFilter::Like {
            field: "Name".to_string(),
            pattern: "%i%".to_string(),
            case_insensitive: false,
        }])
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { rows: 3 });
    assert_eq!(names(&harness), vec!["Write spec", "Build", "Ship"]);
    assert_eq!(harness.data.fetch_count(), before + 1);
}

#[tokio::test]
async fn test_like_filter_case_and_wildcards() {
    let harness = TestHarness::loaded().await;

    harness
        .grid
        .set_filters(vec![QueryFilter::Like {
            field: "Name".to_string(),
            pattern: "t_st".to_string(),
            case_insensitive: true,
        }])
        .await
        .unwrap();
    assert_eq!(names(&harness), vec!["Test"]);

    harness
        .grid
        .set_filters(vec![QueryFilter::Like {
            field: "Name".to_string(),
            pattern: "t_st".to_string(),
            case_insensitive: false,
        }])
        .await
        .unwrap();
    assert!(names(&harness).is_empty());
}

#[tokio::test]
async fn test_is_null_filter() {
    let harness = TestHarness::loaded().await;

    harness
        .grid
        .set_filters(vec![QueryFilter::IsNull {
            field: "Status".to_string(),
        }])
        .await
        .unwrap();
    assert_eq!(names(&harness), vec!["Ship"]);
}

#[tokio::test]
async fn test_sort_is_applied_by_the_service() {
    let harness = TestHarness::loaded().await;

    harness.grid.set_sort(vec![SortRule::desc("Points")]).await.unwrap();
    assert_eq!(names(&harness), vec!["Build", "Write spec", "Test", "Ship"]);

    harness.grid.set_sort(vec![SortRule::asc("Due")]).await.unwrap();
    // Blank dates sort last.
    assert_eq!(names(&harness), vec!["Write spec", "Test", "Build", "Ship"]);
}
