//! FILENAME: app/src/memory.rs
// PURPOSE: In-process implementations of the service traits.
// CONTEXT: Used by the test suite and for offline use. Failures and response
// delays can be injected per call so races and rollbacks are reproducible.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use engine::{CellValue, Field, Row, RowId, SortDirection, SortRule};
use persistence::{default_column_order, ViewSettings};
use regex::Regex;

use crate::error::ServiceError;
use crate::service::{DataService, LabelService, QueryFilter, RowQuery, SettingsService};

fn lock_err<T>(e: std::sync::PoisonError<T>) -> ServiceError {
    ServiceError::Request(format!("lock poisoned: {}", e))
}

// ============================================================================
// PATTERN MATCHING
// ============================================================================

/// Compiles an SQL LIKE pattern (`%` any run, `_` one character) into an
/// anchored regex.
pub fn like_to_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    Regex::new(&re)
}

enum CompiledFilter<'a> {
    Eq(&'a str, &'a str),
    Like(&'a str, Regex),
    IsNull(&'a str),
}

impl CompiledFilter<'_> {
    fn matches(&self, row: &Row) -> bool {
        match self {
            CompiledFilter::Eq(field, value) => row.get(field).plain_text() == *value,
            CompiledFilter::Like(field, re) => {
                let value = row.get(field);
                !value.is_blank() && re.is_match(&value.plain_text())
            }
            CompiledFilter::IsNull(field) => row.get(field).is_blank(),
        }
    }
}

fn compile_filters(filters: &[QueryFilter]) -> Result<Vec<CompiledFilter<'_>>, ServiceError> {
    filters
        .iter()
        .map(|f| match f {
            QueryFilter::Eq { field, value } => Ok(CompiledFilter::Eq(field, value)),
            QueryFilter::Like {
                field,
                pattern,
                case_insensitive,
            } => like_to_regex(pattern, *case_insensitive)
                .map(|re| CompiledFilter::Like(field, re))
                .map_err(|e| ServiceError::Rejected(format!("bad pattern '{}': {}", pattern, e))),
            QueryFilter::IsNull { field } => Ok(CompiledFilter::IsNull(field)),
        })
        .collect()
}

/// Numbers compare numerically, everything else by lower-cased text.
/// Blanks sort after values in either direction.
fn compare_rows(a: &Row, b: &Row, order: &[SortRule]) -> CmpOrdering {
    for rule in order {
        let (va, vb) = (a.get(&rule.field), b.get(&rule.field));
        let ord = match (va.is_blank(), vb.is_blank()) {
            (true, true) => CmpOrdering::Equal,
            (true, false) => CmpOrdering::Greater,
            (false, true) => CmpOrdering::Less,
            (false, false) => {
                let ord = match (va.as_number(), vb.as_number()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
                    _ => va
                        .plain_text()
                        .to_lowercase()
                        .cmp(&vb.plain_text().to_lowercase()),
                };
                match rule.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            }
        };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}

// ============================================================================
// DATA SERVICE
// ============================================================================

#[derive(Debug, Default)]
struct MemoryTable {
    fields: Vec<Field>,
    rows: Vec<Row>,
}

/// Tables held in memory. Also answers label lookups from the primary
/// (first-ordered) field of the linked table.
#[derive(Debug, Default)]
pub struct MemoryDataService {
    tables: Mutex<HashMap<String, MemoryTable>>,
    fetch_delays: Mutex<VecDeque<Duration>>,
    update_delays: Mutex<VecDeque<Duration>>,
    failing_cells: Mutex<HashSet<(String, String)>>,
    fail_fetches: AtomicBool,
    fail_labels: AtomicBool,
    fetch_count: AtomicUsize,
    update_count: AtomicUsize,
    label_count: AtomicUsize,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, fields: Vec<Field>, rows: Vec<Row>) -> Self {
        self.put_table(table, fields, rows);
        self
    }

    /// Creates or replaces a table.
    pub fn put_table(&self, table: &str, fields: Vec<Field>, rows: Vec<Row>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(table.to_string(), MemoryTable { fields, rows });
        }
    }

    /// Appends a row directly, bypassing the service API.
    pub fn push_row(&self, table: &str, row: Row) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.entry(table.to_string()).or_default().rows.push(row);
        }
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .ok()
            .and_then(|t| t.get(table).map(|t| t.rows.clone()))
            .unwrap_or_default()
    }

    pub fn row(&self, table: &str, id: &RowId) -> Option<Row> {
        self.rows(table).into_iter().find(|r| &r.id == id)
    }

    /// The next `fetch_rows` call answers after `delay`, with the data it
    /// saw when it was called.
    pub fn push_fetch_delay(&self, delay: Duration) {
        if let Ok(mut q) = self.fetch_delays.lock() {
            q.push_back(delay);
        }
    }

    pub fn push_update_delay(&self, delay: Duration) {
        if let Ok(mut q) = self.update_delays.lock() {
            q.push_back(delay);
        }
    }

    /// Every write to this cell is refused until `clear_failures`.
    pub fn fail_updates_for(&self, row: impl Into<RowId>, field: &str) {
        if let Ok(mut set) = self.failing_cells.lock() {
            set.insert((row.into().0, field.to_string()));
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut set) = self.failing_cells.lock() {
            set.clear();
        }
        self.fail_fetches.store(false, Ordering::SeqCst);
        self.fail_labels.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_labels(&self, fail: bool) {
        self.fail_labels.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    pub fn label_count(&self) -> usize {
        self.label_count.load(Ordering::SeqCst)
    }

    fn next_delay(queue: &Mutex<VecDeque<Duration>>) -> Option<Duration> {
        queue.lock().ok().and_then(|mut q| q.pop_front())
    }

    fn is_failing(&self, row: &RowId, field: &str) -> bool {
        self.failing_cells
            .lock()
            .map(|set| set.contains(&(row.0.clone(), field.to_string())))
            .unwrap_or(false)
    }

    fn query_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ServiceError> {
        let filters = compile_filters(&query.filters)?;
        let tables = self.tables.lock().map_err(lock_err)?;
        let table = tables
            .get(&query.table)
            .ok_or_else(|| ServiceError::UnknownTable(query.table.clone()))?;

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        }

        if !query.columns.is_empty() {
            for row in rows.iter_mut() {
                row.values.retain(|k, _| query.columns.contains(k));
            }
        }

        Ok(rows)
    }
}

#[async_trait]
impl DataService for MemoryDataService {
    async fn fetch_fields(&self, table: &str) -> Result<Vec<Field>, ServiceError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ServiceError::Request("fetch refused".to_string()));
        }
        let tables = self.tables.lock().map_err(lock_err)?;
        tables
            .get(table)
            .map(|t| t.fields.clone())
            .ok_or_else(|| ServiceError::UnknownTable(table.to_string()))
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ServiceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ServiceError::Request("fetch refused".to_string()));
        }

        let rows = self.query_rows(query)?;
        if let Some(delay) = Self::next_delay(&self.fetch_delays) {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn update_cell(
        &self,
        table: &str,
        row_id: &RowId,
        field: &str,
        value: &CellValue,
    ) -> Result<Row, ServiceError> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = Self::next_delay(&self.update_delays) {
            tokio::time::sleep(delay).await;
        }
        if self.is_failing(row_id, field) {
            return Err(ServiceError::Rejected(format!(
                "write to {}/{} refused",
                row_id, field
            )));
        }

        let mut tables = self.tables.lock().map_err(lock_err)?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| ServiceError::UnknownTable(table.to_string()))?;

        if !table.fields.is_empty() && !table.fields.iter().any(|f| f.name == field) {
            return Err(ServiceError::Rejected(format!("unknown field '{}'", field)));
        }

        let row = table
            .rows
            .iter_mut()
            .find(|r| &r.id == row_id)
            .ok_or_else(|| ServiceError::UnknownRow(row_id.clone()))?;
        *row = row.patched(field, value.clone());
        Ok(row.clone())
    }

    async fn insert_row(
        &self,
        table: &str,
        values: Vec<(String, CellValue)>,
    ) -> Result<Row, ServiceError> {
        let mut tables = self.tables.lock().map_err(lock_err)?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| ServiceError::UnknownTable(table.to_string()))?;

        let mut row = Row::new(uuid::Uuid::new_v4().to_string());
        for (field, value) in values {
            if !value.is_blank() {
                row.values.insert(field, value);
            }
        }
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn delete_row(&self, table: &str, row_id: &RowId) -> Result<(), ServiceError> {
        let mut tables = self.tables.lock().map_err(lock_err)?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| ServiceError::UnknownTable(table.to_string()))?;

        let before = table.rows.len();
        table.rows.retain(|r| &r.id != row_id);
        if table.rows.len() == before {
            return Err(ServiceError::UnknownRow(row_id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl LabelService for MemoryDataService {
    async fn resolve_labels(
        &self,
        table: &str,
        ids: &[String],
    ) -> Result<HashMap<String, String>, ServiceError> {
        self.label_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_labels.load(Ordering::SeqCst) {
            return Err(ServiceError::Request("label lookup refused".to_string()));
        }

        let tables = self.tables.lock().map_err(lock_err)?;
        let table = tables
            .get(table)
            .ok_or_else(|| ServiceError::UnknownTable(table.to_string()))?;

        let primary = match default_column_order(&table.fields).into_iter().next() {
            Some(name) => name,
            None => return Ok(HashMap::new()),
        };

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(table
            .rows
            .iter()
            .filter(|r| wanted.contains(r.id.as_str()))
            .map(|r| (r.id.0.clone(), r.get(&primary).plain_text()))
            .collect())
    }
}

// ============================================================================
// SETTINGS SERVICE
// ============================================================================

/// Settings records keyed by view key.
#[derive(Debug, Default)]
pub struct MemorySettingsService {
    records: Mutex<HashMap<String, ViewSettings>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    load_count: AtomicUsize,
    save_count: AtomicUsize,
}

impl MemorySettingsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ViewSettings) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.view_id.clone(), record);
        }
    }

    pub fn get(&self, view_key: &str) -> Option<ViewSettings> {
        self.records.lock().ok()?.get(view_key).cloned()
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsService for MemorySettingsService {
    async fn load(&self, view_key: &str) -> Result<Option<ViewSettings>, ServiceError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ServiceError::Request("settings load refused".to_string()));
        }
        let records = self.records.lock().map_err(lock_err)?;
        Ok(records.get(view_key).cloned())
    }

    async fn upsert(&self, record: &ViewSettings) -> Result<(), ServiceError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ServiceError::Request("settings save refused".to_string()));
        }
        let mut records = self.records.lock().map_err(lock_err)?;
        records.insert(record.view_id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::FieldType;

    fn service() -> MemoryDataService {
        MemoryDataService::new().with_table(
            "people",
            vec![
                Field::new("f1", "Name", FieldType::Text).with_order(0),
                Field::new("f2", "Age", FieldType::Number).with_order(1),
            ],
            vec![
                Row::new(1).with("Name", "alice").with("Age", 30.0),
                Row::new(2).with("Name", "Bob").with("Age", 9.0),
                Row::new(3).with("Age", 41.0),
                Row::new(4).with("Name", "carol_b").with("Age", 30.0),
            ],
        )
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_like_to_regex() {
        let re = like_to_regex("a%", false).unwrap();
        assert!(re.is_match("alice"));
        assert!(!re.is_match("Alice"));

        let re = like_to_regex("_ob", true).unwrap();
        assert!(re.is_match("Bob"));
        assert!(!re.is_match("Bobby"));

        // Regex metacharacters in the pattern are literal.
        let re = like_to_regex("a.c%", false).unwrap();
        assert!(re.is_match("a.cx"));
        assert!(!re.is_match("abcx"));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let svc = service();

        let mut query = RowQuery::table("people");
        query.filters.push(QueryFilter::Like {
            field: "Name".into(),
            pattern: "%b%".into(),
            case_insensitive: true,
        });
        assert_eq!(ids(&svc.fetch_rows(&query).await.unwrap()), vec!["2", "4"]);

        let mut query = RowQuery::table("people");
        query.filters.push(QueryFilter::IsNull { field: "Name".into() });
        assert_eq!(ids(&svc.fetch_rows(&query).await.unwrap()), vec!["3"]);

        let mut query = RowQuery::table("people");
        query.filters.push(QueryFilter::Eq { field: "Age".into(), value: "30".into() });
        assert_eq!(ids(&svc.fetch_rows(&query).await.unwrap()), vec!["1", "4"]);
    }

    #[tokio::test]
    async fn test_query_order_and_columns() {
        let svc = service();
        let mut query = RowQuery::table("people");
        query.order = vec![SortRule::desc("Age"), SortRule::asc("Name")];
        query.columns = vec!["Name".into()];

        let rows = svc.fetch_rows(&query).await.unwrap();
        assert_eq!(ids(&rows), vec!["3", "1", "4", "2"]);
        assert!(rows.iter().all(|r| r.get("Age").is_blank()));

        let mut query = RowQuery::table("people");
        query.order = vec![SortRule::asc("Name")];
        let rows = svc.fetch_rows(&query).await.unwrap();
        // Blank names last.
        assert_eq!(ids(&rows), vec!["1", "2", "4", "3"]);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let svc = service();
        let err = svc.fetch_rows(&RowQuery::table("nope")).await.unwrap_err();
        assert_eq!(err, ServiceError::UnknownTable("nope".into()));
        assert!(svc.fetch_fields("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_update_insert_delete() {
        let svc = service();
        let row = svc
            .update_cell("people", &RowId::from(2), "Name", &CellValue::text("Robert"))
            .await
            .unwrap();
        assert_eq!(row.get("Name"), &CellValue::text("Robert"));
        assert_eq!(svc.update_count(), 1);

        svc.fail_updates_for(2, "Name");
        let err = svc
            .update_cell("people", &RowId::from(2), "Name", &CellValue::text("Bobby"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
        assert_eq!(
            svc.row("people", &RowId::from(2)).unwrap().get("Name"),
            &CellValue::text("Robert")
        );

        let inserted = svc
            .insert_row("people", vec![("Name".into(), CellValue::text("Dan"))])
            .await
            .unwrap();
        assert_eq!(svc.rows("people").len(), 5);

        svc.delete_row("people", &inserted.id).await.unwrap();
        assert_eq!(svc.rows("people").len(), 4);
        assert!(svc.delete_row("people", &inserted.id).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_labels_uses_primary_field() {
        let svc = service();
        let labels = svc
            .resolve_labels("people", &["1".to_string(), "2".to_string(), "99".to_string()])
            .await
            .unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["1"], "alice");
        assert_eq!(labels["2"], "Bob");
    }

    #[tokio::test]
    async fn test_settings_service() {
        let svc = MemorySettingsService::new();
        assert_eq!(svc.load("v").await.unwrap(), None);

        let record = ViewSettings::from_layout("v", &persistence::LayoutState::default());
        svc.upsert(&record).await.unwrap();
        assert_eq!(svc.load("v").await.unwrap(), Some(record.clone()));

        svc.set_fail_saves(true);
        assert!(svc.upsert(&record).await.is_err());
        assert_eq!(svc.save_count(), 2);
    }
}
