//! FILENAME: app/src/grid.rs
// PURPOSE: Grid view controller. Owns rows, fields, view options and layout,
// and runs the fetch -> filter -> group -> flatten -> window pipeline.
// CONTEXT: All state sits behind std mutexes that are never held across an
// await. Rows are shared as `Arc<Row>` and the row list is replaced
// wholesale on every change, so derived views stay immutable.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine::{coerce_input, CellValue, Field, FieldType, GroupRule, Row, RowHeightPreset, RowId, SortRule, ValidationError};
use persistence::{KeyValueStore, LayoutCache, LayoutSource, LayoutState};
use view_engine::{
    all_group_keys, build_groups, compute_column_window, compute_window, filter_rows, flatten_groups,
    flatten_rows, visible_fields, ColumnWindow, GroupNode, LabelMaps, RenderItem, VirtualWindow,
};

use crate::config::GridConfig;
use crate::error::{GridError, ServiceError};
use crate::events::{GridEvent, SubscriptionId, Subscribers};
use crate::fetch::{FetchGenerations, FetchTicket};
use crate::layout::{FlushPlan, LayoutController};
use crate::logging::{log_debug, log_enter, log_error, log_exit, log_info, log_warn};
use crate::service::{DataService, LabelService, QueryFilter, RowQuery, SettingsService};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Result of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { rows: usize },
    /// A newer refresh started while this one was in flight; its response
    /// was dropped.
    Stale,
}

/// Result of a layout flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to write.
    Clean,
    /// Cache written; the view has no remote key.
    CachedOnly,
    /// Cache and settings record written.
    Saved,
    /// Cache written, settings record write failed (logged, not retried).
    RemoteFailed,
}

/// Filtered rows and the group tree built from them.
#[derive(Debug)]
pub struct GroupTree {
    pub revision: u64,
    pub column_order: Vec<String>,
    pub filtered: Vec<Arc<Row>>,
    pub groups: Vec<GroupNode>,
}

/// Rendered slice of the item list plus spacer sizes.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub window: VirtualWindow,
    pub items: Vec<RenderItem>,
}

#[derive(Debug, Clone)]
pub struct ColumnViewport {
    pub window: ColumnWindow,
    /// Field names to instantiate: frozen columns first.
    pub columns: Vec<String>,
}

// ============================================================================
// STATE
// ============================================================================

struct GridState {
    rows: Arc<Vec<Arc<Row>>>,
    fields: Arc<Vec<Field>>,
    search: String,
    group_rules: Vec<GroupRule>,
    empty_last: bool,
    sort: Vec<SortRule>,
    filters: Vec<QueryFilter>,
    /// Resolved linked-record labels, per link field.
    link_labels: LabelMaps,
    collapsed: HashSet<String>,
    /// Bumped whenever anything the group tree depends on changes.
    revision: u64,
}

struct ItemsMemo {
    revision: u64,
    column_order: Vec<String>,
    collapsed: HashSet<String>,
    items: Arc<Vec<RenderItem>>,
}

#[derive(Default)]
struct RenderMemo {
    tree: Option<Arc<GroupTree>>,
    items: Option<ItemsMemo>,
}

/// Clears a cell's saving flag when dropped.
pub(crate) struct SavingGuard<'a> {
    saving: &'a Mutex<HashSet<(RowId, String)>>,
    subscribers: &'a Subscribers,
    key: (RowId, String),
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.saving
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        self.subscribers.emit(&GridEvent::SavingChanged {
            row_id: self.key.0.clone(),
            field: self.key.1.clone(),
            saving: false,
        });
    }
}

// ============================================================================
// GRID VIEW
// ============================================================================

pub struct GridView<D, S, K>
where
    D: DataService + LabelService,
    S: SettingsService,
    K: KeyValueStore,
{
    table: String,
    config: GridConfig,
    data: D,
    settings: S,
    state: Mutex<GridState>,
    layout: Mutex<LayoutController<K>>,
    generations: FetchGenerations,
    saving: Mutex<HashSet<(RowId, String)>>,
    subscribers: Subscribers,
    memo: Mutex<RenderMemo>,
}

impl<D, S, K> GridView<D, S, K>
where
    D: DataService + LabelService,
    S: SettingsService,
    K: KeyValueStore,
{
    pub fn new(
        table: impl Into<String>,
        view_id: &str,
        data: D,
        settings: S,
        store: K,
        config: GridConfig,
    ) -> Self {
        let table = table.into();
        log_info!("GRID", "Creating grid view table={} view={}", table, view_id);

        let cache = LayoutCache::with_namespace(store, config.cache_namespace.clone());
        let layout = LayoutController::new(
            table.clone(),
            view_id,
            cache,
            config.column_widths,
            config.default_row_height,
        );

        GridView {
            state: Mutex::new(GridState {
                rows: Arc::new(Vec::new()),
                fields: Arc::new(Vec::new()),
                search: String::new(),
                group_rules: Vec::new(),
                empty_last: config.empty_last,
                sort: Vec::new(),
                filters: Vec::new(),
                link_labels: LabelMaps::new(),
                collapsed: HashSet::new(),
                revision: 0,
            }),
            layout: Mutex::new(layout),
            generations: FetchGenerations::new(),
            saving: Mutex::new(HashSet::new()),
            subscribers: Subscribers::new(),
            memo: Mutex::new(RenderMemo::default()),
            table,
            config,
            data,
            settings,
        }
    }

    fn state(&self) -> MutexGuard<'_, GridState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn layout(&self) -> MutexGuard<'_, LayoutController<K>> {
        self.layout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn memo(&self) -> MutexGuard<'_, RenderMemo> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: GridEvent) {
        self.subscribers.emit(&event);
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn fields(&self) -> Arc<Vec<Field>> {
        Arc::clone(&self.state().fields)
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.state().fields.iter().find(|f| f.name == name).cloned()
    }

    pub fn rows(&self) -> Arc<Vec<Arc<Row>>> {
        Arc::clone(&self.state().rows)
    }

    pub fn row(&self, id: &RowId) -> Option<Arc<Row>> {
        self.state().rows.iter().find(|r| &r.id == id).cloned()
    }

    pub fn search(&self) -> String {
        self.state().search.clone()
    }

    pub fn group_rules(&self) -> Vec<GroupRule> {
        self.state().group_rules.clone()
    }

    pub fn collapsed(&self) -> HashSet<String> {
        self.state().collapsed.clone()
    }

    pub fn link_label(&self, field: &str, id: &str) -> Option<String> {
        self.state().link_labels.label(field, id).map(str::to_string)
    }

    pub fn layout_state(&self) -> LayoutState {
        self.layout().state().clone()
    }

    pub fn layout_source(&self) -> Option<LayoutSource> {
        self.layout().source()
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout().is_dirty()
    }

    pub fn column_order(&self) -> Vec<String> {
        self.layout().column_order().to_vec()
    }

    /// Non-hidden fields in the layout's column order.
    pub fn visible_fields(&self) -> Vec<Field> {
        let order = self.column_order();
        visible_fields(&self.fields(), &order)
    }

    pub fn is_saving(&self, row_id: &RowId, field: &str) -> bool {
        self.saving
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(row_id.clone(), field.to_string()))
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ========================================================================
    // FETCH
    // ========================================================================

    /// Fetches fields and rows. A response that resolves after a newer
    /// refresh started is dropped and reported as `Stale`.
    pub async fn refresh(&self) -> Result<FetchOutcome, GridError> {
        let ticket = self.generations.issue();
        let query = {
            let state = self.state();
            RowQuery {
                table: self.table.clone(),
                columns: Vec::new(),
                filters: state.filters.clone(),
                order: state.sort.clone(),
            }
        };
        log_enter!("GRID", "refresh", "table={} gen={}", self.table, ticket.generation());

        let fetched: Result<(Vec<Field>, Vec<Row>), ServiceError> = async {
            let fields = self.data.fetch_fields(&self.table).await?;
            let rows = self.data.fetch_rows(&query).await?;
            Ok((fields, rows))
        }
        .await;

        let outcome = self.apply_fetched(ticket, fetched)?;
        if let FetchOutcome::Applied { rows } = outcome {
            self.load_layout().await;
            log_exit!("GRID", "refresh", "rows={}", rows);
        }
        Ok(outcome)
    }

    /// Applies a fetch response if its ticket is still the newest one.
    /// The ticket is checked under the state lock, so two responses can
    /// never both pass the check before either is written.
    fn apply_fetched(
        &self,
        ticket: FetchTicket,
        fetched: Result<(Vec<Field>, Vec<Row>), ServiceError>,
    ) -> Result<FetchOutcome, GridError> {
        let count = {
            let mut state = self.state();
            if !self.generations.is_current(ticket) {
                log_debug!("GRID", "dropping stale response gen={}", ticket.generation());
                return Ok(FetchOutcome::Stale);
            }

            let (fields, rows) = match fetched {
                Ok(data) => data,
                Err(e) => {
                    log_error!("GRID", "refresh failed for {}: {}", self.table, e);
                    return Err(e.into());
                }
            };

            let count = rows.len();
            state.fields = Arc::new(fields);
            state.rows = Arc::new(rows.into_iter().map(Arc::new).collect());
            state.revision += 1;
            count
        };
        self.emit(GridEvent::RowsReplaced { rows: count });
        Ok(FetchOutcome::Applied { rows: count })
    }

    /// Loads the layout once per distinct field set.
    async fn load_layout(&self) {
        let fields = self.fields();
        let view = {
            let layout = self.layout();
            if !layout.needs_load(&fields) {
                return;
            }
            layout.view_key().clone()
        };

        let remote = if view.is_remote() {
            match self.settings.load(view.as_str()).await {
                Ok(record) => record,
                Err(e) => {
                    log_warn!("LAYOUT", "settings load failed for {}: {}", view.as_str(), e);
                    None
                }
            }
        } else {
            None
        };

        let source = self.layout().apply_loaded(remote, &fields);
        log_info!("LAYOUT", "layout for {} loaded from {:?}", view.as_str(), source);
        self.emit(GridEvent::LayoutChanged);
    }

    /// Replaces the server-side filters and refetches.
    pub async fn set_filters(&self, filters: Vec<QueryFilter>) -> Result<FetchOutcome, GridError> {
        self.state().filters = filters;
        self.refresh().await
    }

    /// Replaces the server-side sort and refetches.
    pub async fn set_sort(&self, sort: Vec<SortRule>) -> Result<FetchOutcome, GridError> {
        self.state().sort = sort;
        self.refresh().await
    }

    // ========================================================================
    // VIEW OPTIONS
    // ========================================================================

    pub fn set_search(&self, query: &str) -> bool {
        {
            let mut state = self.state();
            if state.search == query {
                return false;
            }
            state.search = query.to_string();
            state.revision += 1;
        }
        self.emit(GridEvent::SearchChanged {
            query: query.to_string(),
        });
        true
    }

    /// Replaces the group rules. Collapse state refers to path keys of the
    /// old tree, so it is reset.
    pub fn set_group_rules(&self, rules: Vec<GroupRule>) {
        {
            let mut state = self.state();
            state.group_rules = rules;
            state.collapsed.clear();
            state.revision += 1;
        }
        self.emit(GridEvent::GroupingChanged);
    }

    pub fn set_empty_last(&self, empty_last: bool) {
        {
            let mut state = self.state();
            if state.empty_last == empty_last {
                return;
            }
            state.empty_last = empty_last;
            state.revision += 1;
        }
        self.emit(GridEvent::GroupingChanged);
    }

    /// Flips a group's collapse state; returns true when it is now collapsed.
    pub fn toggle_group(&self, key: &str) -> bool {
        let collapsed = {
            let mut state = self.state();
            if state.collapsed.remove(key) {
                false
            } else {
                state.collapsed.insert(key.to_string());
                true
            }
        };
        self.emit(GridEvent::CollapseChanged);
        collapsed
    }

    pub fn set_group_collapsed(&self, key: &str, collapsed: bool) {
        let changed = {
            let mut state = self.state();
            if collapsed {
                state.collapsed.insert(key.to_string())
            } else {
                state.collapsed.remove(key)
            }
        };
        if changed {
            self.emit(GridEvent::CollapseChanged);
        }
    }

    pub fn collapse_all(&self) {
        let keys = all_group_keys(&self.group_tree().groups);
        self.state().collapsed = keys.into_iter().collect();
        self.emit(GridEvent::CollapseChanged);
    }

    pub fn expand_all(&self) {
        self.state().collapsed.clear();
        self.emit(GridEvent::CollapseChanged);
    }

    // ========================================================================
    // PIPELINE
    // ========================================================================

    /// Filtered rows and group tree, rebuilt only when rows, fields, search,
    /// rules, labels or column order changed.
    pub fn group_tree(&self) -> Arc<GroupTree> {
        let column_order = self.column_order();
        let revision = self.state().revision;

        if let Some(tree) = &self.memo().tree {
            if tree.revision == revision && tree.column_order == column_order {
                return Arc::clone(tree);
            }
        }

        let (revision, rows, fields, search, rules, empty_last, link_labels) = {
            let state = self.state();
            (
                state.revision,
                Arc::clone(&state.rows),
                Arc::clone(&state.fields),
                state.search.clone(),
                state.group_rules.clone(),
                state.empty_last,
                state.link_labels.clone(),
            )
        };

        let visible = visible_fields(&fields, &column_order);
        let filtered = filter_rows(&rows, &visible, &search);

        let mut labels = LabelMaps::from_fields(&fields);
        labels.extend_from(&link_labels);
        let options = self.config.group_options(empty_last, labels);
        let groups = build_groups(&filtered, &fields, &rules, &options);

        log_debug!(
            "GRID",
            "group tree rev={} rows={} filtered={} groups={}",
            revision,
            rows.len(),
            filtered.len(),
            groups.len()
        );

        let tree = Arc::new(GroupTree {
            revision,
            column_order,
            filtered,
            groups,
        });
        self.memo().tree = Some(Arc::clone(&tree));
        tree
    }

    /// The flattened item list, memoized on the tree and the collapsed set.
    pub fn render_items(&self) -> Arc<Vec<RenderItem>> {
        let tree = self.group_tree();
        let collapsed = self.collapsed();

        if let Some(memo) = &self.memo().items {
            if memo.revision == tree.revision
                && memo.column_order == tree.column_order
                && memo.collapsed == collapsed
            {
                return Arc::clone(&memo.items);
            }
        }

        let items = if tree.groups.is_empty() {
            flatten_rows(&tree.filtered)
        } else {
            flatten_groups(&tree.groups, &collapsed)
        };
        let items = Arc::new(items);

        self.memo().items = Some(ItemsMemo {
            revision: tree.revision,
            column_order: tree.column_order.clone(),
            collapsed,
            items: Arc::clone(&items),
        });
        items
    }

    /// Rows as displayed (search applied, collapsed groups skipped).
    pub fn visible_rows(&self) -> Vec<Arc<Row>> {
        self.render_items()
            .iter()
            .filter_map(|item| item.row().cloned())
            .collect()
    }

    pub fn window(&self, scroll_top: f64, container_height: f64) -> Viewport {
        let items = self.render_items();
        let model = self.layout().height_model(self.config.group_header_height);
        let window = compute_window(
            items.as_slice(),
            |item| model.height_of(item),
            scroll_top,
            container_height,
            &self.config.window,
        );
        Viewport {
            items: items[window.range()].to_vec(),
            window,
        }
    }

    pub fn column_window(&self, scroll_left: f64, container_width: f64) -> ColumnViewport {
        let names: Vec<String> = self.visible_fields().into_iter().map(|f| f.name).collect();
        let (widths, frozen) = {
            let layout = self.layout();
            (layout.column_widths(&names), layout.state().frozen_columns as usize)
        };
        let window = compute_column_window(
            &widths,
            frozen,
            scroll_left,
            container_width,
            self.config.column_overscan,
        );
        let columns = window.indices().into_iter().map(|i| names[i].clone()).collect();
        ColumnViewport { window, columns }
    }

    // ========================================================================
    // LINKED RECORD LABELS
    // ========================================================================

    /// Looks up labels for link ids that have none yet. Failures are logged
    /// and leave the raw ids in place. Returns the number of labels added.
    pub async fn resolve_link_labels(&self) -> usize {
        let requests: Vec<(String, String, Vec<String>)> = {
            let state = self.state();
            state
                .fields
                .iter()
                .filter(|f| f.field_type == FieldType::Link)
                .filter_map(|f| {
                    let table = f.options.linked_table.clone()?;
                    let mut seen = HashSet::new();
                    let ids: Vec<String> = state
                        .rows
                        .iter()
                        .flat_map(|row| link_ids(row.get(&f.name)))
                        .filter(|id| state.link_labels.label(&f.name, id).is_none())
                        .filter(|id| seen.insert(id.clone()))
                        .collect();
                    if ids.is_empty() {
                        None
                    } else {
                        Some((f.name.clone(), table, ids))
                    }
                })
                .collect()
        };

        let mut added = 0;
        for (field, table, ids) in requests {
            match self.data.resolve_labels(&table, &ids).await {
                Ok(labels) => {
                    let count = labels.len();
                    {
                        let mut state = self.state();
                        state.link_labels.merge(&field, labels);
                        state.revision += 1;
                    }
                    added += count;
                    self.emit(GridEvent::LabelsResolved { field, count });
                }
                Err(e) => {
                    log_warn!("GRID", "label lookup for {} in {} failed: {}", field, table, e);
                }
            }
        }
        added
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Marks a cell as saving. Fails when it already is.
    pub(crate) fn begin_saving(&self, row_id: &RowId, field: &str) -> Result<SavingGuard<'_>, GridError> {
        let key = (row_id.clone(), field.to_string());
        {
            let mut saving = self.saving.lock().unwrap_or_else(PoisonError::into_inner);
            if !saving.insert(key.clone()) {
                return Err(GridError::CellBusy {
                    row: row_id.clone(),
                    field: field.to_string(),
                });
            }
        }
        self.emit(GridEvent::SavingChanged {
            row_id: row_id.clone(),
            field: field.to_string(),
            saving: true,
        });
        Ok(SavingGuard {
            saving: &self.saving,
            subscribers: &self.subscribers,
            key,
        })
    }

    /// Current value of a cell; `None` when the row is not loaded.
    pub fn cell_value(&self, row_id: &RowId, field: &str) -> Option<CellValue> {
        self.state()
            .rows
            .iter()
            .find(|r| &r.id == row_id)
            .map(|r| r.get(field).clone())
    }

    /// Swaps one row for `f(row)`; returns the old row.
    fn swap_row(&self, row_id: &RowId, f: impl FnOnce(&Arc<Row>) -> Arc<Row>) -> Option<Arc<Row>> {
        let old = {
            let mut state = self.state();
            let idx = state.rows.iter().position(|r| &r.id == row_id)?;
            let old = Arc::clone(&state.rows[idx]);
            let mut rows: Vec<Arc<Row>> = state.rows.to_vec();
            rows[idx] = f(&old);
            state.rows = Arc::new(rows);
            state.revision += 1;
            old
        };
        self.emit(GridEvent::RowUpdated {
            row_id: row_id.clone(),
        });
        Some(old)
    }

    /// Installs the server's copy of a row. Rows no longer loaded are left
    /// out.
    pub(crate) fn accept_server_row(&self, row: Row) -> Arc<Row> {
        let row = Arc::new(row);
        self.swap_row(&row.id, |_| Arc::clone(&row));
        row
    }

    /// Optimistic single-cell write: applied locally first, replaced by the
    /// server row on success, reverted on failure.
    pub async fn update_cell(
        &self,
        row_id: &RowId,
        field_name: &str,
        value: CellValue,
    ) -> Result<Arc<Row>, GridError> {
        let field = self
            .field(field_name)
            .ok_or_else(|| GridError::UnknownField(field_name.to_string()))?;
        if field.field_type.is_read_only() {
            return Err(ValidationError::ReadOnly(field.name).into());
        }

        let _saving = self.begin_saving(row_id, &field.name)?;

        let previous = self
            .swap_row(row_id, |row| Arc::new(row.patched(&field.name, value.clone())))
            .ok_or_else(|| GridError::UnknownRow(row_id.clone()))?
            .get(&field.name)
            .clone();

        log_enter!("EDIT", "update_cell", "row={} field={}", row_id, field.name);
        match self
            .data
            .update_cell(&self.table, row_id, &field.name, &value)
            .await
        {
            Ok(server_row) => {
                log_exit!("EDIT", "update_cell", "ok");
                Ok(self.accept_server_row(server_row))
            }
            Err(e) => {
                log_error!("EDIT", "write {}/{} failed, reverting: {}", row_id, field.name, e);
                // Only revert if nothing else replaced the value meanwhile.
                let current = self.cell_value(row_id, &field.name);
                if current.as_ref() == Some(&value) {
                    self.swap_row(row_id, |row| Arc::new(row.patched(&field.name, previous)));
                }
                Err(e.into())
            }
        }
    }

    /// Coerces typed text for the field, then writes it.
    pub async fn edit_cell(&self, row_id: &RowId, field_name: &str, input: &str) -> Result<Arc<Row>, GridError> {
        let field = self
            .field(field_name)
            .ok_or_else(|| GridError::UnknownField(field_name.to_string()))?;
        let value = coerce_input(&field, input)?;
        self.update_cell(row_id, field_name, value).await
    }

    /// Creates a row remotely, then refetches.
    pub async fn insert_row(&self, values: Vec<(String, CellValue)>) -> Result<Row, GridError> {
        let row = self.data.insert_row(&self.table, values).await?;
        log_info!("EDIT", "inserted row {} into {}", row.id, self.table);
        self.refresh().await?;
        Ok(row)
    }

    /// Deletes a row remotely, then refetches.
    pub async fn delete_row(&self, row_id: &RowId) -> Result<(), GridError> {
        self.data.delete_row(&self.table, row_id).await?;
        log_info!("EDIT", "deleted row {} from {}", row_id, self.table);
        self.refresh().await?;
        Ok(())
    }

    // ========================================================================
    // LAYOUT
    // ========================================================================

    fn change_layout(&self, f: impl FnOnce(&mut LayoutController<K>) -> bool) -> bool {
        let changed = f(&mut self.layout());
        if changed {
            self.emit(GridEvent::LayoutChanged);
        }
        changed
    }

    pub fn resize_column(&self, field: &str, width: f64) -> bool {
        self.change_layout(|l| l.resize_column(field, width))
    }

    pub fn move_column(&self, from: usize, to: usize) -> bool {
        self.change_layout(|l| l.move_column(from, to))
    }

    pub fn move_column_named(&self, field: &str, to: usize) -> bool {
        self.change_layout(|l| l.move_column_named(field, to))
    }

    /// Returns the new wrap flag.
    pub fn toggle_wrap(&self, field: &str) -> bool {
        let wrap = self.layout().toggle_wrap(field);
        self.emit(GridEvent::LayoutChanged);
        wrap
    }

    pub fn set_row_height(&self, row_id: &RowId, height: Option<f64>) -> bool {
        self.change_layout(|l| l.set_row_height(row_id, height))
    }

    pub fn set_row_height_preset(&self, preset: RowHeightPreset) -> bool {
        self.change_layout(|l| l.set_row_height_preset(preset))
    }

    pub fn set_frozen_columns(&self, count: u32) -> bool {
        self.change_layout(|l| l.set_frozen_columns(count))
    }

    /// Writes the layout if it changed since the last flush. The cache is
    /// always mirrored; the settings record only for views with a remote
    /// key. Remote failures are logged; local state is kept.
    pub async fn flush_layout(&self) -> FlushOutcome {
        let plan = self.layout().take_flush();
        match plan {
            FlushPlan::Clean => FlushOutcome::Clean,
            FlushPlan::LocalOnly => {
                log_debug!("LAYOUT", "layout cached (local-only view)");
                FlushOutcome::CachedOnly
            }
            FlushPlan::Remote(record) => match self.settings.upsert(&record).await {
                Ok(()) => {
                    log_debug!("LAYOUT", "settings saved for {}", record.view_id);
                    FlushOutcome::Saved
                }
                Err(e) => {
                    log_warn!("LAYOUT", "settings save failed for {}: {}", record.view_id, e);
                    FlushOutcome::RemoteFailed
                }
            },
        }
    }
}

/// Linked record ids in a link cell.
fn link_ids(value: &CellValue) -> Vec<String> {
    fn id_of(item: &CellValue) -> Option<String> {
        match item {
            CellValue::Record(_) => item.record_key(),
            other => {
                let text = other.plain_text();
                if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }

    match value {
        CellValue::List(items) => items.iter().filter_map(id_of).collect(),
        CellValue::Empty => Vec::new(),
        other => id_of(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use engine::FieldType;
    use persistence::MemoryStore;

    use crate::memory::{MemoryDataService, MemorySettingsService};

    fn empty_grid() -> GridView<MemoryDataService, MemorySettingsService, MemoryStore> {
        GridView::new(
            "tasks",
            "Grid view",
            MemoryDataService::new(),
            MemorySettingsService::new(),
            MemoryStore::new(),
            GridConfig::default(),
        )
    }

    fn response(names: &[&str]) -> Result<(Vec<Field>, Vec<Row>), ServiceError> {
        let rows = names
            .iter()
            .enumerate()
            .map(|(i, name)| Row::new(i as i64 + 1).with("Name", *name))
            .collect();
        Ok((vec![Field::new("f1", "Name", FieldType::Text)], rows))
    }

    #[test]
    fn test_older_response_never_overwrites_newer() {
        let grid = empty_grid();
        let older = grid.generations.issue();
        let newer = grid.generations.issue();

        // The newer response is applied first; the older one resolves after.
        assert_eq!(
            grid.apply_fetched(newer, response(&["new"])).unwrap(),
            FetchOutcome::Applied { rows: 1 }
        );
        assert_eq!(
            grid.apply_fetched(older, response(&["old", "old"])).unwrap(),
            FetchOutcome::Stale
        );

        let rows = grid.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), &CellValue::text("new"));
    }

    #[test]
    fn test_stale_error_is_dropped() {
        let grid = empty_grid();
        let older = grid.generations.issue();
        let _newer = grid.generations.issue();

        let failed = Err(ServiceError::Request("offline".to_string()));
        assert_eq!(grid.apply_fetched(older, failed).unwrap(), FetchOutcome::Stale);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_keep_newest() {
        let grid = Arc::new(empty_grid());
        grid.data.push_row("tasks", Row::new(1).with("Name", "seed"));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let grid = Arc::clone(&grid);
            handles.push(tokio::spawn(async move { grid.refresh().await }));
        }
        let mut applied = 0;
        for handle in handles {
            if let Ok(FetchOutcome::Applied { .. }) = handle.await.unwrap() {
                applied += 1;
            }
        }

        assert!(applied >= 1);
        assert_eq!(grid.rows().len(), 1);
    }

    #[test]
    fn test_link_ids() {
        let mut record = BTreeMap::new();
        record.insert("id".to_string(), CellValue::text("rec1"));

        let value = CellValue::List(vec![
            CellValue::Record(record),
            CellValue::text("rec2"),
            CellValue::text(" "),
        ]);
        assert_eq!(link_ids(&value), vec!["rec1", "rec2"]);
        assert_eq!(link_ids(&CellValue::text("rec3")), vec!["rec3"]);
        assert!(link_ids(&CellValue::Empty).is_empty());
    }
}
