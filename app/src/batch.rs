//! FILENAME: app/src/batch.rs
// PURPOSE: Multi-cell writes: paste, fill and bulk edit.
// CONTEXT: A batch is planned first (coercion, read-only checks, no-op
// skipping), then applied one cell at a time through the data service.
// The remote database has no multi-row transaction, so all-or-nothing mode
// compensates applied writes from an `engine::Transaction`.

use std::ops::Range;
use std::sync::Arc;

use engine::{coerce_input, CellChange, CellValue, Field, Row, RowId, Transaction, ValidationError};
use persistence::KeyValueStore;
use serde::Serialize;

use crate::clipboard::parse_tsv;
use crate::error::GridError;
use crate::events::GridEvent;
use crate::grid::GridView;
use crate::logging::{log_enter_info, log_error, log_exit_info, log_warn};
use crate::service::{DataService, LabelService, SettingsService};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BatchMode {
    /// Apply every valid cell; report the rest.
    #[default]
    BestEffort,
    /// Apply nothing unless every cell is valid; undo applied cells on the
    /// first remote failure.
    AllOrNothing,
}

/// One cell to write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub row_id: RowId,
    pub field: String,
    pub value: CellValue,
}

/// One cell that was not written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellFailure {
    pub row_id: RowId,
    pub field: String,
    pub message: String,
}

impl CellFailure {
    pub fn new(row_id: RowId, field: impl Into<String>, message: impl Into<String>) -> Self {
        CellFailure {
            row_id,
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchPlan {
    pub description: String,
    pub writes: Vec<PlannedWrite>,
    /// Cells rejected during planning (validation errors).
    pub failures: Vec<CellFailure>,
}

impl BatchPlan {
    fn new(description: impl Into<String>) -> Self {
        BatchPlan {
            description: description.into(),
            ..BatchPlan::default()
        }
    }

    fn push(&mut self, row: &Row, field: &Field, result: Result<CellValue, ValidationError>) {
        match result {
            Ok(value) if row.get(&field.name) == &value => {}
            Ok(value) => self.writes.push(PlannedWrite {
                row_id: row.id.clone(),
                field: field.name.clone(),
                value,
            }),
            Err(e) => self
                .failures
                .push(CellFailure::new(row.id.clone(), field.name.clone(), e.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchReport {
    /// Cells whose new value is in place at the end of the batch.
    pub applied: usize,
    pub failures: Vec<CellFailure>,
    /// An all-or-nothing batch hit a failure and compensated.
    pub rolled_back: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// PLANNING
// ============================================================================

/// Maps a parsed clipboard grid onto rows x fields from an anchor cell.
/// Cells falling outside the rows or fields are dropped.
pub fn plan_paste(
    grid: &[Vec<String>],
    rows: &[Arc<Row>],
    fields: &[Field],
    anchor_row: usize,
    anchor_col: usize,
) -> BatchPlan {
    let cells: usize = grid.iter().map(Vec::len).sum();
    let mut plan = BatchPlan::new(format!("Paste {} cells", cells));

    for (dr, line) in grid.iter().enumerate() {
        let Some(row) = rows.get(anchor_row + dr) else {
            break;
        };
        for (dc, text) in line.iter().enumerate() {
            let Some(field) = fields.get(anchor_col + dc) else {
                break;
            };
            plan.push(row, field, coerce_input(field, text));
        }
    }
    plan
}

/// Copies the source row's value of `field` into each target row.
pub fn plan_fill(source: &Row, targets: &[Arc<Row>], field: &Field) -> BatchPlan {
    let mut plan = BatchPlan::new(format!("Fill {} cells", targets.len()));
    let value = source.get(&field.name).clone();

    for row in targets {
        let result = if field.field_type.is_read_only() {
            Err(ValidationError::ReadOnly(field.name.clone()))
        } else {
            Ok(value.clone())
        };
        plan.push(row, field, result);
    }
    plan
}

/// Writes one typed value to every target row.
pub fn plan_bulk_edit(targets: &[Arc<Row>], field: &Field, input: &str) -> BatchPlan {
    let mut plan = BatchPlan::new(format!("Edit {} cells", targets.len()));
    let value = coerce_input(field, input);
    for row in targets {
        plan.push(row, field, value.clone());
    }
    plan
}

// ============================================================================
// APPLYING
// ============================================================================

impl<D, S, K> GridView<D, S, K>
where
    D: DataService + LabelService,
    S: SettingsService,
    K: KeyValueStore,
{
    /// Pastes TSV text with its top-left cell at (`anchor_row`,
    /// `anchor_col`) in displayed coordinates.
    pub async fn paste(
        &self,
        anchor_row: usize,
        anchor_col: usize,
        text: &str,
        mode: BatchMode,
    ) -> BatchReport {
        let grid = parse_tsv(text);
        let plan = plan_paste(
            &grid,
            &self.visible_rows(),
            &self.visible_fields(),
            anchor_row,
            anchor_col,
        );
        self.apply_plan(plan, mode).await
    }

    /// Copies the displayed cell at (`source_row`, `field`) down over the
    /// displayed rows in `targets`.
    pub async fn fill(
        &self,
        field: &str,
        source_row: usize,
        targets: Range<usize>,
        mode: BatchMode,
    ) -> Result<BatchReport, GridError> {
        let field = self
            .field(field)
            .ok_or_else(|| GridError::UnknownField(field.to_string()))?;
        let rows = self.visible_rows();
        let source = rows
            .get(source_row)
            .cloned()
            .ok_or_else(|| GridError::UnknownRow(RowId::new(format!("#{}", source_row))))?;

        let end = targets.end.min(rows.len());
        let start = targets.start.min(end);
        let targets: Vec<Arc<Row>> = rows[start..end]
            .iter()
            .filter(|r| r.id != source.id)
            .cloned()
            .collect();

        let plan = plan_fill(&source, &targets, &field);
        Ok(self.apply_plan(plan, mode).await)
    }

    /// Sets one typed value on every listed row. Rows that are not loaded
    /// are reported as failures.
    pub async fn bulk_edit(
        &self,
        row_ids: &[RowId],
        field: &str,
        input: &str,
        mode: BatchMode,
    ) -> Result<BatchReport, GridError> {
        let field = self
            .field(field)
            .ok_or_else(|| GridError::UnknownField(field.to_string()))?;

        let mut targets = Vec::with_capacity(row_ids.len());
        let mut missing = Vec::new();
        for id in row_ids {
            match self.row(id) {
                Some(row) => targets.push(row),
                None => missing.push(CellFailure::new(
                    id.clone(),
                    field.name.clone(),
                    GridError::UnknownRow(id.clone()).to_string(),
                )),
            }
        }

        let mut plan = plan_bulk_edit(&targets, &field, input);
        plan.failures.extend(missing);
        Ok(self.apply_plan(plan, mode).await)
    }

    /// Applies a planned batch.
    pub async fn apply_plan(&self, plan: BatchPlan, mode: BatchMode) -> BatchReport {
        log_enter_info!(
            "BATCH",
            "apply_plan",
            "{} writes={} invalid={} mode={:?}",
            plan.description,
            plan.writes.len(),
            plan.failures.len(),
            mode
        );

        let mut report = BatchReport {
            failures: plan.failures,
            ..BatchReport::default()
        };

        if mode == BatchMode::AllOrNothing && !report.failures.is_empty() {
            log_warn!("BATCH", "{}: {} invalid cells, nothing applied", plan.description, report.failures.len());
            self.emit(GridEvent::BatchApplied {
                applied: 0,
                failed: report.failures.len(),
            });
            return report;
        }

        let mut txn = Transaction::new(plan.description);
        for write in &plan.writes {
            match self.write_cell(write).await {
                Ok(change) => {
                    txn.add_change(change);
                    report.applied += 1;
                }
                Err(e) => {
                    report
                        .failures
                        .push(CellFailure::new(write.row_id.clone(), write.field.clone(), e.to_string()));
                    if mode == BatchMode::AllOrNothing {
                        report.applied = self.compensate(&txn, &mut report.failures).await;
                        report.rolled_back = true;
                        break;
                    }
                }
            }
        }

        self.emit(GridEvent::BatchApplied {
            applied: report.applied,
            failed: report.failures.len(),
        });
        log_exit_info!(
            "BATCH",
            "apply_plan",
            "{} applied={} failed={} rolled_back={}",
            txn.description,
            report.applied,
            report.failures.len(),
            report.rolled_back
        );
        report
    }

    /// Writes one cell and returns the change it made.
    async fn write_cell(&self, write: &PlannedWrite) -> Result<CellChange, GridError> {
        let _saving = self.begin_saving(&write.row_id, &write.field)?;
        let previous = self
            .cell_value(&write.row_id, &write.field)
            .ok_or_else(|| GridError::UnknownRow(write.row_id.clone()))?;

        let row = self
            .data()
            .update_cell(self.table(), &write.row_id, &write.field, &write.value)
            .await?;
        self.accept_server_row(row);

        Ok(CellChange::new(
            write.row_id.clone(),
            write.field.clone(),
            previous,
            write.value.clone(),
        ))
    }

    /// Writes previous values back, newest first. Returns how many applied
    /// changes could not be undone.
    async fn compensate(&self, txn: &Transaction, failures: &mut Vec<CellFailure>) -> usize {
        let mut stuck = 0;
        for change in txn.compensation() {
            match self
                .data()
                .update_cell(self.table(), &change.row_id, &change.field, &change.next)
                .await
            {
                Ok(row) => {
                    self.accept_server_row(row);
                }
                Err(e) => {
                    log_error!("BATCH", "rollback of {}/{} failed: {}", change.row_id, change.field, e);
                    failures.push(CellFailure::new(
                        change.row_id.clone(),
                        change.field.clone(),
                        format!("rollback failed: {}", e),
                    ));
                    stuck += 1;
                }
            }
        }
        stuck
    }
}
