//! Column executor: the per-row transform loop.
//!
//! Applies one [`CellTransform`] to the designated column of every
//! row. Ordering and length are preserved, rows with an empty or
//! missing designated cell pass through untouched, and a transform
//! failure keeps the original cell and is recorded in the outcome
//! instead of aborting (fail-soft).
//!
//! Rows are processed sequentially by default. With `concurrency > 1`
//! up to K transforms are in flight at once through an ordered
//! buffered stream, so results join back in input order and the
//! outcome is aggregated in a single pass after the join.

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{CellError, PipelineError, PipelineResult};
use crate::models::{cell_is_empty, infer_cell, RowFailure, TransformOutcome};

use super::cell::CellTransform;

/// Execution knobs for one run.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Max in-flight cell transforms. 0 and 1 both mean sequential.
    pub concurrency: usize,
    /// Checked between rows; cancelling discards partial results.
    pub cancel: Option<CancellationToken>,
    /// Type the designated cell (number, boolean) before handing it to
    /// the transform. Only the transform input is typed: skipped and
    /// failed rows keep the cell text exactly as parsed.
    pub infer_types: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            cancel: None,
            infer_types: true,
        }
    }
}

/// Transformed rows plus the per-run outcome.
#[derive(Debug)]
pub struct ColumnTransformResult {
    pub rows: Vec<Value>,
    pub outcome: TransformOutcome,
}

/// Per-row result, joined back in input order before aggregation.
enum Step {
    Transformed(Value),
    Skipped(Value),
    Failed { row: Value, error: CellError },
}

/// Apply `transform` to `column` of every row.
///
/// Returns rows of equal length and order. Fatal only on
/// cancellation; per-cell failures land in the outcome.
pub async fn apply_to_column(
    rows: Vec<Value>,
    column: &str,
    transform: &dyn CellTransform,
    options: &ExecuteOptions,
) -> PipelineResult<ColumnTransformResult> {
    let steps = if options.concurrency > 1 {
        run_concurrent(rows, column, transform, options).await?
    } else {
        run_sequential(rows, column, transform, options).await?
    };

    // Single aggregation pass; no shared counters during the run.
    let mut out_rows = Vec::with_capacity(steps.len());
    let mut outcome = TransformOutcome::new();

    for (idx, step) in steps.into_iter().enumerate() {
        match step {
            Step::Transformed(row) => {
                outcome.success_count += 1;
                out_rows.push(row);
            }
            Step::Skipped(row) => {
                outcome.skipped_count += 1;
                out_rows.push(row);
            }
            Step::Failed { row, error } => {
                outcome.failures.push(RowFailure {
                    row: idx,
                    column: column.to_string(),
                    message: error.message,
                });
                out_rows.push(row);
            }
        }
    }

    Ok(ColumnTransformResult {
        rows: out_rows,
        outcome,
    })
}

async fn run_sequential(
    rows: Vec<Value>,
    column: &str,
    transform: &dyn CellTransform,
    options: &ExecuteOptions,
) -> PipelineResult<Vec<Step>> {
    let mut steps = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        check_cancelled(options, idx)?;
        steps.push(transform_row(row, column, transform, options.infer_types).await);
    }

    Ok(steps)
}

async fn run_concurrent(
    rows: Vec<Value>,
    column: &str,
    transform: &dyn CellTransform,
    options: &ExecuteOptions,
) -> PipelineResult<Vec<Step>> {
    // `buffered` (not `buffer_unordered`) keeps completion in input order.
    let mut in_flight = stream::iter(rows.into_iter())
        .map(|row| transform_row(row, column, transform, options.infer_types))
        .buffered(options.concurrency);

    let mut steps = Vec::new();
    while let Some(step) = in_flight.next().await {
        check_cancelled(options, steps.len())?;
        steps.push(step);
    }

    Ok(steps)
}

fn check_cancelled(options: &ExecuteOptions, rows_done: usize) -> PipelineResult<()> {
    if let Some(token) = &options.cancel {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled { rows_done });
        }
    }
    Ok(())
}

/// Transform a single row. Never fails: failures are carried in the step.
async fn transform_row(
    mut row: Value,
    column: &str,
    transform: &dyn CellTransform,
    infer: bool,
) -> Step {
    let obj = match row.as_object_mut() {
        Some(obj) => obj,
        // Cannot come out of the reader; pass through untouched.
        None => return Step::Skipped(row),
    };

    let current = match obj.get(column) {
        Some(cell) if !cell_is_empty(cell) => {
            if infer {
                typed_cell(cell)
            } else {
                cell.clone()
            }
        }
        _ => return Step::Skipped(row),
    };

    match transform.apply(current).await {
        Ok(transformed) => {
            obj.insert(column.to_string(), transformed);
            Step::Transformed(row)
        }
        Err(error) => Step::Failed { row, error },
    }
}

/// Typed view of a text cell for the transform input.
fn typed_cell(cell: &Value) -> Value {
    match cell {
        Value::String(s) => infer_cell(s),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::cell::{BuiltinTransform, FnTransform};
    use serde_json::json;
    use std::time::Duration;

    fn barcode_rows() -> Vec<Value> {
        vec![
            json!({"A": "x", "B": "1234"}),
            json!({"A": "y", "B": ""}),
        ]
    }

    #[tokio::test]
    async fn test_reverse_scenario() {
        let result = apply_to_column(
            barcode_rows(),
            "B",
            &BuiltinTransform::Reverse,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0], json!({"A": "x", "B": "4321"}));
        assert_eq!(result.rows[1], json!({"A": "y", "B": ""}));
        assert_eq!(result.outcome.success_count, 1);
        assert_eq!(result.outcome.skipped_count, 1);
        assert!(result.outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_always_failing_transform() {
        let result = apply_to_column(
            barcode_rows(),
            "B",
            &BuiltinTransform::Fail,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        // Rows unchanged, one failure per non-empty designated cell.
        assert_eq!(result.rows, barcode_rows());
        assert_eq!(result.outcome.success_count, 0);
        assert_eq!(result.outcome.failures.len(), 1);
        assert_eq!(result.outcome.failures[0].row, 0);
        assert_eq!(result.outcome.failures[0].column, "B");
    }

    #[tokio::test]
    async fn test_empty_dataset() {
        let result = apply_to_column(
            vec![],
            "B",
            &BuiltinTransform::Reverse,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(result.outcome.success_count, 0);
        assert!(result.outcome.is_clean());
    }

    #[tokio::test]
    async fn test_missing_column_is_skipped() {
        let rows = vec![json!({"A": "only"})];
        let result = apply_to_column(
            rows.clone(),
            "B",
            &BuiltinTransform::Reverse,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.rows, rows);
        assert_eq!(result.outcome.skipped_count, 1);
    }

    #[tokio::test]
    async fn test_other_columns_untouched() {
        let rows = vec![json!({"id": 7, "flag": true, "B": "ab", "note": "keep"})];
        let result = apply_to_column(
            rows,
            "B",
            &BuiltinTransform::Uppercase,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            result.rows[0],
            json!({"id": 7, "flag": true, "B": "AB", "note": "keep"})
        );
    }

    #[tokio::test]
    async fn test_concurrent_preserves_order() {
        // Later rows finish first; output must still be in input order.
        let rows: Vec<Value> = (0..8).map(|i| json!({"B": format!("v{}", i)})).collect();

        let transform = FnTransform::new_async("tagged", |value| async move {
            let text = value.as_str().unwrap().to_string();
            let n: u64 = text[1..].parse().unwrap();
            tokio::time::sleep(Duration::from_millis((8 - n) * 5)).await;
            Ok(json!(format!("{}!", text)))
        });

        let options = ExecuteOptions {
            concurrency: 4,
            ..Default::default()
        };
        let result = apply_to_column(rows, "B", &transform, &options)
            .await
            .unwrap();

        for (i, row) in result.rows.iter().enumerate() {
            assert_eq!(row["B"], json!(format!("v{}!", i)));
        }
        assert_eq!(result.outcome.success_count, 8);
    }

    #[tokio::test]
    async fn test_concurrent_failures_indexed_by_input_order() {
        // Fail on even-numbered values only.
        let rows: Vec<Value> = (0..6).map(|i| json!({"B": format!("{}", i)})).collect();
        let transform = FnTransform::new("evens-fail", |value| {
            // Cells arrive typed, so digit strings come in as numbers.
            let n = value.as_u64().unwrap_or(1);
            if n % 2 == 0 {
                Err(CellError::new(format!("even value {}", n)))
            } else {
                Ok(value)
            }
        });

        let options = ExecuteOptions {
            concurrency: 3,
            ..Default::default()
        };
        let result = apply_to_column(rows, "B", &transform, &options)
            .await
            .unwrap();

        let failed_rows: Vec<usize> = result.outcome.failures.iter().map(|f| f.row).collect();
        assert_eq!(failed_rows, vec![0, 2, 4]);
        assert_eq!(result.outcome.success_count, 3);
    }

    #[tokio::test]
    async fn test_failed_row_keeps_raw_cell_text() {
        // Inference types the transform input only; a failure must not
        // leave the re-rendered form ("1.5") in place of the original.
        let rows = vec![json!({"B": "1.50"})];
        let result = apply_to_column(
            rows,
            "B",
            &BuiltinTransform::Fail,
            &ExecuteOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.rows[0]["B"], json!("1.50"));
        assert_eq!(result.outcome.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_transform_sees_typed_cell() {
        let rows = vec![json!({"B": "42"})];
        let transform = FnTransform::new("typecheck", |value| {
            assert!(value.is_number());
            Ok(json!(value.as_u64().unwrap() + 1))
        });

        let result = apply_to_column(rows, "B", &transform, &ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.rows[0]["B"], json!(43));
    }

    #[tokio::test]
    async fn test_cancellation_discards_run() {
        let token = CancellationToken::new();
        token.cancel();

        let options = ExecuteOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let err = apply_to_column(
            barcode_rows(),
            "B",
            &BuiltinTransform::Reverse,
            &options,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { rows_done: 0 }));
    }

    #[tokio::test]
    async fn test_cancellation_in_concurrent_mode() {
        let token = CancellationToken::new();
        token.cancel();

        let rows: Vec<Value> = (0..16).map(|i| json!({"B": format!("v{}", i)})).collect();
        let options = ExecuteOptions {
            concurrency: 4,
            cancel: Some(token),
            ..Default::default()
        };
        let err = apply_to_column(rows, "B", &BuiltinTransform::Reverse, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }
}
