//! High-level pipeline API: bytes in, transformed bytes + outcome out.
//!
//! Combines the three stages: parse (row source), column transform
//! (executor), serialize (row sink). One invocation owns its dataset
//! for the whole run; nothing is shared across invocations.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellforge::{transform_bytes, BuiltinTransform, TransformOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = b"sku;barcode\nA-1;4006381333931\n";
//!     let result = transform_bytes(
//!         input,
//!         "barcode",
//!         &BuiltinTransform::Reverse,
//!         TransformOptions::default(),
//!     ).await?;
//!
//!     println!("{}", result.outcome.summary());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::PipelineResult;
use crate::models::TransformOutcome;
use crate::reader::{parse_bytes, ParseOptions, ParseResult};
use crate::writer::write_rows;

use super::cell::CellTransform;
use super::executor::{apply_to_column, ExecuteOptions};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Force the delimiter instead of detecting it.
    pub delimiter: Option<char>,

    /// Type the designated cell (number, boolean) before handing it to
    /// the transform. Every other cell, and the designated cell of
    /// skipped or failed rows, keeps its text exactly as read.
    pub infer_types: bool,

    /// Max in-flight cell transforms (1 = sequential).
    pub concurrency: usize,

    /// Cancels the run between rows.
    pub cancel: Option<CancellationToken>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            infer_types: true,
            concurrency: 1,
            cancel: None,
        }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Serialized output, same format as the input.
    pub output: Vec<u8>,

    /// Transformed rows (same length and order as the input).
    pub rows: Vec<Value>,

    /// Per-run accounting: successes, skips, per-row failures.
    pub outcome: TransformOutcome,

    /// Input parsing metadata.
    pub csv_info: CsvInfo,
}

/// Input file information.
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Transform one column of a delimited byte buffer.
///
/// This is the main entry point. It:
/// 1. Parses the input with encoding/delimiter detection
/// 2. Applies the cell transform to the designated column of every row
/// 3. Serializes the rows back out in the original order
///
/// Per-cell failures are reported in [`PipelineOutput::outcome`]; only
/// unparseable input, unserializable output, or cancellation fail the
/// whole run.
pub async fn transform_bytes(
    bytes: &[u8],
    column: &str,
    transform: &dyn CellTransform,
    options: TransformOptions,
) -> PipelineResult<PipelineOutput> {
    log_info("Reading input...");
    // Rows keep their raw field text so untouched columns serialize
    // byte-identically; the executor types the transform input itself.
    let parsed = parse_bytes(
        bytes,
        &ParseOptions {
            delimiter: options.delimiter,
            infer_types: false,
        },
    )?;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "Detected delimiter: '{}'",
        format_delimiter(parsed.delimiter)
    ));
    log_success(format!("Read {} rows", parsed.rows.len()));

    let csv_info = CsvInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter,
        headers: parsed.headers.clone(),
        row_count: parsed.rows.len(),
    };

    if parsed.rows.is_empty() {
        log_warning("No data rows; output is header-only");
    }

    log_info(format!(
        "Applying '{}' to column '{}'...",
        transform.name(),
        column
    ));
    let ParseResult {
        rows,
        headers,
        delimiter,
        ..
    } = parsed;

    let exec_options = ExecuteOptions {
        concurrency: options.concurrency,
        cancel: options.cancel.clone(),
        infer_types: options.infer_types,
    };
    let result = apply_to_column(rows, column, transform, &exec_options).await?;
    report_outcome(&result.outcome);

    log_info("Serializing output...");
    let output = write_rows(&result.rows, &headers, delimiter)?;
    log_success(format!("Output: {} bytes", output.len()));

    Ok(PipelineOutput {
        output,
        rows: result.rows,
        outcome: result.outcome,
        csv_info,
    })
}

/// Transform one column of a file on disk.
///
/// Same as [`transform_bytes`] but reads the input from `path`.
pub async fn transform_file(
    path: &Path,
    column: &str,
    transform: &dyn CellTransform,
    options: TransformOptions,
) -> PipelineResult<PipelineOutput> {
    let bytes = tokio::fs::read(path).await?;
    transform_bytes(&bytes, column, transform, options).await
}

fn report_outcome(outcome: &TransformOutcome) {
    log_success(format!("Transformed {} cells", outcome.success_count));
    if outcome.skipped_count > 0 {
        log_info(format!(
            "{} rows passed through (empty designated cell)",
            outcome.skipped_count
        ));
    }
    if !outcome.failures.is_empty() {
        log_warning(format!(
            "{} cells failed to transform (originals kept)",
            outcome.failures.len()
        ));
        for failure in outcome.failures.iter().take(3) {
            log_error(format!("Row {}: {}", failure.row, failure.message));
        }
    }
}

/// Format delimiter for display.
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
