//! Error types for the cellforge pipeline.
//!
//! The hierarchy mirrors the pipeline stages:
//!
//! - [`FormatError`] - input bytes could not be parsed into rows
//! - [`CellError`] - a single cell transform failed (non-fatal, accumulated)
//! - [`SinkError`] - transformed rows could not be serialized
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! `FormatError` and `SinkError` abort a run. `CellError` never does:
//! it is recorded per row in the outcome and the row passes through
//! unchanged. Conversion is automatic via `From` implementations so
//! `?` works across stage boundaries.

use thiserror::Error;

// =============================================================================
// Input Parsing Errors (fatal)
// =============================================================================

/// Errors while turning input bytes into rows.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Failed to read the input.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Input is empty.
    #[error("Input file is empty")]
    EmptyInput,

    /// Input is not valid CSV (unbalanced quoting, bad record).
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Header line is blank or yields no columns.
    #[error("No column headers found")]
    NoHeaders,

    /// Input looks like binary data, not a delimited text file.
    #[error("Input contains binary data (NUL byte at offset {0})")]
    BinaryData(usize),

    /// Input could not be decoded with the detected encoding.
    #[error("Failed to decode input as {encoding}: {message}")]
    Decode { encoding: String, message: String },
}

// =============================================================================
// Cell Transform Errors (non-fatal, accumulated per row)
// =============================================================================

/// A single cell transform failure.
///
/// Returned by [`crate::transform::CellTransform::apply`]. Never aborts
/// the run; the executor records it against the row index.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CellError {
    pub message: String,
}

impl CellError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Output Serialization Errors (fatal)
// =============================================================================

/// Errors while serializing rows back to bytes.
#[derive(Debug, Error)]
pub enum SinkError {
    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Output buffer could not be recovered from the writer.
    #[error("Failed to finalize output buffer: {0}")]
    Finalize(String),

    /// A row cannot be reconciled with the output schema.
    #[error("Row {row} cannot be serialized: {message}")]
    BadRow { row: usize, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by
/// [`crate::transform::pipeline::transform_bytes`]. Either the input
/// could not be parsed, the output could not be produced, or the run
/// was cancelled; per-cell failures are reported in the outcome, not
/// here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input parsing error.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Output serialization error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// IO error outside parse/serialize (e.g. reading the input file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled between rows; partial results discarded.
    #[error("Run cancelled after {rows_done} rows")]
    Cancelled { rows_done: usize },

    /// The requested transform name is not registered.
    #[error("Unknown transform: {0}")]
    UnknownTransform(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input parsing.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for a single cell transform.
pub type CellResult<T> = Result<T, CellError>;

/// Result type for output serialization.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
