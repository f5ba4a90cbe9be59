//! # cellforge - streaming column transformation for tabular files
//!
//! cellforge ingests a delimited file, applies a pluggable cell
//! transform to one designated column of every row, and produces a
//! transformed file plus a per-run outcome (success count and per-row
//! failures). Individual cell failures never abort a run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Input bytes │────▶│   Reader    │────▶│   Executor   │────▶│   Writer    │
//! │ (CSV/TSV)   │     │ (auto-enc)  │     │ (per-cell f) │     │ (CSV out)   │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cellforge::{transform_bytes, BuiltinTransform, TransformOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let input = b"sku;barcode\nA-1;4006381333931\n";
//!     let result = transform_bytes(
//!         input, "barcode", &BuiltinTransform::Reverse, TransformOptions::default(),
//!     ).await.unwrap();
//!     println!("{}", result.outcome.summary());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cell helpers and outcome accounting
//! - [`reader`] - Row source with encoding/delimiter detection
//! - [`transform`] - Cell transforms, executor, and pipeline
//! - [`writer`] - Row sink
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Row source
pub mod reader;

// Transformation
pub mod transform;

// Row sink
pub mod writer;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CellError, FormatError, PipelineError, ServerError, SinkError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{cell_is_empty, infer_cell, render_cell, RowFailure, TransformOutcome};

// =============================================================================
// Re-exports - Reader
// =============================================================================

pub use reader::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_file, ParseOptions,
    ParseResult,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    apply_to_column, transform_bytes, transform_file, transforms_description, BuiltinTransform,
    CellTransform, ColumnTransformResult, CsvInfo, ExecuteOptions, FnTransform, PipelineOutput,
    TransformOptions,
};

// =============================================================================
// Re-exports - Writer
// =============================================================================

pub use writer::{derive_output_name, write_rows};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, TransformResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
