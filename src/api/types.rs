//! REST API response types.
//!
//! The transformed file travels back as text inside the JSON response
//! together with a download name derived from the upload name, so a
//! browser client can hand it straight to a save-file call.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::TransformOutcome;
use crate::transform::pipeline::PipelineOutput;
use crate::writer::derive_output_name;

/// Response sent after an upload has been transformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Unique job identifier.
    pub job_id: String,

    /// "complete" when every non-empty cell transformed, "partial"
    /// when some cells failed and kept their original value.
    pub status: String,

    /// Suggested download file name.
    pub file_name: String,

    /// Transformed file content.
    pub content: String,

    /// Metadata about the run.
    pub metadata: TransformMetadata,
}

/// Metadata about one transform run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformMetadata {
    /// Designated column.
    pub column: String,

    /// Transform name applied.
    pub transform: String,

    /// Input file info.
    pub csv_info: CsvMetadata,

    /// Per-run accounting.
    pub outcome: OutcomeStats,
}

/// Input file metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Outcome statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeStats {
    pub transformed: usize,
    pub skipped: usize,
    pub failures: Vec<FailureEntry>,
}

/// One recorded per-row failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub row: usize,
    pub column: String,
    pub message: String,
}

impl From<&TransformOutcome> for OutcomeStats {
    fn from(outcome: &TransformOutcome) -> Self {
        Self {
            transformed: outcome.success_count,
            skipped: outcome.skipped_count,
            failures: outcome
                .failures
                .iter()
                .map(|f| FailureEntry {
                    row: f.row,
                    column: f.column.clone(),
                    message: f.message.clone(),
                })
                .collect(),
        }
    }
}

impl TransformResponse {
    /// Build a response from a pipeline run.
    pub fn from_output(
        result: PipelineOutput,
        upload_name: &str,
        column: &str,
        transform: &str,
    ) -> Self {
        let status = if result.outcome.is_clean() {
            "complete"
        } else {
            "partial"
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            file_name: derive_output_name(upload_name),
            content: String::from_utf8_lossy(&result.output).to_string(),
            metadata: TransformMetadata {
                column: column.to_string(),
                transform: transform.to_string(),
                csv_info: CsvMetadata {
                    encoding: result.csv_info.encoding,
                    delimiter: result.csv_info.delimiter.to_string(),
                    row_count: result.csv_info.row_count,
                    columns: result.csv_info.headers,
                },
                outcome: OutcomeStats::from(&result.outcome),
            },
        }
    }
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::CsvInfo;

    fn sample_output(failures: usize) -> PipelineOutput {
        let mut outcome = TransformOutcome::new();
        outcome.success_count = 2;
        for i in 0..failures {
            outcome.failures.push(crate::models::RowFailure {
                row: i,
                column: "barcode".into(),
                message: "bad".into(),
            });
        }
        PipelineOutput {
            output: b"sku;barcode\nA;4321\n".to_vec(),
            rows: vec![],
            outcome,
            csv_info: CsvInfo {
                encoding: "utf-8".into(),
                delimiter: ';',
                headers: vec!["sku".into(), "barcode".into()],
                row_count: 1,
            },
        }
    }

    #[test]
    fn test_clean_run_is_complete() {
        let resp =
            TransformResponse::from_output(sample_output(0), "catalog.csv", "barcode", "reverse");
        assert_eq!(resp.status, "complete");
        assert_eq!(resp.file_name, "catalog_processed.csv");
        assert!(resp.content.contains("4321"));
        assert_eq!(resp.metadata.outcome.transformed, 2);
    }

    #[test]
    fn test_failed_cells_mark_partial() {
        let resp =
            TransformResponse::from_output(sample_output(2), "catalog.csv", "barcode", "reverse");
        assert_eq!(resp.status, "partial");
        assert_eq!(resp.metadata.outcome.failures.len(), 2);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let resp =
            TransformResponse::from_output(sample_output(0), "catalog.csv", "barcode", "reverse");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"jobId\""));
        assert!(json.contains("\"fileName\""));
        assert!(json.contains("\"rowCount\""));
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
    }
}
