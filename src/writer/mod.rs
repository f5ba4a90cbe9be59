//! Row sink: JSON rows back to CSV bytes.
//!
//! Emits columns in the original header order, preserving row order.
//! Rows may carry columns outside the header set (a custom transform
//! can add one); those extend the header in first-seen order rather
//! than being dropped.

use serde_json::Value;
use std::path::Path;

use crate::error::{SinkError, SinkResult};
use crate::models::render_cell;

/// Serialize rows to CSV bytes.
///
/// `headers` fixes the leading column order; any additional keys found
/// in the rows are appended after it.
pub fn write_rows(rows: &[Value], headers: &[String], delimiter: char) -> SinkResult<Vec<u8>> {
    let columns = collect_columns(rows, headers)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(Vec::new());

    writer.write_record(&columns)?;

    for (idx, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| SinkError::BadRow {
            row: idx,
            message: "row is not an object".to_string(),
        })?;

        let record: Vec<String> = columns
            .iter()
            .map(|col| obj.get(col).map(render_cell).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| SinkError::Finalize(e.to_string()))
}

/// Header columns plus stray row keys in first-seen order.
fn collect_columns(rows: &[Value], headers: &[String]) -> SinkResult<Vec<String>> {
    let mut columns: Vec<String> = headers.to_vec();

    for (idx, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| SinkError::BadRow {
            row: idx,
            message: "row is not an object".to_string(),
        })?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    Ok(columns)
}

/// Derive the output file name from the input name.
///
/// `catalog.csv` becomes `catalog_processed.csv`; a missing extension
/// falls back to `.csv`.
pub fn derive_output_name(input_name: &str) -> String {
    let path = Path::new(input_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("csv");
    format!("{}_processed.{}", stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_write_rows_basic() {
        let rows = vec![
            json!({"sku": "A-1", "barcode": "1234"}),
            json!({"sku": "B-2", "barcode": "5678"}),
        ];
        let out = write_rows(&rows, &headers(&["sku", "barcode"]), ';').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "sku;barcode\nA-1;1234\nB-2;5678\n");
    }

    #[test]
    fn test_null_renders_empty() {
        let rows = vec![json!({"a": null, "b": "x"})];
        let out = write_rows(&rows, &headers(&["a", "b"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n,x\n");
    }

    #[test]
    fn test_typed_cells_rendered() {
        let rows = vec![json!({"n": 42, "f": 1.5, "b": true})];
        let out = write_rows(&rows, &headers(&["n", "f", "b"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "n,f,b\n42,1.5,true\n");
    }

    #[test]
    fn test_header_order_preserved() {
        // Object key iteration is alphabetical; headers must win.
        let rows = vec![json!({"alpha": "1", "zulu": "2"})];
        let out = write_rows(&rows, &headers(&["zulu", "alpha"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "zulu,alpha\n2,1\n");
    }

    #[test]
    fn test_stray_columns_appended() {
        let rows = vec![
            json!({"a": "1"}),
            json!({"a": "2", "extra": "x"}),
        ];
        let out = write_rows(&rows, &headers(&["a"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,extra\n1,\n2,x\n");
    }

    #[test]
    fn test_delimiter_in_value_quoted() {
        let rows = vec![json!({"a": "x;y", "b": "plain"})];
        let out = write_rows(&rows, &headers(&["a", "b"]), ';').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a;b\n\"x;y\";plain\n");
    }

    #[test]
    fn test_non_object_row_error() {
        let rows = vec![json!(["not", "an", "object"])];
        let err = write_rows(&rows, &headers(&["a"]), ',').unwrap_err();
        assert!(matches!(err, SinkError::BadRow { row: 0, .. }));
    }

    #[test]
    fn test_empty_dataset_writes_header_only() {
        let out = write_rows(&[], &headers(&["a", "b"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\n");
    }

    #[test]
    fn test_derive_output_name() {
        assert_eq!(derive_output_name("catalog.csv"), "catalog_processed.csv");
        assert_eq!(derive_output_name("data.tsv"), "data_processed.tsv");
        assert_eq!(derive_output_name("noext"), "noext_processed.csv");
        assert_eq!(derive_output_name(""), "output_processed.csv");
    }
}
