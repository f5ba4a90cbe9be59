//! Row source: delimited text to string-keyed JSON rows.
//!
//! Handles files as they arrive from uploads: encoding is detected
//! with chardet and decoded via encoding_rs, the delimiter is detected
//! from the header line. Each data row becomes a JSON object keyed by
//! header name; cells are typed via [`crate::models::infer_cell`]
//! unless inference is disabled, in which case non-empty cells stay
//! text.

use serde_json::{Map, Value};

use crate::error::{FormatError, FormatResult};
use crate::models::infer_cell;

/// Result of parsing with detection metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows as JSON objects, in file order.
    pub rows: Vec<Value>,
    /// Detected or forced encoding.
    pub encoding: String,
    /// Detected or forced delimiter.
    pub delimiter: char,
    /// Column headers, in file order.
    pub headers: Vec<String>,
}

/// Parsing knobs. Defaults match the upload path: detect everything.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Force a delimiter instead of detecting one.
    pub delimiter: Option<char>,
    /// Type cells (numbers, booleans, null for empty). When off, empty
    /// cells still become null but everything else stays text.
    pub infer_types: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            infer_types: true,
        }
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to text using the given encoding name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> FormatResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string())),
        // Windows-1252 is a strict superset of ISO-8859-1 (the 0x80-0x9F
        // range gains printable characters), so one table covers both.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string())
        }
        // Unknown charset: require valid UTF-8 rather than guessing.
        other => String::from_utf8(bytes.to_vec()).map_err(|e| FormatError::Decode {
            encoding: other.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Detect the delimiter by counting candidates in the header line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let candidates = [';', ',', '\t', '|'];
    let mut best = ',';
    let mut best_count = 0;

    for &sep in &candidates {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }

    best
}

/// Parse input bytes with encoding and delimiter detection.
///
/// # Example
/// ```ignore
/// let result = parse_bytes(b"sku;barcode\nA-1;4006381333931\n", &ParseOptions::default())?;
/// assert_eq!(result.headers, vec!["sku", "barcode"]);
/// assert_eq!(result.rows.len(), 1);
/// ```
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> FormatResult<ParseResult> {
    if bytes.is_empty() {
        return Err(FormatError::EmptyInput);
    }
    // A NUL byte means a binary upload (xls, zip, ...), not delimited text.
    if let Some(pos) = bytes.iter().position(|&b| b == 0) {
        return Err(FormatError::BinaryData(pos));
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&content));

    parse_str(&content, delimiter, encoding, options.infer_types)
}

/// Parse input from a file path, with detection.
pub fn parse_file<P: AsRef<std::path::Path>>(
    path: P,
    options: &ParseOptions,
) -> FormatResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, options)
}

/// Parse decoded text with an explicit delimiter.
///
/// Uses a real CSV reader underneath, so quoted fields (including
/// embedded delimiters and quotes) survive; the sink quotes on write,
/// and its output must stay re-ingestable.
pub fn parse_str(
    content: &str,
    delimiter: char,
    encoding: String,
    infer_types: bool,
) -> FormatResult<ParseResult> {
    let header_line = content.lines().next().ok_or(FormatError::EmptyInput)?;
    if header_line.trim().is_empty() {
        return Err(FormatError::NoHeaders);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(FormatError::NoHeaders);
    }

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;

        let mut obj = Map::new();

        for (i, header) in headers.iter().enumerate() {
            let raw = record.get(i).map(|s| s.trim()).unwrap_or("");

            let cell = if infer_types {
                infer_cell(raw)
            } else if raw.is_empty() {
                Value::Null
            } else {
                Value::String(raw.to_string())
            };

            obj.insert(header.clone(), cell);
        }

        rows.push(Value::Object(obj));
    }

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}
