//! Cell transforms.
//!
//! The pipeline does not know what the transform does to a cell; it
//! only needs [`CellTransform`]: an async, fallible mapping from one
//! cell value to another. Library users inject their own (an HSM call,
//! an encryption service, ...). The CLI and HTTP surface address the
//! built-in transforms by name.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::error::{CellError, CellResult, PipelineError};
use crate::models::render_cell;

/// A per-cell transformation, applied to the designated column.
///
/// May suspend (network/crypto calls) and may fail per cell; a failure
/// is recorded against the row and never aborts the run.
#[async_trait]
pub trait CellTransform: Send + Sync {
    /// Transform one non-empty cell value.
    async fn apply(&self, value: Value) -> CellResult<Value>;

    /// Name used in logs and responses.
    fn name(&self) -> &str {
        "custom"
    }
}

// =============================================================================
// Closure adapter
// =============================================================================

type BoxedCellFuture = Pin<Box<dyn Future<Output = CellResult<Value>> + Send>>;
type BoxedCellFn = Box<dyn Fn(Value) -> BoxedCellFuture + Send + Sync>;

fn boxed(fut: impl Future<Output = CellResult<Value>> + Send + 'static) -> BoxedCellFuture {
    Box::pin(fut)
}

/// Adapts a closure into a [`CellTransform`].
pub struct FnTransform {
    name: String,
    func: BoxedCellFn,
}

impl FnTransform {
    /// Wrap a synchronous fallible function.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> CellResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(move |value| {
                let result = func(value);
                boxed(async move { result })
            }),
        }
    }

    /// Wrap an async fallible function.
    pub fn new_async<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CellResult<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(move |value| boxed(func(value))),
        }
    }
}

#[async_trait]
impl CellTransform for FnTransform {
    async fn apply(&self, value: Value) -> CellResult<Value> {
        (self.func)(value).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Built-in transforms
// =============================================================================

/// Named transforms addressable from the CLI and the upload API.
///
/// All of them coerce scalar cells to text first; the designated
/// column of a barcode file is usually text anyway, but numbers and
/// booleans survive the trip as their canonical rendering.
#[derive(Debug, Clone)]
pub enum BuiltinTransform {
    /// Reverse the characters.
    Reverse,

    /// Convert to uppercase.
    Uppercase,

    /// Convert to lowercase.
    Lowercase,

    /// ROT13 the ASCII letters, leave everything else alone.
    Rot13,

    /// Keep only ASCII digits.
    Digits,

    /// Replace all but the trailing `visible` characters with `*`.
    Mask { visible: usize },

    /// Regex replacement over the whole cell.
    Replace { pattern: Regex, replacement: String },

    /// Always fails. Exercises the fail-soft path end to end.
    Fail,
}

impl BuiltinTransform {
    fn apply_text(&self, text: &str) -> CellResult<String> {
        match self {
            BuiltinTransform::Reverse => Ok(text.chars().rev().collect()),
            BuiltinTransform::Uppercase => Ok(text.to_uppercase()),
            BuiltinTransform::Lowercase => Ok(text.to_lowercase()),
            BuiltinTransform::Rot13 => Ok(text
                .chars()
                .map(|c| match c {
                    'a'..='z' => (b'a' + (c as u8 - b'a' + 13) % 26) as char,
                    'A'..='Z' => (b'A' + (c as u8 - b'A' + 13) % 26) as char,
                    other => other,
                })
                .collect()),
            BuiltinTransform::Digits => Ok(text.chars().filter(|c| c.is_ascii_digit()).collect()),
            BuiltinTransform::Mask { visible } => {
                let chars: Vec<char> = text.chars().collect();
                let masked = chars.len().saturating_sub(*visible);
                Ok(chars
                    .iter()
                    .enumerate()
                    .map(|(i, c)| if i < masked { '*' } else { *c })
                    .collect())
            }
            BuiltinTransform::Replace {
                pattern,
                replacement,
            } => Ok(pattern.replace_all(text, replacement.as_str()).into_owned()),
            BuiltinTransform::Fail => Err(CellError::new("transform configured to fail")),
        }
    }
}

#[async_trait]
impl CellTransform for BuiltinTransform {
    async fn apply(&self, value: Value) -> CellResult<Value> {
        let text = render_cell(&value);
        self.apply_text(&text).map(Value::String)
    }

    fn name(&self) -> &str {
        match self {
            BuiltinTransform::Reverse => "reverse",
            BuiltinTransform::Uppercase => "uppercase",
            BuiltinTransform::Lowercase => "lowercase",
            BuiltinTransform::Rot13 => "rot13",
            BuiltinTransform::Digits => "digits",
            BuiltinTransform::Mask { .. } => "mask",
            BuiltinTransform::Replace { .. } => "replace",
            BuiltinTransform::Fail => "fail",
        }
    }
}

impl FromStr for BuiltinTransform {
    type Err = PipelineError;

    /// Parse a transform spec: a bare name (`reverse`), `mask:<n>`, or
    /// `replace:<pattern>:<replacement>`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut parts = spec.splitn(3, ':');
        let name = parts.next().unwrap_or("");

        match name {
            "reverse" => Ok(Self::Reverse),
            "uppercase" | "upper" => Ok(Self::Uppercase),
            "lowercase" | "lower" => Ok(Self::Lowercase),
            "rot13" => Ok(Self::Rot13),
            "digits" => Ok(Self::Digits),
            "fail" => Ok(Self::Fail),
            "mask" => {
                let visible = match parts.next() {
                    Some(n) => n
                        .parse::<usize>()
                        .map_err(|_| PipelineError::UnknownTransform(spec.to_string()))?,
                    None => 4,
                };
                Ok(Self::Mask { visible })
            }
            "replace" => {
                let pattern = parts
                    .next()
                    .ok_or_else(|| PipelineError::UnknownTransform(spec.to_string()))?;
                let replacement = parts.next().unwrap_or("").to_string();
                let pattern = Regex::new(pattern)
                    .map_err(|_| PipelineError::UnknownTransform(spec.to_string()))?;
                Ok(Self::Replace {
                    pattern,
                    replacement,
                })
            }
            _ => Err(PipelineError::UnknownTransform(spec.to_string())),
        }
    }
}

/// Human-readable list of built-in transforms for `cellforge transforms`.
pub fn transforms_description() -> String {
    [
        "Built-in cell transforms (applied to the designated column):",
        "",
        "  reverse                          Reverse the characters",
        "  uppercase                        Convert to uppercase",
        "  lowercase                        Convert to lowercase",
        "  rot13                            ROT13 the ASCII letters",
        "  digits                           Keep only ASCII digits",
        "  mask[:<visible>]                 Mask all but the last N characters (default 4)",
        "  replace:<pattern>:<replacement>  Regex replacement",
        "  fail                             Always fail (testing)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn apply(t: &BuiltinTransform, v: Value) -> CellResult<Value> {
        t.apply(v).await
    }

    #[tokio::test]
    async fn test_reverse() {
        let out = apply(&BuiltinTransform::Reverse, json!("1234")).await.unwrap();
        assert_eq!(out, json!("4321"));
    }

    #[tokio::test]
    async fn test_reverse_coerces_numbers() {
        let out = apply(&BuiltinTransform::Reverse, json!(1234)).await.unwrap();
        assert_eq!(out, json!("4321"));
    }

    #[tokio::test]
    async fn test_rot13_involution() {
        let t = BuiltinTransform::Rot13;
        let once = apply(&t, json!("Barcode-42")).await.unwrap();
        assert_eq!(once, json!("Onepbqr-42"));
        let twice = apply(&t, once).await.unwrap();
        assert_eq!(twice, json!("Barcode-42"));
    }

    #[tokio::test]
    async fn test_mask_defaults() {
        let t: BuiltinTransform = "mask".parse().unwrap();
        let out = apply(&t, json!("4006381333931")).await.unwrap();
        assert_eq!(out, json!("*********3931"));
    }

    #[tokio::test]
    async fn test_mask_shorter_than_visible() {
        let t = BuiltinTransform::Mask { visible: 10 };
        let out = apply(&t, json!("abc")).await.unwrap();
        assert_eq!(out, json!("abc"));
    }

    #[tokio::test]
    async fn test_replace() {
        let t: BuiltinTransform = "replace:[^0-9]:".parse().unwrap();
        let out = apply(&t, json!("40-06/38")).await.unwrap();
        assert_eq!(out, json!("400638"));
    }

    #[tokio::test]
    async fn test_fail_transform() {
        let err = apply(&BuiltinTransform::Fail, json!("x")).await.unwrap_err();
        assert!(err.to_string().contains("fail"));
    }

    #[test]
    fn test_parse_specs() {
        assert!(matches!(
            "reverse".parse::<BuiltinTransform>().unwrap(),
            BuiltinTransform::Reverse
        ));
        assert!(matches!(
            "mask:6".parse::<BuiltinTransform>().unwrap(),
            BuiltinTransform::Mask { visible: 6 }
        ));
        assert!("mask:x".parse::<BuiltinTransform>().is_err());
        assert!("aes256".parse::<BuiltinTransform>().is_err());
        assert!("replace".parse::<BuiltinTransform>().is_err());
        assert!("replace:(unclosed".parse::<BuiltinTransform>().is_err());
    }

    #[tokio::test]
    async fn test_fn_transform_sync() {
        let t = FnTransform::new("shout", |v| {
            Ok(Value::String(format!("{}!", render_cell(&v))))
        });
        assert_eq!(t.name(), "shout");
        assert_eq!(t.apply(json!("hey")).await.unwrap(), json!("hey!"));
    }

    #[tokio::test]
    async fn test_fn_transform_async() {
        let t = FnTransform::new_async("echo", |v| async move { Ok(v) });
        assert_eq!(t.apply(json!(7)).await.unwrap(), json!(7));
    }
}
