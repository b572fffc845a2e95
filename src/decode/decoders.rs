//! Decoder implementations

use super::types::{PageDecoder, ResponseShape};
use crate::error::{Error, Result};
use crate::pagination::PageResult;
use serde_json::Value;
use tracing::debug;

// ============================================================================
// JSON Page Decoder
// ============================================================================

/// Decodes JSON page payloads described by a [`ResponseShape`]
///
/// A payload whose items are not an array, or whose total count is not a
/// finite non-negative number, is a protocol violation.
#[derive(Debug, Clone, Default)]
pub struct JsonPageDecoder {
    shape: ResponseShape,
}

impl JsonPageDecoder {
    /// Create a decoder for the given shape
    pub fn new(shape: ResponseShape) -> Self {
        Self { shape }
    }

    /// The shape this decoder reads
    pub fn shape(&self) -> &ResponseShape {
        &self.shape
    }

    /// Decode an already parsed JSON value
    pub fn decode_value(&self, value: &Value) -> Result<PageResult<Value>> {
        let items = self.extract_items(value)?;
        let total_count = self.extract_total(value)?;

        let mut page = PageResult::new(items, total_count);
        if let Some(page_size) = self.extract_page_size(value) {
            page = page.with_page_size(page_size);
        }
        Ok(page)
    }

    fn extract_items(&self, value: &Value) -> Result<Vec<Value>> {
        let path = &self.shape.items_path;

        // Only wildcard paths go through jsonpath-rust
        if path.contains('*') {
            return extract_with_jsonpath(value, path);
        }

        match extract_simple_path(value, path) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(Error::protocol(format!(
                "items at '{path}' is not an array (found {})",
                type_name(&other)
            ))),
            None => Err(Error::protocol(format!("items path '{path}' not found"))),
        }
    }

    fn extract_total(&self, value: &Value) -> Result<u64> {
        let path = &self.shape.total_path;
        let total = extract_simple_path(value, path)
            .ok_or_else(|| Error::protocol(format!("total count path '{path}' not found")))?;

        match &total {
            Value::Number(n) => {
                if let Some(count) = n.as_u64() {
                    return Ok(count);
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => Ok(f.trunc() as u64),
                    _ => Err(Error::protocol(format!(
                        "total count at '{path}' is not a non-negative number: {n}"
                    ))),
                }
            }
            other => Err(Error::protocol(format!(
                "total count at '{path}' is not a number (found {})",
                type_name(other)
            ))),
        }
    }

    fn extract_page_size(&self, value: &Value) -> Option<u32> {
        let path = self.shape.page_size_path.as_deref()?;
        let size = extract_simple_path(value, path)
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0);
        if size.is_none() {
            debug!("Page size path '{path}' missing or invalid, using requested size");
        }
        size
    }
}

impl PageDecoder for JsonPageDecoder {
    fn decode(&self, body: &str) -> Result<PageResult<Value>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        self.decode_value(&value)
    }

    fn item_id(&self, item: &Value) -> String {
        // Tagged by JSON type so `1` and `"1"` stay distinct items
        match extract_simple_path(item, &self.shape.id_path) {
            Some(Value::String(s)) => format!("s:{s}"),
            Some(Value::Number(n)) => format!("n:{n}"),
            _ => format!("raw:{item}"),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path
///
/// An empty path or `$` selects the whole value.
pub(crate) fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        // Handle array indexing like "data[0]" or "items[-1]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract items using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    // The container the wildcard iterates over must exist
    let prefix = path[..path.find('*').unwrap_or(path.len())].trim_end_matches(['[', '.']);
    if !prefix.contains("..") {
        match extract_simple_path(value, prefix) {
            Some(Value::Array(_) | Value::Object(_)) => {}
            Some(other) => {
                return Err(Error::protocol(format!(
                    "items container '{prefix}' is not an array (found {})",
                    type_name(&other)
                )))
            }
            None => {
                return Err(Error::protocol(format!(
                    "items container '{prefix}' not found"
                )))
            }
        }
    }

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::decode(format!("Invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Err(Error::protocol(format!(
            "items at '{path}' is not an array (found {})",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
