//! Decoder types and traits
//!
//! Describes where a feature's payload keeps its items, total count and ids.

use crate::error::Result;
use crate::pagination::PageResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where to find the page fields in a JSON response
///
/// Every feature names these differently (`posts`, `categories`, `peoples`,
/// `data`); the shape renames them at the edge so the engine only ever sees
/// `{ items, total_count }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseShape {
    /// Path to the items array (dot notation, or JSONPath with `[*]`)
    #[serde(default = "default_items_path")]
    pub items_path: String,

    /// Path to the total item count
    #[serde(default = "default_total_path")]
    pub total_path: String,

    /// Path to the page size the backend served, if it reports one
    #[serde(default)]
    pub page_size_path: Option<String>,

    /// Path to the identity field inside each item
    #[serde(default = "default_id_path")]
    pub id_path: String,
}

fn default_items_path() -> String {
    "items".to_string()
}

fn default_total_path() -> String {
    "totalCount".to_string()
}

fn default_id_path() -> String {
    "id".to_string()
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self {
            items_path: default_items_path(),
            total_path: default_total_path(),
            page_size_path: None,
            id_path: default_id_path(),
        }
    }
}

impl ResponseShape {
    /// Create a shape with the given items and total paths
    pub fn new(items_path: impl Into<String>, total_path: impl Into<String>) -> Self {
        Self {
            items_path: items_path.into(),
            total_path: total_path.into(),
            ..Default::default()
        }
    }

    /// Set the id path
    #[must_use]
    pub fn with_id_path(mut self, path: impl Into<String>) -> Self {
        self.id_path = path.into();
        self
    }

    /// Set the page size path
    #[must_use]
    pub fn with_page_size_path(mut self, path: impl Into<String>) -> Self {
        self.page_size_path = Some(path.into());
        self
    }
}

/// Trait for decoding response bodies into pages
pub trait PageDecoder: Send + Sync {
    /// Decode a response body into a page payload
    fn decode(&self, body: &str) -> Result<PageResult<Value>>;

    /// Identity of a decoded item, used for cross-page deduplication
    fn item_id(&self, item: &Value) -> String;
}
