//! Collection definition module
//!
//! Parse collection definitions from YAML files.
//!
//! # Overview
//!
//! - `CollectionDefinition` - one remote paged collection
//! - `RequestDefinition` - how a page is requested
//! - `HttpDefinition` - timeouts, retries, backoff and rate limiting
//! - YAML parsing with validation

mod parser;
mod types;

pub use parser::{load_collection, load_collection_from_str};
pub use types::{CollectionDefinition, HttpDefinition, RequestDefinition};
