// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Pager
//!
//! A Rust-native engine for paging remote collections into deduplicated,
//! infinitely scrollable lists. One generic engine replaces a hand-written
//! infinite-scroll loader per feature (posts, categories, search results,
//! followers, comments).
//!
//! ## Features
//!
//! - **Single-flight fetching**: At most one request per (key, page) in flight
//! - **Key-based cancellation**: Results for an old key never reach the list
//! - **Cross-page deduplication**: First occurrence of an id wins
//! - **End detection**: A short or empty page ends the collection
//! - **REST adapter**: YAML-defined collections fetched over HTTP with retry,
//!   backoff and rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_pager::{load_collection, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let posts = load_collection("collections/posts.yaml")?;
//!     let view = posts.build_view("design".to_string())?;
//!
//!     let mut updates = view.subscribe();
//!     view.load_more().await;
//!
//!     let snapshot = updates.borrow_and_update().clone();
//!     println!("{} of {:?} posts", snapshot.items.len(), snapshot.total_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CollectionView                           │
//! │  load_more() → LoadOutcome   reset(key)   subscribe() → Snapshot│
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────────┬─────────────┴───┬──────────────┬───────────────┐
//! │ FetchCoordinator│   PageStore     │    merge     │ is_reaching_end│
//! ├────────────────┼─────────────────┼──────────────┼───────────────┤
//! │ single-flight  │ ordered pages   │ dedup by id  │ short page    │
//! │ generation tags│ canonical total │ order stable │ empty first   │
//! └────────────────┴─────────────────┴──────────────┴───────────────┘
//!                                │ PageFetcher
//! ┌──────────────────┬───────────┴──────┬───────────────────────────┐
//! │  HttpPageFetcher │  JsonPageDecoder │  CollectionDefinition     │
//! │  templates, retry│  field renaming  │  YAML + validation        │
//! └──────────────────┴──────────────────┴───────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pager
pub mod error;

/// Common types and type aliases
pub mod types;

/// Paging engine: coordinator, store, merge and the collection view
pub mod pagination;

/// Response decoders
pub mod decode;

/// HTTP client and REST page fetcher
pub mod http;

/// Template interpolation
pub mod template;

/// YAML collection definitions
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_collection, load_collection_from_str, CollectionDefinition};
pub use pagination::{
    CollectionSnapshot, CollectionView, FetchError, FetchErrorKind, LoadOutcome, PageFetcher,
    PageResult, Status,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
