//! Response decoder module
//!
//! Turns a feature's JSON payload into the engine's `{ items, total_count }`
//! page shape.
//!
//! # Overview
//!
//! Each feature keeps its items under a different field. A `ResponseShape`
//! names those fields and `JsonPageDecoder` extracts them, rejecting
//! malformed payloads as protocol violations.

mod decoders;
mod types;

pub use decoders::JsonPageDecoder;
pub use types::{PageDecoder, ResponseShape};
