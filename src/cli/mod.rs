//! CLI module
//!
//! Command-line interface for paging collections.
//!
//! # Commands
//!
//! - `fetch` - Walk a collection for a key and print its merged items
//! - `validate` - Check a collection definition
//! - `inspect` - Print the normalized collection definition

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{CliKey, Runner};

#[cfg(test)]
mod tests;
