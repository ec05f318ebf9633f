//! Rendering of results for the terminal.
//!
//! - `console`: human-readable lines
//! - `json`: machine-readable session output for `--json`

pub mod console;
pub mod json;

pub use json::to_json;
