//! CLI command implementations for atlas-probe-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration and upstream validation
//! - `config`: Configuration file generation
//! - `fetch`: One-off scrape of a single probe

pub mod check;
pub mod config;
pub mod fetch;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use fetch::command_fetch;
