//! Configuration and diagnostics helpers

pub mod config;
pub mod formatting;

pub use config::{ConfigError, LinkTestConfig};
pub use formatting::{compare_dump, hex_dump};
