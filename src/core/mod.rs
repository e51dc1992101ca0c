//! Core types and constants for the serial link tester

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
