//! Message generation and verification

pub mod generator;
pub mod verifier;

pub use generator::{Message, MessageGenerator, PatternSource};
pub use verifier::{mismatch_positions, relay_increment, Verifier};
