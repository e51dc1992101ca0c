//! Relay queue between the receive and transmit paths

pub mod queue;

pub use queue::{QueueConfig, RelayQueue};
