//! Serial Link Tester
//!
//! Exercises a serial link (or a daisy chain of relaying nodes) with
//! pseudo-random messages and verifies that every byte comes back as sent.

pub mod core;
pub mod processing;
pub mod relay;
pub mod session;
pub mod hardware;
pub mod utils;

// Re-export commonly used types
pub use self::core::{MessageLength, Role, Topology};
pub use hardware::{Channels, LinkError, LinkResult};
pub use processing::{Message, MessageGenerator, Verifier};
pub use relay::{QueueConfig, RelayQueue};
pub use session::{run_session, Session, SessionConfig, ThroughputReport};
pub use utils::LinkTestConfig;
