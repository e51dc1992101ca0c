//! Link test session: the transmit and receive roles and their wiring

pub mod orchestrator;
pub mod receive;
pub mod signals;
pub mod stats;
pub mod transmit;

pub use orchestrator::{run_session, Session, SessionConfig};
pub use receive::{ExpectedSource, Receiver};
pub use stats::{SessionStats, ThroughputReport};
pub use transmit::{TransmitSource, Transmitter};
