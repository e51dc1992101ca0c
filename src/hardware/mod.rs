//! Hardware abstraction for the link under test
//!
//! Devices are handed to the session as plain `Read`/`Write` channels, so
//! real serial ports and the in-memory mock links are interchangeable.

pub mod channel;
pub mod serial;
pub mod mock;
pub mod error;

pub use channel::{Channels, DeviceConfig, Direction, RxChannel, TxChannel};
pub use serial::{open_channels, open_device, read_icount, InterruptCounters};
pub use mock::{loopback, Fault, FaultyWriter, LoopbackReader, LoopbackWriter};
pub use error::{LinkError, LinkResult, QueueOp};
