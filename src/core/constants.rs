//! Link test limits and timing parameters

use std::time::Duration;

/// Default upper bound for the message length
pub const DEFAULT_MAX_MSG_LEN: usize = 256;

/// Largest message the staging buffer can hold
pub const MAX_MSG_LEN: usize = 4096;

/// Maximum number of messages in flight in the relay queue
pub const MAX_LIST_SIZE: usize = 64;

/// How long a producer may wait for room in the relay queue
pub const TX_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a consumer may wait for a message once traffic is flowing
pub const RX_TIMEOUT: Duration = Duration::from_secs(5);

/// First dequeue of the run, covering startup skew between nodes
pub const RX_TIMEOUT_INIT: Duration = Duration::from_secs(60);

/// Seed used when none is given
pub const DEFAULT_SEED: u32 = 42;
