//! Link error types and handling

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Queue operation that ran into its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOp {
    Enqueue,
    Dequeue,
}

impl std::fmt::Display for QueueOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueOp::Enqueue => write!(f, "enqueue"),
            QueueOp::Dequeue => write!(f, "dequeue"),
        }
    }
}

/// Everything that can end a link test run
#[derive(Debug, Error)]
pub enum LinkError {
    /// Invalid options, detected before any worker starts
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to open {path}{direction}: {source}")]
    Open {
        path: String,
        direction: &'static str,
        #[source]
        source: io::Error,
    },

    /// Terminal attribute or ioctl failure on an open device
    #[error("Failed to {operation}: {source}")]
    Configure {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Read error: {0}")]
    Read(#[source] io::Error),

    #[error("Write error: {0}")]
    Write(#[source] io::Error),

    #[error("Short write {written} < {expected}")]
    ShortWrite { written: usize, expected: usize },

    /// The input channel reported end of file
    #[error("Channel closed by peer")]
    Closed,

    /// The counterpart role stalled or the link stopped carrying data
    #[error("Timeout, aborting: {operation} did not complete within {waited:?}")]
    QueueTimeout { operation: QueueOp, waited: Duration },

    #[error("Data mismatch in {length}-byte message at {} position(s)", .positions.len())]
    Mismatch { length: usize, positions: Vec<usize> },

    #[error("Quit requested")]
    Quit,

    #[error("Worker thread {0} panicked")]
    Worker(&'static str),
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

impl LinkError {
    /// Whether the error was raised before the link was exercised
    pub fn is_config(&self) -> bool {
        matches!(self, LinkError::Config(_))
    }

    /// Whether the error ended a run that had already started
    pub fn is_fatal(&self) -> bool {
        !self.is_config()
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() {
            255
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert!(!LinkError::Config("bad".into()).is_fatal());
        assert!(LinkError::Quit.is_fatal());
        assert!(LinkError::Closed.is_fatal());
        assert_eq!(LinkError::Config("bad".into()).exit_code(), 1);
        assert_eq!(LinkError::Closed.exit_code(), 255);
        assert_eq!(
            LinkError::ShortWrite { written: 3, expected: 8 }.exit_code(),
            255
        );
    }

    #[test]
    fn test_display() {
        let err = LinkError::Mismatch { length: 16, positions: vec![1, 5] };
        assert_eq!(err.to_string(), "Data mismatch in 16-byte message at 2 position(s)");

        let err = LinkError::QueueTimeout {
            operation: QueueOp::Dequeue,
            waited: Duration::from_secs(5),
        };
        assert!(err.to_string().starts_with("Timeout, aborting: dequeue"));
    }
}
