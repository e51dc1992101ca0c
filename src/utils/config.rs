//! Link test configuration
//!
//! Settings can be loaded from a JSON file; command line flags are layered
//! on top by the binary.

use crate::core::{
    MessageLength, Role, Topology, DEFAULT_SEED, MAX_LIST_SIZE, RX_TIMEOUT, RX_TIMEOUT_INIT,
    TX_TIMEOUT,
};
use crate::hardware::{serial, DeviceConfig, LinkError};
use crate::relay::QueueConfig;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl From<ConfigError> for LinkError {
    fn from(err: ConfigError) -> Self {
        LinkError::Config(err.to_string())
    }
}

/// Complete settings for one link test node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTestConfig {
    pub role: Role,
    pub topology: Topology,
    /// Pattern seed; zero seeds from OS entropy
    pub seed: u32,
    pub length: MessageLength,
    /// Baud rate to program, or keep the current one
    pub speed: Option<u32>,
    /// Stop after this many messages per role
    pub message_limit: Option<u64>,
    pub queue_capacity: usize,
    pub tx_timeout_secs: u64,
    pub rx_timeout_secs: u64,
    pub rx_initial_timeout_secs: u64,
}

impl Default for LinkTestConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            topology: Topology::default(),
            seed: DEFAULT_SEED,
            length: MessageLength::default(),
            speed: None,
            message_limit: None,
            queue_capacity: MAX_LIST_SIZE,
            tx_timeout_secs: TX_TIMEOUT.as_secs(),
            rx_timeout_secs: RX_TIMEOUT.as_secs(),
            rx_initial_timeout_secs: RX_TIMEOUT_INIT.as_secs(),
        }
    }
}

impl LinkTestConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: LinkTestConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path_str,
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length.validate().is_err() {
            return Err(ConfigError::InvalidParameter {
                parameter: "length",
                value: self.length.max().to_string(),
                reason: "must be between 1 and 4096",
            });
        }

        if let Some(speed) = self.speed {
            if serial::baud_symbol(speed).is_none() {
                return Err(ConfigError::InvalidParameter {
                    parameter: "speed",
                    value: speed.to_string(),
                    reason: "unknown serial speed",
                });
            }
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "queue_capacity",
                value: "0".to_string(),
                reason: "must be positive",
            });
        }

        let timeouts = [
            ("tx_timeout_secs", self.tx_timeout_secs),
            ("rx_timeout_secs", self.rx_timeout_secs),
            ("rx_initial_timeout_secs", self.rx_initial_timeout_secs),
        ];
        for (parameter, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidParameter {
                    parameter,
                    value: "0".to_string(),
                    reason: "timeouts must be non-zero",
                });
            }
        }

        Ok(())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            capacity: self.queue_capacity,
            enqueue_timeout: Duration::from_secs(self.tx_timeout_secs),
            dequeue_timeout: Duration::from_secs(self.rx_timeout_secs),
            initial_dequeue_timeout: Duration::from_secs(self.rx_initial_timeout_secs),
        }
    }

    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig::raw(self.speed)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            role: self.role,
            topology: self.topology,
            seed: self.seed,
            length: self.length,
            message_limit: self.message_limit,
            queue: self.queue_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LinkTestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed, 42);
        assert_eq!(config.length, MessageLength::UpTo(256));
        assert_eq!(config.queue_config(), QueueConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = LinkTestConfig::default();
        config.length = MessageLength::Fixed(5000);
        assert!(config.validate().is_err());

        let mut config = LinkTestConfig::default();
        config.speed = Some(12345);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { parameter: "speed", .. })
        ));

        let mut config = LinkTestConfig::default();
        config.rx_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = LinkTestConfig::default();
        config.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"role": "master", "topology": "chain", "seed": 7,
                "length": {{"mode": "fixed", "bytes": 16}}, "speed": 115200}}"#
        )
        .unwrap();

        let config = LinkTestConfig::from_file(file.path()).unwrap();
        assert!(config.role.is_master());
        assert!(config.topology.is_chain());
        assert_eq!(config.seed, 7);
        assert_eq!(config.length, MessageLength::Fixed(16));
        assert_eq!(config.speed, Some(115200));
        assert_eq!(config.queue_capacity, MAX_LIST_SIZE);

        let session = config.session_config();
        assert_eq!(session.length, MessageLength::Fixed(16));
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            LinkTestConfig::from_file("/nonexistent/link.json"),
            Err(ConfigError::Io { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = LinkTestConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(LinkError::from(err).is_config());
    }
}
