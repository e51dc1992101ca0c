//! Core data types for the link test

use crate::core::constants::MAX_MSG_LEN;
use crate::hardware::{LinkError, LinkResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which end of the link this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Originates test messages and expects them back
    Master,
    /// Receives, verifies and (in a chain) forwards messages
    #[default]
    Slave,
}

impl Role {
    pub fn is_master(self) -> bool {
        matches!(self, Role::Master)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Slave => write!(f, "slave"),
        }
    }
}

/// How the nodes are wired together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Master writes, a single slave reads
    #[default]
    PointToPoint,
    /// Master and any number of relays daisy chained into a loop
    Chain,
}

impl Topology {
    pub fn is_chain(self) -> bool {
        matches!(self, Topology::Chain)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::PointToPoint => write!(f, "point-to-point"),
            Topology::Chain => write!(f, "chain"),
        }
    }
}

/// Length of generated messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "bytes", rename_all = "kebab-case")]
pub enum MessageLength {
    /// Every message carries exactly this many bytes
    Fixed(usize),
    /// Each message draws a length uniformly from `1..=n`
    UpTo(usize),
}

impl MessageLength {
    /// Decode a signed length directive: negative means "random up to |n|".
    pub fn from_directive(directive: i64) -> LinkResult<Self> {
        let length = match directive {
            d if d < 0 => MessageLength::UpTo(d.unsigned_abs() as usize),
            d => MessageLength::Fixed(d as usize),
        };
        length.validate()?;
        Ok(length)
    }

    /// Upper bound on the number of bytes a message can carry
    pub fn max(self) -> usize {
        match self {
            MessageLength::Fixed(n) | MessageLength::UpTo(n) => n,
        }
    }

    pub fn validate(self) -> LinkResult<()> {
        let max = self.max();
        if max == 0 || max > MAX_MSG_LEN {
            return Err(LinkError::Config(format!(
                "message length {} out of range 1..={}",
                max, MAX_MSG_LEN
            )));
        }
        Ok(())
    }
}

impl Default for MessageLength {
    fn default() -> Self {
        MessageLength::UpTo(crate::core::constants::DEFAULT_MAX_MSG_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_directive() {
        assert_eq!(MessageLength::from_directive(16).unwrap(), MessageLength::Fixed(16));
        assert_eq!(MessageLength::from_directive(-300).unwrap(), MessageLength::UpTo(300));
        assert!(MessageLength::from_directive(0).is_err());
        assert!(MessageLength::from_directive(4097).is_err());
        assert!(MessageLength::from_directive(-4097).is_err());
        assert_eq!(MessageLength::from_directive(4096).unwrap().max(), 4096);
    }

    #[test]
    fn test_role_serde_names() {
        let role: Role = serde_json::from_str("\"master\"").unwrap();
        assert!(role.is_master());
        let topology: Topology = serde_json::from_str("\"point-to-point\"").unwrap();
        assert!(!topology.is_chain());
    }
}
