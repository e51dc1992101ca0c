//! Channel handles and device configuration

use crate::hardware::{LinkError, LinkResult};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Writable end of the link
pub type TxChannel = Box<dyn Write + Send>;

/// Readable end of the link
pub type RxChannel = Box<dyn Read + Send>;

/// Direction a device is opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
    ReadWrite,
}

impl Direction {
    /// Suffix used in open failure messages
    pub fn describe(self) -> &'static str {
        match self {
            Direction::Read => " for reading",
            Direction::Write => " for writing",
            Direction::ReadWrite => "",
        }
    }
}

/// Terminal settings applied when a device is opened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Baud rate, or `None` to keep whatever the line is set to
    pub baud_rate: Option<u32>,
    /// Switch the terminal into raw mode
    pub raw: bool,
}

impl DeviceConfig {
    pub fn raw(baud_rate: Option<u32>) -> Self {
        Self { baud_rate, raw: true }
    }
}

/// The channel handles a session runs on
#[derive(Default)]
pub struct Channels {
    pub tx: Option<TxChannel>,
    pub rx: Option<RxChannel>,
}

impl Channels {
    pub fn transmit_only(tx: impl Write + Send + 'static) -> Self {
        Self { tx: Some(Box::new(tx)), rx: None }
    }

    pub fn receive_only(rx: impl Read + Send + 'static) -> Self {
        Self { tx: None, rx: Some(Box::new(rx)) }
    }

    pub fn duplex(tx: impl Write + Send + 'static, rx: impl Read + Send + 'static) -> Self {
        Self { tx: Some(Box::new(tx)), rx: Some(Box::new(rx)) }
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_none() && self.rx.is_none()
    }

    /// Reject handle combinations the role cannot drive
    pub fn check(&self, master: bool, chain: bool) -> LinkResult<()> {
        let (tx, rx) = (self.tx.is_some(), self.rx.is_some());
        let ok = match (master, chain) {
            (_, true) => tx && rx,
            (true, false) => tx && !rx,
            (false, false) => rx && !tx,
        };
        if !ok {
            return Err(LinkError::Config(format!(
                "{} {} needs {}",
                if master { "master" } else { "slave" },
                if chain { "chain" } else { "point-to-point" },
                match (master, chain) {
                    (_, true) => "both an output and an input channel",
                    (true, false) => "an output channel only",
                    (false, false) => "an input channel only",
                }
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_channel_combinations() {
        assert!(Channels::transmit_only(io::sink()).check(true, false).is_ok());
        assert!(Channels::receive_only(io::empty()).check(false, false).is_ok());
        assert!(Channels::duplex(io::sink(), io::empty()).check(true, true).is_ok());
        assert!(Channels::duplex(io::sink(), io::empty()).check(false, true).is_ok());

        assert!(Channels::receive_only(io::empty()).check(true, false).is_err());
        assert!(Channels::transmit_only(io::sink()).check(false, false).is_err());
        assert!(Channels::transmit_only(io::sink()).check(true, true).is_err());
        assert!(Channels::default().is_empty());
    }
}
