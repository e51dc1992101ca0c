//! Throughput accounting shared by the worker threads

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Bits per second for `bytes` moved in `elapsed`, with elapsed floored to 1 µs
pub fn bits_per_second(bytes: u64, elapsed: Duration) -> u64 {
    let micros = elapsed.as_micros().max(1);
    (u128::from(bytes) * 8_000_000 / micros) as u64
}

/// Counters updated by the workers and read by the reporter
#[derive(Debug)]
pub struct SessionStats {
    started: Instant,
    tx_bytes: AtomicU64,
    rx_bytes: AtomicU64,
    messages_sent: AtomicU64,
    messages_verified: AtomicU64,
    chain_offset: OnceLock<u8>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            tx_bytes: AtomicU64::new(0),
            rx_bytes: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_verified: AtomicU64::new(0),
            chain_offset: OnceLock::new(),
        }
    }

    pub fn record_sent(&self, bytes: usize) {
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_verified(&self) {
        self.messages_verified.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the calibrated hop count; later calls are ignored
    pub fn set_chain_offset(&self, offset: u8) -> bool {
        self.chain_offset.set(offset).is_ok()
    }

    pub fn chain_offset(&self) -> Option<u8> {
        self.chain_offset.get().copied()
    }

    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes.load(Ordering::Relaxed)
    }

    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Snapshot of the counters
    pub fn report(&self) -> ThroughputReport {
        let elapsed = self.elapsed();
        let tx_bytes = self.tx_bytes();
        let rx_bytes = self.rx_bytes();

        ThroughputReport {
            tx_bytes,
            tx_bps: bits_per_second(tx_bytes, elapsed),
            rx_bytes,
            rx_bps: bits_per_second(rx_bytes, elapsed),
            elapsed_us: elapsed.as_micros() as u64,
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_verified: self.messages_verified.load(Ordering::Relaxed),
            chain_offset: self.chain_offset(),
        }
    }
}

/// Cumulative throughput at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThroughputReport {
    pub tx_bytes: u64,
    pub tx_bps: u64,
    pub rx_bytes: u64,
    pub rx_bps: u64,
    pub elapsed_us: u64,
    pub messages_sent: u64,
    pub messages_verified: u64,
    pub chain_offset: Option<u8>,
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TX: {} bytes ({} bps), RX: {} bytes ({} bps)",
            self.tx_bytes, self.tx_bps, self.rx_bytes, self.rx_bps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_second() {
        assert_eq!(bits_per_second(1000, Duration::from_secs(1)), 8000);
        assert_eq!(bits_per_second(16, Duration::ZERO), 128_000_000);
        assert_eq!(bits_per_second(0, Duration::from_millis(5)), 0);
    }

    #[test]
    fn test_counters() {
        let stats = SessionStats::new();
        stats.record_sent(16);
        stats.record_sent(4);
        stats.record_received(20);
        stats.record_verified();

        let report = stats.report();
        assert_eq!(report.tx_bytes, 20);
        assert_eq!(report.rx_bytes, 20);
        assert_eq!(report.messages_sent, 2);
        assert_eq!(report.messages_verified, 1);
        assert_eq!(report.chain_offset, None);
    }

    #[test]
    fn test_chain_offset_written_once() {
        let stats = SessionStats::new();
        assert!(stats.set_chain_offset(3));
        assert!(!stats.set_chain_offset(5));
        assert_eq!(stats.chain_offset(), Some(3));
    }

    #[test]
    fn test_report_format() {
        let report = ThroughputReport {
            tx_bytes: 100,
            tx_bps: 800,
            rx_bytes: 50,
            rx_bps: 400,
            elapsed_us: 1_000_000,
            messages_sent: 1,
            messages_verified: 1,
            chain_offset: Some(0),
        };
        assert_eq!(report.to_string(), "TX: 100 bytes (800 bps), RX: 50 bytes (400 bps)");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rx_bps"], 400);
        assert_eq!(json["chain_offset"], 0);
    }
}
