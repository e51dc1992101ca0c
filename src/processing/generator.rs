//! Deterministic test message generation

use crate::core::MessageLength;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

/// Seeded pseudo-random byte source.
///
/// Two sources created with the same non-zero seed produce the same stream,
/// which is what lets a remote node reproduce the master's payloads.
pub struct PatternSource {
    rng: ChaCha8Rng,
}

impl PatternSource {
    /// Seed the source; zero picks a seed from OS entropy.
    pub fn new(seed: u32) -> Self {
        let rng = if seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(u64::from(seed))
        };
        Self { rng }
    }

    pub fn next_byte(&mut self) -> u8 {
        self.rng.gen()
    }

    /// Uniform integer in `low..=high`
    pub fn uniform_range(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..=high)
    }
}

/// A single test payload in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    timestamp: Instant,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            timestamp: Instant::now(),
            payload,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    /// Creation time, used for latency reporting only
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Produces messages from a seeded pattern source
pub struct MessageGenerator {
    source: PatternSource,
    length: MessageLength,
}

impl MessageGenerator {
    pub fn new(seed: u32, length: MessageLength) -> Self {
        Self {
            source: PatternSource::new(seed),
            length,
        }
    }

    pub fn length(&self) -> MessageLength {
        self.length
    }

    /// Fabricate the next message.
    ///
    /// The length is drawn before the payload so that every node consumes
    /// the pattern stream in the same order.
    pub fn generate(&mut self) -> Message {
        let len = match self.length {
            MessageLength::Fixed(n) => n,
            MessageLength::UpTo(n) => self.source.uniform_range(1, n),
        };

        let payload = (0..len).map(|_| self.source.next_byte()).collect();
        Message::new(payload)
    }
}
