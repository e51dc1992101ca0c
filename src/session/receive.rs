//! Receive role: reassemble, verify, then relay or discard

use crate::core::MAX_MSG_LEN;
use crate::hardware::{LinkError, LinkResult, RxChannel};
use crate::processing::{mismatch_positions, relay_increment, MessageGenerator, Verifier};
use crate::relay::RelayQueue;
use crate::session::stats::bits_per_second;
use crate::session::SessionStats;
use crate::utils::compare_dump;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::{debug, error};

/// Where the expected message comes from
pub enum ExpectedSource {
    /// Regenerate locally from the shared seed (slave)
    Generate(MessageGenerator),
    /// Take what the transmit role sent (master in a chain)
    Relay,
}

pub struct Receiver {
    channel: RxChannel,
    source: ExpectedSource,
    queue: Arc<RelayQueue>,
    /// Increment and queue verified messages for the transmit role
    forward: bool,
    verifier: Verifier,
    stats: Arc<SessionStats>,
    limit: Option<u64>,
    staging: Vec<u8>,
    available: usize,
}

impl Receiver {
    pub fn new(
        channel: RxChannel,
        source: ExpectedSource,
        queue: Arc<RelayQueue>,
        forward: bool,
        verifier: Verifier,
        stats: Arc<SessionStats>,
        limit: Option<u64>,
    ) -> Self {
        Self {
            channel,
            source,
            queue,
            forward,
            verifier,
            stats,
            limit,
            staging: vec![0; MAX_MSG_LEN],
            available: 0,
        }
    }

    /// Verify until the message limit is reached or an error occurs
    pub fn run(mut self) -> LinkResult<()> {
        let mut verified = 0u64;
        while self.limit.map_or(true, |limit| verified < limit) {
            self.step()?;
            verified += 1;
        }
        debug!("Verified {} messages", verified);
        Ok(())
    }

    fn fill(&mut self, needed: usize) -> LinkResult<()> {
        while self.available < needed {
            let n = match self.channel.read(&mut self.staging[self.available..]) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Read(e)),
            };
            self.available += n;
            self.stats.record_received(n);
        }
        Ok(())
    }

    fn step(&mut self) -> LinkResult<()> {
        let mut expected = match &mut self.source {
            ExpectedSource::Generate(generator) => generator.generate(),
            ExpectedSource::Relay => self.queue.dequeue()?,
        };
        let len = expected.len();

        self.fill(len)?;

        let received = &self.staging[..len];
        let ok = self.verifier.verify(&mut expected, received);
        if let Some(offset) = self.verifier.chain_offset() {
            self.stats.set_chain_offset(offset);
        }
        if !ok {
            error!("Data mismatch");
            let (lines, _) = compare_dump(received, expected.payload());
            for line in lines {
                error!("{}", line);
            }
            return Err(LinkError::Mismatch {
                length: len,
                positions: mismatch_positions(expected.payload(), received),
            });
        }
        self.stats.record_verified();

        let age = expected.age();
        debug!(
            "OK {} bytes in {} us ({} bps)",
            len,
            age.as_micros(),
            bits_per_second(len as u64, age)
        );

        self.staging.copy_within(len..self.available, 0);
        self.available -= len;
        if self.available > 0 {
            debug!("Keeping {} bytes", self.available);
        }

        if self.forward {
            relay_increment(&mut expected);
            self.queue.enqueue(expected)?;
        }
        Ok(())
    }
}
