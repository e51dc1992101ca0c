//! Transmit role: obtain a message, write it out, repeat

use crate::hardware::{LinkError, LinkResult, TxChannel};
use crate::processing::{Message, MessageGenerator};
use crate::relay::RelayQueue;
use crate::session::SessionStats;
use crate::utils::hex_dump;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, enabled, Level};

/// Where outgoing messages come from
pub enum TransmitSource {
    /// Fabricate fresh messages (master)
    Generate(MessageGenerator),
    /// Forward what the receive role queued (relaying slave)
    Relay,
}

pub struct Transmitter {
    channel: TxChannel,
    source: TransmitSource,
    queue: Arc<RelayQueue>,
    /// Queue each sent message so the receive role can match its echo
    expect_echo: bool,
    stats: Arc<SessionStats>,
    limit: Option<u64>,
}

impl Transmitter {
    pub fn new(
        channel: TxChannel,
        source: TransmitSource,
        queue: Arc<RelayQueue>,
        expect_echo: bool,
        stats: Arc<SessionStats>,
        limit: Option<u64>,
    ) -> Self {
        Self { channel, source, queue, expect_echo, stats, limit }
    }

    /// Send until the message limit is reached or an error occurs
    pub fn run(mut self) -> LinkResult<()> {
        let mut sent = 0u64;
        while self.limit.map_or(true, |limit| sent < limit) {
            self.step()?;
            sent += 1;
        }
        debug!("Sent {} messages", sent);
        Ok(())
    }

    fn step(&mut self) -> LinkResult<()> {
        let message = match &mut self.source {
            TransmitSource::Generate(generator) => generator.generate(),
            TransmitSource::Relay => self.queue.dequeue()?,
        };

        if enabled!(Level::DEBUG) {
            debug!("Message with {} bytes of data", message.len());
            for line in hex_dump(message.payload()) {
                debug!("{}", line);
            }
        }

        self.send(&message)?;

        if self.expect_echo {
            self.queue.enqueue(message)?;
        }
        Ok(())
    }

    /// Write the whole payload in a single call; anything less is fatal
    fn send(&mut self, message: &Message) -> LinkResult<()> {
        let written = loop {
            match self.channel.write(message.payload()) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Write(e)),
            }
        };

        if written < message.len() {
            return Err(LinkError::ShortWrite {
                written,
                expected: message.len(),
            });
        }

        self.stats.record_sent(written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MessageLength;
    use crate::hardware::{loopback, Fault, FaultyWriter};
    use crate::relay::QueueConfig;
    use std::io::Read;

    fn generator() -> TransmitSource {
        TransmitSource::Generate(MessageGenerator::new(42, MessageLength::Fixed(16)))
    }

    #[test]
    fn test_generated_messages_are_written() {
        let (writer, mut reader) = loopback();
        let stats = Arc::new(SessionStats::new());
        let queue = Arc::new(RelayQueue::default());

        let tx = Transmitter::new(Box::new(writer), generator(), queue.clone(), false, stats.clone(), Some(3));
        tx.run().unwrap();

        let mut expected = MessageGenerator::new(42, MessageLength::Fixed(16));
        let mut buf = vec![0u8; 48];
        reader.read_exact(&mut buf).unwrap();
        for chunk in buf.chunks(16) {
            assert_eq!(chunk, expected.generate().payload());
        }
        assert_eq!(stats.tx_bytes(), 48);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_echo_messages_are_queued() {
        let (writer, _reader) = loopback();
        let stats = Arc::new(SessionStats::new());
        let queue = Arc::new(RelayQueue::default());

        let tx = Transmitter::new(Box::new(writer), generator(), queue.clone(), true, stats, Some(2));
        tx.run().unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_relay_drains_queue_in_order() {
        let (writer, mut reader) = loopback();
        let queue = Arc::new(RelayQueue::default());
        queue.enqueue(Message::new(vec![1, 2])).unwrap();
        queue.enqueue(Message::new(vec![3])).unwrap();

        let tx = Transmitter::new(
            Box::new(writer),
            TransmitSource::Relay,
            queue.clone(),
            false,
            Arc::new(SessionStats::new()),
            Some(2),
        );
        tx.run().unwrap();

        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_short_write_is_fatal() {
        let stats = Arc::new(SessionStats::new());
        let tx = Transmitter::new(
            Box::new(FaultyWriter::new(Fault::Short(4))),
            generator(),
            Arc::new(RelayQueue::default()),
            false,
            stats.clone(),
            None,
        );
        let err = tx.run().unwrap_err();
        assert!(matches!(err, LinkError::ShortWrite { written: 4, expected: 16 }));
        assert_eq!(stats.tx_bytes(), 0);
    }

    #[test]
    fn test_write_error_is_fatal() {
        let tx = Transmitter::new(
            Box::new(FaultyWriter::new(Fault::Fail(io::ErrorKind::BrokenPipe))),
            generator(),
            Arc::new(RelayQueue::default()),
            false,
            Arc::new(SessionStats::new()),
            None,
        );
        assert!(matches!(tx.run(), Err(LinkError::Write(_))));
    }

    #[test]
    fn test_relay_times_out_without_input() {
        let queue = Arc::new(RelayQueue::new(QueueConfig {
            initial_dequeue_timeout: std::time::Duration::from_millis(50),
            ..QueueConfig::default()
        }));
        let tx = Transmitter::new(
            Box::new(io::sink()),
            TransmitSource::Relay,
            queue,
            false,
            Arc::new(SessionStats::new()),
            None,
        );
        assert!(matches!(tx.run(), Err(LinkError::QueueTimeout { .. })));
    }
}
