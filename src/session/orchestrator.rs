//! Session wiring: decide which roles run, start them, collect the outcome

use crate::core::{MessageLength, Role, Topology, DEFAULT_SEED};
use crate::hardware::{Channels, LinkError, LinkResult};
use crate::processing::{MessageGenerator, Verifier};
use crate::relay::{QueueConfig, RelayQueue};
use crate::session::receive::{ExpectedSource, Receiver};
use crate::session::transmit::{TransmitSource, Transmitter};
use crate::session::{signals, SessionStats, ThroughputReport};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parameters of one link test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub role: Role,
    pub topology: Topology,
    pub seed: u32,
    pub length: MessageLength,
    /// Stop each role after this many messages
    pub message_limit: Option<u64>,
    pub queue: QueueConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            topology: Topology::default(),
            seed: DEFAULT_SEED,
            length: MessageLength::default(),
            message_limit: None,
            queue: QueueConfig::default(),
        }
    }
}

/// One node's link test
pub struct Session {
    config: SessionConfig,
    stats: Arc<SessionStats>,
}

impl Session {
    pub fn new(config: SessionConfig) -> LinkResult<Self> {
        config.length.validate()?;
        if config.queue.capacity == 0 {
            return Err(LinkError::Config("queue capacity must be positive".to_string()));
        }

        Ok(Self {
            config,
            stats: Arc::new(SessionStats::new()),
        })
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Run the roles the configuration calls for on `channels`.
    ///
    /// Returns the final statistics once every role reached the message
    /// limit, or the first fatal error. Statistics are logged on every exit.
    ///
    /// On error the remaining worker is left detached. It stays blocked on
    /// its channel or the queue until that returns, then exits on its own.
    pub fn run(&self, channels: Channels) -> LinkResult<ThroughputReport> {
        let master = self.config.role.is_master();
        let chain = self.config.topology.is_chain();
        channels.check(master, chain)?;

        info!(
            "Starting {} session ({}), seed {}, {:?}",
            self.config.role, self.config.topology, self.config.seed, self.config.length
        );

        let queue = Arc::new(RelayQueue::new(self.config.queue));
        // exactly one role fabricates messages: transmit on a master, receive on a slave
        let generator = MessageGenerator::new(self.config.seed, self.config.length);
        let (mut tx_generator, mut rx_generator) = if master {
            (Some(generator), None)
        } else {
            (None, Some(generator))
        };
        let limit = self.config.message_limit;
        let (done_tx, done_rx) = mpsc::channel::<(&'static str, LinkResult<()>)>();
        let mut handles = Vec::new();

        if let Some(channel) = channels.rx {
            let source = match rx_generator.take() {
                Some(generator) => ExpectedSource::Generate(generator),
                None => ExpectedSource::Relay,
            };
            let receiver = Receiver::new(
                channel,
                source,
                Arc::clone(&queue),
                !master && chain,
                Verifier::new(self.config.role),
                Arc::clone(&self.stats),
                limit,
            );
            handles.push(spawn_worker("rx", done_tx.clone(), move || receiver.run())?);
        }

        if let Some(channel) = channels.tx {
            let source = match tx_generator.take() {
                Some(generator) => TransmitSource::Generate(generator),
                None => TransmitSource::Relay,
            };
            let transmitter = Transmitter::new(
                channel,
                source,
                Arc::clone(&queue),
                master && chain,
                Arc::clone(&self.stats),
                limit,
            );
            handles.push(spawn_worker("tx", done_tx.clone(), move || transmitter.run())?);
        }
        drop(done_tx);

        let mut remaining = handles.len();
        while remaining > 0 {
            match done_rx.recv_timeout(SIGNAL_POLL_INTERVAL) {
                Ok((name, Ok(()))) => {
                    debug!("{} worker finished", name);
                    remaining -= 1;
                }
                Ok((name, Err(err))) => {
                    error!("{} worker failed: {}", name, err);
                    warn!("{}", self.stats.report());
                    return Err(err);
                }
                Err(RecvTimeoutError::Timeout) => self.poll_signals()?,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!("{} worker did not shut down cleanly", name);
            }
        }

        let report = self.stats.report();
        warn!("{}", report);
        Ok(report)
    }

    fn poll_signals(&self) -> LinkResult<()> {
        if !signals::installed() {
            return Ok(());
        }
        if signals::take_interrupt() {
            warn!("{}", self.stats.report());
        }
        if signals::take_quit() {
            warn!("{}", self.stats.report());
            return Err(LinkError::Quit);
        }
        Ok(())
    }
}

fn spawn_worker<F>(
    name: &'static str,
    done: mpsc::Sender<(&'static str, LinkResult<()>)>,
    work: F,
) -> LinkResult<thread::JoinHandle<()>>
where
    F: FnOnce() -> LinkResult<()> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(work))
                .unwrap_or(Err(LinkError::Worker(name)));
            let _ = done.send((name, result));
        })
        .map_err(|source| LinkError::Configure {
            operation: "spawn worker thread",
            source,
        })
}

/// Run a session to completion on the given channels
pub fn run_session(config: SessionConfig, channels: Channels) -> LinkResult<ThroughputReport> {
    Session::new(config)?.run(channels)
}
