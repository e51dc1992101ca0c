//! Bounded FIFO between the receive and transmit roles
//!
//! Both blocking operations carry a deadline. Running into it means the
//! other side of the node has stalled, which ends the run.

use crate::core::{MAX_LIST_SIZE, RX_TIMEOUT, RX_TIMEOUT_INIT, TX_TIMEOUT};
use crate::hardware::{LinkError, LinkResult, QueueOp};
use crate::processing::Message;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Capacity and deadlines of a relay queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub enqueue_timeout: Duration,
    pub dequeue_timeout: Duration,
    /// Applies until the first successful dequeue
    pub initial_dequeue_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_LIST_SIZE,
            enqueue_timeout: TX_TIMEOUT,
            dequeue_timeout: RX_TIMEOUT,
            initial_dequeue_timeout: RX_TIMEOUT_INIT,
        }
    }
}

struct QueueState {
    messages: VecDeque<Message>,
    primed: bool,
}

/// Thread-safe bounded message queue
pub struct RelayQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    config: QueueConfig,
}

impl RelayQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::with_capacity(config.capacity),
                primed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a message, waiting while the queue is full
    pub fn enqueue(&self, message: Message) -> LinkResult<()> {
        let capacity = self.config.capacity;
        let mut state = self.state.lock();

        if state.messages.len() >= capacity {
            debug!("Too many messages in flight, pausing...");
            let deadline = Instant::now() + self.config.enqueue_timeout;
            while state.messages.len() >= capacity {
                let result = self.not_full.wait_until(&mut state, deadline);
                if result.timed_out() && state.messages.len() >= capacity {
                    return Err(LinkError::QueueTimeout {
                        operation: QueueOp::Enqueue,
                        waited: self.config.enqueue_timeout,
                    });
                }
            }
        }

        state.messages.push_back(message);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest message, waiting while the queue is empty
    pub fn dequeue(&self) -> LinkResult<Message> {
        let mut state = self.state.lock();
        let timeout = if state.primed {
            self.config.dequeue_timeout
        } else {
            self.config.initial_dequeue_timeout
        };

        let mut deadline = None;
        let message = loop {
            if let Some(message) = state.messages.pop_front() {
                break message;
            }
            let deadline = *deadline.get_or_insert_with(|| {
                debug!("No more messages, waiting...");
                Instant::now() + timeout
            });
            if self.not_empty.wait_until(&mut state, deadline).timed_out()
                && state.messages.is_empty()
            {
                return Err(LinkError::QueueTimeout {
                    operation: QueueOp::Dequeue,
                    waited: timeout,
                });
            }
        };
        state.primed = true;
        drop(state);
        self.not_full.notify_one();
        Ok(message)
    }
}

impl Default for RelayQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn short_config(capacity: usize) -> QueueConfig {
        QueueConfig {
            capacity,
            enqueue_timeout: Duration::from_secs(2),
            dequeue_timeout: Duration::from_millis(100),
            initial_dequeue_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = RelayQueue::new(short_config(8));
        for id in [b'a', b'b', b'c'] {
            queue.enqueue(Message::new(vec![id])).unwrap();
        }
        assert_eq!(queue.len(), 3);

        let order: Vec<u8> = (0..3).map(|_| queue.dequeue().unwrap().payload()[0]).collect();
        assert_eq!(order, b"abc");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_backpressure_blocks_until_dequeue() {
        let queue = Arc::new(RelayQueue::new(QueueConfig {
            enqueue_timeout: Duration::from_secs(5),
            ..QueueConfig::default()
        }));
        for i in 0..MAX_LIST_SIZE {
            queue.enqueue(Message::new(vec![i as u8])).unwrap();
        }

        let done = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let result = queue.enqueue(Message::new(vec![0xff]));
                done.store(true, Ordering::SeqCst);
                result
            })
        };

        thread::sleep(Duration::from_millis(150));
        assert!(!done.load(Ordering::SeqCst), "enqueue should block on a full queue");

        assert_eq!(queue.dequeue().unwrap().payload(), &[0]);
        assert!(producer.join().unwrap().is_ok());
        assert_eq!(queue.len(), MAX_LIST_SIZE);
    }

    #[test]
    fn test_enqueue_timeout() {
        let queue = RelayQueue::new(QueueConfig {
            enqueue_timeout: Duration::from_millis(100),
            ..short_config(1)
        });
        queue.enqueue(Message::new(vec![1])).unwrap();

        let err = queue.enqueue(Message::new(vec![2])).unwrap_err();
        assert!(matches!(err, LinkError::QueueTimeout { operation: QueueOp::Enqueue, .. }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_dequeue_timeout_respects_deadline() {
        let queue = RelayQueue::new(short_config(4));

        let start = Instant::now();
        let err = queue.dequeue().unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, LinkError::QueueTimeout { operation: QueueOp::Dequeue, .. }));
        assert!(elapsed >= Duration::from_millis(200), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "returned late: {:?}", elapsed);
    }

    #[test]
    fn test_initial_timeout_only_applies_once() {
        let queue = RelayQueue::new(QueueConfig {
            initial_dequeue_timeout: Duration::from_secs(10),
            dequeue_timeout: Duration::from_millis(50),
            ..short_config(4)
        });
        queue.enqueue(Message::new(vec![1])).unwrap();
        queue.dequeue().unwrap();

        let start = Instant::now();
        assert!(queue.dequeue().is_err());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(RelayQueue::new(QueueConfig {
            initial_dequeue_timeout: Duration::from_secs(5),
            ..short_config(4)
        }));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(50));
        queue.enqueue(Message::new(vec![42])).unwrap();
        assert_eq!(consumer.join().unwrap().unwrap().payload(), &[42]);
    }
}
