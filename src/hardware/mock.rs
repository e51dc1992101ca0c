//! In-memory links for testing and development
//!
//! `loopback()` returns a connected writer/reader pair that behaves like a
//! serial line: reads block until bytes arrive and may return fewer bytes
//! than were written in one go. Dropping the writer makes the reader see
//! end of file once the pipe is drained.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

struct PipeState {
    bytes: VecDeque<u8>,
    writer_alive: bool,
}

struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

/// Writing half of a mock link
pub struct LoopbackWriter {
    pipe: Arc<Pipe>,
}

/// Reading half of a mock link
pub struct LoopbackReader {
    pipe: Arc<Pipe>,
    chunk_limit: Option<usize>,
}

/// Create a connected mock link
pub fn loopback() -> (LoopbackWriter, LoopbackReader) {
    let pipe = Arc::new(Pipe {
        state: Mutex::new(PipeState {
            bytes: VecDeque::new(),
            writer_alive: true,
        }),
        readable: Condvar::new(),
    });

    (
        LoopbackWriter { pipe: Arc::clone(&pipe) },
        LoopbackReader { pipe, chunk_limit: None },
    )
}

impl LoopbackReader {
    /// Deliver at most `limit` bytes per read, to exercise reassembly
    pub fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = Some(limit.max(1));
        self
    }

    /// Bytes written but not yet read
    pub fn pending(&self) -> usize {
        self.pipe.state.lock().bytes.len()
    }
}

impl Write for LoopbackWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.pipe.state.lock();
        state.bytes.extend(buf.iter().copied());
        drop(state);
        self.pipe.readable.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LoopbackWriter {
    fn drop(&mut self) {
        self.pipe.state.lock().writer_alive = false;
        self.pipe.readable.notify_all();
    }
}

impl Read for LoopbackReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.pipe.state.lock();
        while state.bytes.is_empty() {
            if !state.writer_alive {
                return Ok(0);
            }
            self.pipe.readable.wait(&mut state);
        }

        let limit = self.chunk_limit.unwrap_or(usize::MAX);
        let count = buf.len().min(state.bytes.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(state.bytes.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

/// How a `FaultyWriter` misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Accept at most this many bytes per write
    Short(usize),
    /// Fail every write with this error kind
    Fail(io::ErrorKind),
}

/// Writer that simulates a misbehaving output device
pub struct FaultyWriter {
    fault: Fault,
    accepted: Vec<u8>,
}

impl FaultyWriter {
    pub fn new(fault: Fault) -> Self {
        Self { fault, accepted: Vec::new() }
    }

    /// Bytes the writer claimed to accept
    pub fn accepted(&self) -> &[u8] {
        &self.accepted
    }
}

impl Write for FaultyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.fault {
            Fault::Short(max) => {
                let count = buf.len().min(max);
                self.accepted.extend_from_slice(&buf[..count]);
                Ok(count)
            }
            Fault::Fail(kind) => Err(io::Error::new(kind, "simulated write failure")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
