//! MemoryBucket - collects chunks in memory
//!
//! A cloneable handle: keep one clone to inspect what the funnel wrote
//! and to drain it, hand the other to the funnel.

use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{Bucket, Chunk, ContractError, ReadySignal, WriteAck};
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryState {
    received: Vec<Chunk>,
    unread: usize,
    backpressured: bool,
    ended: bool,
}

/// In-memory bucket with an optional high-water mark
///
/// With a high-water mark set, a write that leaves `high_water_mark` or more
/// unread chunks answers with backpressure; [`take_unread`](Self::take_unread)
/// frees the space and, if backpressure was answered, fires the ready signal.
#[derive(Debug, Clone)]
pub struct MemoryBucket {
    name: Arc<str>,
    high_water_mark: Option<usize>,
    state: Arc<Mutex<MemoryState>>,
    ready: ReadySignal,
}

impl MemoryBucket {
    /// Create an unbounded memory bucket
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            high_water_mark: None,
            state: Arc::new(Mutex::new(MemoryState::default())),
            ready: ReadySignal::new(),
        }
    }

    /// Answer with backpressure once this many chunks are unread
    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = Some(high_water_mark.max(1));
        self
    }

    /// Every chunk written so far, in write order
    pub fn received(&self) -> Vec<Chunk> {
        self.lock().received.clone()
    }

    /// Utf8 view of every chunk written so far
    pub fn received_text(&self) -> Vec<String> {
        self.lock()
            .received
            .iter()
            .map(|chunk| String::from_utf8_lossy(&chunk.data).into_owned())
            .collect()
    }

    /// Number of chunks written so far
    pub fn len(&self) -> usize {
        self.lock().received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `end()` was called
    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Consume the unread chunks, signalling readiness after backpressure
    pub fn take_unread(&self) -> Vec<Chunk> {
        let (unread, backpressured) = {
            let mut state = self.lock();
            let start = state.received.len() - state.unread;
            state.unread = 0;
            let backpressured = std::mem::take(&mut state.backpressured);
            (state.received[start..].to_vec(), backpressured)
        };
        if backpressured {
            self.ready.signal();
        }
        unread
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError> {
        let mut state = self.lock();
        if state.ended {
            return Err(ContractError::bucket_ended(self.name.as_ref()));
        }

        state.received.push(chunk.clone());
        state.unread += 1;

        match self.high_water_mark {
            Some(mark) if state.unread >= mark => {
                debug!(bucket = %self.name, unread = state.unread, "High-water mark reached");
                state.backpressured = true;
                Ok(WriteAck::Backpressure)
            }
            _ => Ok(WriteAck::Accepted),
        }
    }

    fn end(&mut self) -> Result<(), ContractError> {
        self.lock().ended = true;
        Ok(())
    }

    fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }
}
