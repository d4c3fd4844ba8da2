//! Ingest buffer - ordered retention of chunks awaiting delivery.
//!
//! Chunks enter at the tail and leave from the head. A chunk the funnel
//! could not deliver goes back to the head, so arrival order survives
//! valve rejections and failed writes.

use std::collections::VecDeque;
use std::fmt;

use contracts::{BufferConfig, Chunk, OverflowPolicy};

/// Outcome of pushing a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Chunk retained
    Stored,
    /// Chunk retained, the oldest chunk was evicted to make room
    Evicted(Chunk),
    /// Buffer full, chunk handed back
    Rejected(Chunk),
}

/// FIFO chunk queue, unbounded unless configured otherwise
pub struct IngestBuffer {
    chunks: VecDeque<Chunk>,
    max_chunks: Option<usize>,
    overflow: OverflowPolicy,
    retained_bytes: usize,
    dropped_count: u64,
}

impl fmt::Debug for IngestBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestBuffer")
            .field("len", &self.chunks.len())
            .field("bytes", &self.retained_bytes)
            .field("max_chunks", &self.max_chunks)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl Default for IngestBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl IngestBuffer {
    /// Create an unbounded buffer
    pub fn unbounded() -> Self {
        Self {
            chunks: VecDeque::new(),
            max_chunks: None,
            overflow: OverflowPolicy::Reject,
            retained_bytes: 0,
            dropped_count: 0,
        }
    }

    /// Create a buffer from configuration
    pub fn from_config(config: &BufferConfig) -> Self {
        Self {
            chunks: VecDeque::with_capacity(config.max_chunks.unwrap_or(0)),
            max_chunks: config.max_chunks,
            overflow: config.overflow,
            retained_bytes: 0,
            dropped_count: 0,
        }
    }

    /// Append a chunk to the tail, honouring the capacity policy
    pub fn push(&mut self, chunk: Chunk) -> PushOutcome {
        if self.is_full() {
            match self.overflow {
                OverflowPolicy::Reject => return PushOutcome::Rejected(chunk),
                OverflowPolicy::DropOldest => {
                    if let Some(oldest) = self.pop() {
                        self.dropped_count += 1;
                        self.store(chunk);
                        return PushOutcome::Evicted(oldest);
                    }
                }
            }
        }
        self.store(chunk);
        PushOutcome::Stored
    }

    /// Put a chunk back at the head
    ///
    /// Bypasses the capacity check: the chunk was already accounted for.
    pub fn requeue(&mut self, chunk: Chunk) {
        self.retained_bytes += chunk.len();
        self.chunks.push_front(chunk);
    }

    /// Peek at the head chunk without removing it
    #[inline]
    pub fn peek(&self) -> Option<&Chunk> {
        self.chunks.front()
    }

    /// Remove and return the head chunk
    #[inline]
    pub fn pop(&mut self) -> Option<Chunk> {
        let chunk = self.chunks.pop_front()?;
        self.retained_bytes -= chunk.len();
        Some(chunk)
    }

    /// Number of retained chunks
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total payload bytes retained
    #[inline]
    pub fn retained_bytes(&self) -> usize {
        self.retained_bytes
    }

    /// Chunks evicted by the drop-oldest policy
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Configured capacity, if bounded
    #[inline]
    pub fn max_chunks(&self) -> Option<usize> {
        self.max_chunks
    }

    /// Iterate retained chunks head first
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Take every retained chunk, head first
    pub fn drain_all(&mut self) -> Vec<Chunk> {
        self.retained_bytes = 0;
        self.chunks.drain(..).collect()
    }

    fn is_full(&self) -> bool {
        self.max_chunks
            .is_some_and(|max| self.chunks.len() >= max)
    }

    fn store(&mut self, chunk: Chunk) {
        self.retained_bytes += chunk.len();
        self.chunks.push_back(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(max: usize, overflow: OverflowPolicy) -> IngestBuffer {
        IngestBuffer::from_config(&BufferConfig {
            max_chunks: Some(max),
            overflow,
        })
    }

    #[test]
    fn test_buffer_fifo_order() {
        let mut buffer = IngestBuffer::unbounded();

        buffer.push(Chunk::text("a"));
        buffer.push(Chunk::text("b"));
        buffer.push(Chunk::text("c"));

        assert_eq!(buffer.pop().unwrap().as_str(), Some("a"));
        assert_eq!(buffer.pop().unwrap().as_str(), Some("b"));
        assert_eq!(buffer.pop().unwrap().as_str(), Some("c"));
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn test_requeue_goes_to_head() {
        let mut buffer = IngestBuffer::unbounded();
        buffer.push(Chunk::text("a"));
        buffer.push(Chunk::text("b"));

        let head = buffer.pop().unwrap();
        buffer.requeue(head);

        assert_eq!(buffer.peek().unwrap().as_str(), Some("a"));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.retained_bytes(), 2);
    }

    #[test]
    fn test_reject_when_full() {
        let mut buffer = bounded(2, OverflowPolicy::Reject);
        assert_eq!(buffer.push(Chunk::text("a")), PushOutcome::Stored);
        assert_eq!(buffer.push(Chunk::text("b")), PushOutcome::Stored);
        assert_eq!(
            buffer.push(Chunk::text("c")),
            PushOutcome::Rejected(Chunk::text("c"))
        );
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped_count(), 0);
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let mut buffer = bounded(2, OverflowPolicy::DropOldest);
        buffer.push(Chunk::text("a"));
        buffer.push(Chunk::text("b"));

        assert_eq!(
            buffer.push(Chunk::text("c")),
            PushOutcome::Evicted(Chunk::text("a"))
        );
        let remaining: Vec<_> = buffer.iter().filter_map(Chunk::as_str).collect();
        assert_eq!(remaining, vec!["b", "c"]);
        assert_eq!(buffer.dropped_count(), 1);
    }

    #[test]
    fn test_drain_all_resets_bytes() {
        let mut buffer = IngestBuffer::unbounded();
        buffer.push(Chunk::text("ab"));
        buffer.push(Chunk::text("cd"));
        assert_eq!(buffer.retained_bytes(), 4);

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.retained_bytes(), 0);
    }
}
