//! Upstream trait - funnel input interface
//!
//! Abstracts the single producer a funnel drains. The driver only pulls
//! from it while the funnel's ingestion gate is open, which is how
//! backpressure reaches the producer.

use tokio::sync::mpsc;

use crate::Chunk;

/// Chunk producer
#[trait_variant::make(Upstream: Send)]
pub trait LocalUpstream {
    /// Upstream name (used for logging)
    fn name(&self) -> &str;

    /// Next chunk in production order, `None` once the producer is done
    async fn next_chunk(&mut self) -> Option<Chunk>;
}

/// Channel-backed upstream
///
/// The sending half is the producer; a bounded channel makes the producer
/// wait while the funnel holds ingestion suspended.
#[derive(Debug)]
pub struct ChannelUpstream {
    name: String,
    rx: mpsc::Receiver<Chunk>,
}

impl ChannelUpstream {
    /// Wrap a receiver
    pub fn new(name: impl Into<String>, rx: mpsc::Receiver<Chunk>) -> Self {
        Self {
            name: name.into(),
            rx,
        }
    }

    /// Create a bounded channel and its upstream end
    pub fn channel(name: impl Into<String>, capacity: usize) -> (mpsc::Sender<Chunk>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(name, rx))
    }
}

impl Upstream for ChannelUpstream {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_chunk(&mut self) -> Option<Chunk> {
        self.rx.recv().await
    }
}
