//! Bucket trait - funnel output interface
//!
//! Defines the abstract interface for the sinks a funnel fills.

use crate::{Chunk, ContractError, ReadySignal};

/// Result of handing a chunk to a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAck {
    /// Chunk taken, the bucket can take more
    Accepted,
    /// Chunk taken, but the bucket is over capacity.
    ///
    /// No further writes should be made until the bucket's
    /// [`ReadySignal`] fires.
    Backpressure,
}

/// Data output trait
///
/// All bucket implementations must implement this trait. Buckets are
/// constructed and owned by the caller; a funnel only holds the value it
/// was handed while the bucket is attached.
pub trait Bucket {
    /// Bucket name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one chunk
    ///
    /// # Errors
    /// Returns write error (should include context). A failed write means
    /// the chunk was not taken.
    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError>;

    /// Signal that no further writes will follow
    fn end(&mut self) -> Result<(), ContractError>;

    /// Signal fired when the bucket can take writes again after
    /// answering [`WriteAck::Backpressure`]
    fn ready_signal(&self) -> ReadySignal;
}

impl<B: Bucket + ?Sized> Bucket for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError> {
        (**self).write(chunk)
    }

    fn end(&mut self) -> Result<(), ContractError> {
        (**self).end()
    }

    fn ready_signal(&self) -> ReadySignal {
        (**self).ready_signal()
    }
}
