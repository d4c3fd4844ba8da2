//! LogBucket - logs chunk summaries via tracing

use contracts::{Bucket, Chunk, ContractError, ReadySignal, WriteAck};
use tracing::{info, instrument};

/// Bucket that logs chunk summaries for debugging
pub struct LogBucket {
    name: String,
    chunks: u64,
    bytes: u64,
    ready: ReadySignal,
}

impl LogBucket {
    /// Create a new LogBucket with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: 0,
            bytes: 0,
            ready: ReadySignal::new(),
        }
    }

    fn log_chunk_summary(&self, chunk: &Chunk) {
        info!(
            bucket = %self.name,
            seq = self.chunks,
            bytes = chunk.len(),
            encoding = %chunk.encoding,
            "Chunk received"
        );
    }
}

impl Bucket for LogBucket {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_bucket_write",
        skip(self, chunk),
        fields(bucket = %self.name, bytes = chunk.len())
    )]
    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError> {
        self.log_chunk_summary(chunk);
        self.chunks += 1;
        self.bytes += chunk.len() as u64;
        Ok(WriteAck::Accepted)
    }

    #[instrument(name = "log_bucket_end", skip(self))]
    fn end(&mut self) -> Result<(), ContractError> {
        info!(
            bucket = %self.name,
            chunks = self.chunks,
            bytes = self.bytes,
            "LogBucket ended"
        );
        Ok(())
    }

    fn ready_signal(&self) -> ReadySignal {
        // Never answers with backpressure
        self.ready.clone()
    }
}
