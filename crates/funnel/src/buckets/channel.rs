//! ChannelBucket - forwards chunks into a bounded tokio channel

use contracts::{Bucket, Chunk, ContractError, ReadySignal, WriteAck};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Bucket feeding a bounded `mpsc` channel
///
/// When the channel is full the chunk is parked on a background task that
/// waits for space, and the write answers with backpressure. The ready
/// signal fires once the parked chunk is in the channel, so chunk order is
/// kept. The receiver sees the channel close after `end()`.
///
/// Writes that would park need a tokio runtime.
pub struct ChannelBucket {
    name: String,
    tx: Option<mpsc::Sender<Chunk>>,
    ready: ReadySignal,
}

impl ChannelBucket {
    /// Create a bucket and the receiving end of its channel
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Chunk>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }

    /// Wrap an existing sender
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<Chunk>) -> Self {
        Self {
            name: name.into(),
            tx: Some(tx),
            ready: ReadySignal::new(),
        }
    }

    fn park(&self, tx: mpsc::Sender<Chunk>, chunk: Chunk) -> Result<WriteAck, ContractError> {
        let runtime = Handle::try_current().map_err(|_| {
            ContractError::bucket_write(&self.name, "channel full and no tokio runtime to wait on")
        })?;

        let ready = self.ready.clone();
        let name = self.name.clone();
        runtime.spawn(async move {
            if tx.send(chunk).await.is_err() {
                warn!(bucket = %name, "Receiver dropped while a chunk was parked");
            }
            ready.signal();
        });

        debug!(bucket = %self.name, "Channel full, chunk parked");
        Ok(WriteAck::Backpressure)
    }
}

impl Bucket for ChannelBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ContractError::bucket_ended(&self.name))?;

        match tx.try_send(chunk.clone()) {
            Ok(()) => Ok(WriteAck::Accepted),
            Err(mpsc::error::TrySendError::Full(chunk)) => self.park(tx.clone(), chunk),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ContractError::bucket_write(
                &self.name,
                "receiver dropped",
            )),
        }
    }

    fn end(&mut self) -> Result<(), ContractError> {
        // A parked chunk still holds a sender; the channel closes after it lands
        self.tx = None;
        Ok(())
    }

    fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_channel_bucket_forwards() {
        let (mut bucket, mut rx) = ChannelBucket::channel("chan", 4);

        assert_eq!(bucket.write(&Chunk::text("a")).unwrap(), WriteAck::Accepted);
        bucket.end().unwrap();

        assert_eq!(rx.recv().await, Some(Chunk::text("a")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_full_channel_parks_and_signals() {
        let (mut bucket, mut rx) = ChannelBucket::channel("chan", 1);
        let ready = bucket.ready_signal();

        assert_eq!(bucket.write(&Chunk::text("a")).unwrap(), WriteAck::Accepted);
        let generation = ready.generation();
        assert_eq!(
            bucket.write(&Chunk::text("b")).unwrap(),
            WriteAck::Backpressure
        );

        assert_eq!(rx.recv().await, Some(Chunk::text("a")));
        tokio::time::timeout(Duration::from_millis(200), ready.ready_after(generation))
            .await
            .expect("parked chunk should land");
        assert_eq!(rx.recv().await, Some(Chunk::text("b")));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_write_error() {
        let (mut bucket, rx) = ChannelBucket::channel("chan", 1);
        drop(rx);
        assert!(matches!(
            bucket.write(&Chunk::text("a")),
            Err(ContractError::BucketWrite { .. })
        ));
    }

    #[test]
    fn test_park_without_runtime_is_write_error() {
        let (mut bucket, _rx) = ChannelBucket::channel("chan", 1);
        bucket.write(&Chunk::text("a")).unwrap();
        assert!(bucket.write(&Chunk::text("b")).is_err());
    }
}
