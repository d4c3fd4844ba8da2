//! Funnel - routes one upstream into a sequence of swappable buckets
//!
//! The flow controller owns every piece of funnel state: the ingest buffer,
//! the bucket slot, the latched shutoff valve, the ingestion gate and the
//! event channel. All transitions run to completion on the caller's thread.

use std::fmt;
use std::sync::Arc;

use contracts::{Bucket, Chunk, FunnelConfig, NeverShutoff, ReadySignal, ShutoffValve, WriteAck};
use observability::metrics as telemetry;
use tracing::{debug, error, info, instrument, warn};

use crate::buffer::{IngestBuffer, PushOutcome};
use crate::error::FunnelError;
use crate::events::{EventChannel, FunnelEvent, SubscriptionId};
use crate::gate::IngestionGate;
use crate::metrics::FunnelMetrics;
use crate::slot::BucketSlot;
use crate::valve::LatchedValve;

/// Flow controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FunnelState {
    /// No bucket attached; chunks are retained
    #[default]
    NoBucket,
    /// Bucket attached, delivering
    Filling,
    /// Bucket answered with backpressure; waiting for its ready signal
    AwaitingReadiness,
    /// Terminated; no further attach or ingest
    Terminated,
}

impl fmt::Display for FunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoBucket => "no_bucket",
            Self::Filling => "filling",
            Self::AwaitingReadiness => "awaiting_readiness",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Result of [`Funnel::terminate`]
#[derive(Debug)]
pub struct Termination<B> {
    /// The bucket that was capped, if one was attached
    pub bucket: Option<B>,
    /// Chunks left in the buffer that no bucket will ever receive
    pub stranded: usize,
}

impl<B> Termination<B> {
    /// Whether every ingested chunk reached a bucket
    pub fn is_clean(&self) -> bool {
        self.stranded == 0
    }
}

/// Fill progress of the attached bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketFill {
    pub chunks: u64,
    pub bytes: u64,
}

/// Dynamic stream funnel
///
/// Chunks pushed with [`ingest`](Self::ingest) are delivered in order to the
/// bucket currently attached with [`attach`](Self::attach). Without a bucket
/// they are retained. The shutoff valve is checked before every delivery;
/// when it fires the bucket is capped and the chunk waits for the next one.
pub struct Funnel<B, V = NeverShutoff> {
    name: String,
    state: FunnelState,
    buffer: IngestBuffer,
    slot: BucketSlot<B>,
    valve: LatchedValve<V>,
    gate: IngestionGate,
    events: EventChannel,
    fill: BucketFill,
    /// Ready-signal generation seen just before the backpressured write
    ready_after: Option<u64>,
    metrics: Arc<FunnelMetrics>,
}

impl<B, V> fmt::Debug for Funnel<B, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Funnel")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("gate", &self.gate)
            .field("buffer", &self.buffer)
            .field("events", &self.events)
            .finish()
    }
}

impl<B: Bucket> Funnel<B, NeverShutoff> {
    /// Create a funnel whose valve never shuts off
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_valve(name, NeverShutoff)
    }
}

impl<B: Bucket, V: ShutoffValve> Funnel<B, V> {
    /// Create a funnel with a custom shutoff valve
    pub fn with_valve(name: impl Into<String>, valve: V) -> Self {
        Self::with_buffer(name.into(), IngestBuffer::unbounded(), valve)
    }

    /// Create a funnel from configuration
    pub fn from_config(config: &FunnelConfig, valve: V) -> Self {
        Self::with_buffer(
            config.name.clone(),
            IngestBuffer::from_config(&config.buffer),
            valve,
        )
    }

    fn with_buffer(name: String, buffer: IngestBuffer, valve: V) -> Self {
        Self {
            name,
            state: FunnelState::NoBucket,
            buffer,
            slot: BucketSlot::empty(),
            valve: LatchedValve::new(valve),
            gate: IngestionGate::Open,
            events: EventChannel::new(),
            fill: BucketFill::default(),
            ready_after: None,
            metrics: Arc::new(FunnelMetrics::new()),
        }
    }

    // ===== Read-only views =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> FunnelState {
        self.state
    }

    /// The bucket being filled, if any
    pub fn current_bucket(&self) -> Option<&B> {
        self.slot.get()
    }

    /// True iff a bucket is attached
    pub fn is_filling(&self) -> bool {
        self.slot.is_occupied()
    }

    /// True iff "shutoff" fired since the last attach/detach
    pub fn is_shutoff_latched(&self) -> bool {
        self.valve.is_latched()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == FunnelState::Terminated
    }

    /// Whether the upstream may push
    pub fn gate(&self) -> IngestionGate {
        self.gate
    }

    pub fn is_ingestion_suspended(&self) -> bool {
        !self.gate.is_open()
    }

    /// Number of chunks waiting for delivery
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Chunks waiting for delivery, next-to-deliver first
    pub fn pending_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.buffer.iter()
    }

    /// Whether another chunk fits in the buffer without hitting the
    /// capacity policy
    pub fn has_capacity(&self) -> bool {
        self.buffer
            .max_chunks()
            .is_none_or(|max| self.buffer.len() < max)
    }

    /// The ready signal to wait on and the generation it must move past
    ///
    /// `Some` only while awaiting readiness. Signals fired before the write
    /// that answered with backpressure do not count.
    pub fn awaited_readiness(&self) -> Option<(ReadySignal, u64)> {
        if self.state != FunnelState::AwaitingReadiness {
            return None;
        }
        let generation = self.ready_after?;
        self.slot
            .get()
            .map(|bucket| (bucket.ready_signal(), generation))
    }

    /// Progress of the attached bucket
    pub fn bucket_fill(&self) -> BucketFill {
        self.fill
    }

    pub fn metrics(&self) -> &Arc<FunnelMetrics> {
        &self.metrics
    }

    /// Consume the funnel, returning the chunks it still holds
    pub fn into_stranded(mut self) -> Vec<Chunk> {
        self.buffer.drain_all()
    }

    // ===== Events =====

    /// Register a handler for `event`
    pub fn subscribe<F>(&mut self, event: FunnelEvent, handler: F) -> SubscriptionId
    where
        F: FnMut() + Send + 'static,
    {
        self.events.subscribe(event, handler)
    }

    /// Register a handler by event name
    pub fn subscribe_named<F>(
        &mut self,
        event: &str,
        handler: F,
    ) -> Result<SubscriptionId, FunnelError>
    where
        F: FnMut() + Send + 'static,
    {
        let event = event.parse::<FunnelEvent>()?;
        Ok(self.events.subscribe(event, handler))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ===== Transitions =====

    /// Cap the current bucket (if any) and start filling `bucket`
    ///
    /// A failure to end the previous bucket is logged, not returned: the new
    /// bucket is attached regardless.
    ///
    /// # Errors
    /// - `Terminated` after [`terminate`](Self::terminate)
    /// - valve or write failures from delivering buffered chunks
    #[instrument(
        name = "funnel_attach",
        skip(self, bucket),
        fields(funnel = %self.name, bucket = %bucket.name())
    )]
    pub fn attach(&mut self, bucket: B) -> Result<(), FunnelError> {
        self.ensure_live()?;

        if let Err(e) = self.cap() {
            error!(funnel = %self.name, error = %e, "Previous bucket failed to end");
        }

        telemetry::record_bucket_attached(&self.name, bucket.name());
        info!(
            funnel = %self.name,
            bucket = %bucket.name(),
            pending = self.buffer.len(),
            "Bucket attached"
        );

        let displaced = self.slot.replace(bucket);
        debug_assert!(displaced.is_none(), "cap leaves the slot empty");

        self.fill = BucketFill::default();
        self.valve.reset();
        self.gate = IngestionGate::Open;
        self.state = FunnelState::Filling;
        self.metrics.inc_attach_count();

        self.flow()
    }

    /// Cap the current bucket without attaching another
    ///
    /// Returns the capped bucket. The shutoff latch is reset even when no
    /// bucket was attached.
    ///
    /// # Errors
    /// `BucketEnd` if the bucket failed to end; it is detached regardless.
    #[instrument(name = "funnel_detach", skip(self), fields(funnel = %self.name))]
    pub fn detach(&mut self) -> Result<Option<B>, FunnelError> {
        self.cap()
    }

    /// Push one chunk from the upstream
    ///
    /// The chunk is appended to the buffer, then as much of the buffer as the
    /// current bucket takes is delivered.
    ///
    /// # Errors
    /// - `Terminated` after [`terminate`](Self::terminate); nothing is stored
    /// - `BufferFull` if the capacity policy refuses the chunk
    /// - `Valve` / `BucketWrite` from the delivery loop; the chunk stays
    ///   buffered and [`flow`](Self::flow) retries
    pub fn ingest(&mut self, chunk: Chunk) -> Result<(), FunnelError> {
        self.ensure_live()?;

        let bytes = chunk.len();
        match self.buffer.push(chunk) {
            PushOutcome::Stored => {}
            PushOutcome::Evicted(oldest) => {
                self.metrics.inc_dropped_count();
                telemetry::record_chunks_dropped(&self.name, "drop_oldest");
                warn!(
                    funnel = %self.name,
                    bytes = oldest.len(),
                    "Ingest buffer full, oldest chunk dropped"
                );
            }
            PushOutcome::Rejected(_) => {
                self.metrics.inc_dropped_count();
                telemetry::record_chunks_dropped(&self.name, "rejected");
                return Err(FunnelError::BufferFull {
                    funnel: self.name.clone(),
                    depth: self.buffer.len(),
                    max: self.buffer.max_chunks().unwrap_or_default(),
                });
            }
        }

        self.metrics.inc_ingested_count();
        telemetry::record_chunk_ingested(&self.name, bytes);

        self.flow()
    }

    /// The current bucket can take writes again
    ///
    /// A no-op unless the funnel is waiting for readiness.
    pub fn drained(&mut self) -> Result<(), FunnelError> {
        if self.state != FunnelState::AwaitingReadiness {
            return Ok(());
        }

        debug!(funnel = %self.name, "Bucket ready, resuming");
        self.ready_after = None;
        self.state = FunnelState::Filling;
        self.gate = IngestionGate::Open;
        self.flow()
    }

    /// Cap the current bucket for good
    ///
    /// Chunks still buffered are reported as stranded rather than dropped;
    /// they can be recovered with [`into_stranded`](Self::into_stranded).
    ///
    /// # Errors
    /// - `Terminated` if already terminated
    /// - `BucketEnd` if the final bucket failed to end; the funnel is
    ///   terminated regardless
    #[instrument(name = "funnel_terminate", skip(self), fields(funnel = %self.name))]
    pub fn terminate(&mut self) -> Result<Termination<B>, FunnelError> {
        self.ensure_live()?;

        self.state = FunnelState::Terminated;
        let bucket = self.cap()?;

        let stranded = self.buffer.len();
        telemetry::record_stranded(&self.name, stranded);
        if stranded > 0 {
            warn!(
                funnel = %self.name,
                stranded,
                bytes = self.buffer.retained_bytes(),
                "Funnel terminated with undelivered chunks"
            );
        } else {
            info!(funnel = %self.name, "Funnel terminated");
        }

        Ok(Termination { bucket, stranded })
    }

    /// Run the delivery loop
    ///
    /// Called after every ingest, attach and readiness signal; call it
    /// directly to retry after a valve or write failure.
    pub fn flow(&mut self) -> Result<(), FunnelError> {
        match self.state {
            FunnelState::Terminated | FunnelState::AwaitingReadiness => return Ok(()),
            FunnelState::NoBucket => {
                if !self.buffer.is_empty() {
                    self.emit_shutoff();
                }
                self.sync_depth();
                return Ok(());
            }
            FunnelState::Filling => {}
        }

        let result = self.deliver();
        self.sync_depth();
        result
    }

    fn deliver(&mut self) -> Result<(), FunnelError> {
        while let Some(head) = self.buffer.peek() {
            let shutoff = self
                .valve
                .evaluate(head)
                .map_err(|source| FunnelError::Valve {
                    funnel: self.name.clone(),
                    source,
                })?;

            if shutoff {
                // Head stays queued for the next bucket
                self.metrics.inc_requeued_count();
                info!(
                    funnel = %self.name,
                    bucket = self.slot.name().unwrap_or_default(),
                    pending = self.buffer.len(),
                    "Shutoff valve closed, capping bucket"
                );
                let capped = self.cap();
                self.emit_shutoff();
                return capped.map(|_| ());
            }

            let Some(chunk) = self.buffer.pop() else {
                break;
            };
            let Some(bucket) = self.slot.get_mut() else {
                self.buffer.requeue(chunk);
                break;
            };

            let generation = bucket.ready_signal().generation();
            match bucket.write(&chunk) {
                Ok(ack) => {
                    self.valve.delivered(&chunk);
                    self.fill.chunks += 1;
                    self.fill.bytes += chunk.len() as u64;
                    self.metrics.inc_delivered_count();
                    telemetry::record_chunk_delivered(&self.name, bucket.name(), chunk.len());

                    if ack == WriteAck::Backpressure {
                        self.metrics.inc_backpressure_count();
                        telemetry::record_backpressure(&self.name, bucket.name());
                        debug!(
                            funnel = %self.name,
                            bucket = %bucket.name(),
                            pending = self.buffer.len(),
                            "Bucket backpressure, suspending ingestion"
                        );
                        self.gate = IngestionGate::Suspended;
                        self.state = FunnelState::AwaitingReadiness;
                        self.ready_after = Some(generation);
                        return Ok(());
                    }
                }
                Err(source) => {
                    let bucket = bucket.name().to_string();
                    self.buffer.requeue(chunk);
                    self.metrics.inc_requeued_count();
                    error!(
                        funnel = %self.name,
                        bucket = %bucket,
                        error = %source,
                        "Bucket write failed, chunk kept at head"
                    );
                    return Err(FunnelError::BucketWrite { bucket, source });
                }
            }
        }

        Ok(())
    }

    /// Detach and end the current bucket, suspend ingestion, reset the latch
    fn cap(&mut self) -> Result<Option<B>, FunnelError> {
        self.valve.reset();
        self.ready_after = None;

        let Some(mut bucket) = self.slot.take() else {
            return Ok(None);
        };

        self.gate = IngestionGate::Suspended;
        if self.state != FunnelState::Terminated {
            self.state = FunnelState::NoBucket;
        }

        let fill = std::mem::take(&mut self.fill);
        telemetry::record_bucket_capped(&self.name, bucket.name(), fill.chunks, fill.bytes);
        info!(
            funnel = %self.name,
            bucket = %bucket.name(),
            chunks = fill.chunks,
            bytes = fill.bytes,
            "Bucket capped"
        );

        match bucket.end() {
            Ok(()) => Ok(Some(bucket)),
            Err(source) => Err(FunnelError::BucketEnd {
                bucket: bucket.name().to_string(),
                source,
            }),
        }
    }

    fn emit_shutoff(&mut self) {
        if !self.valve.latch() {
            return;
        }

        self.metrics.inc_shutoff_count();
        telemetry::record_shutoff(&self.name);
        warn!(
            funnel = %self.name,
            pending = self.buffer.len(),
            "Shutoff: no bucket to fill"
        );
        self.events.emit(FunnelEvent::Shutoff);
    }

    fn ensure_live(&self) -> Result<(), FunnelError> {
        if self.state == FunnelState::Terminated {
            return Err(FunnelError::terminated(&self.name));
        }
        Ok(())
    }

    fn sync_depth(&self) {
        self.metrics.set_buffer_depth(self.buffer.len());
        telemetry::record_buffer_depth(&self.name, self.buffer.len());
    }
}
