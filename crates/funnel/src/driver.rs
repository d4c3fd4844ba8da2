//! FunnelDriver - runs a funnel on a tokio task
//!
//! The driver owns the funnel and multiplexes three event sources:
//! control commands from [`FunnelHandle`]s, the attached bucket's ready
//! signal, and the upstream. The upstream is only polled while the funnel's
//! ingestion gate is open and the buffer has room, which is how bucket
//! backpressure reaches the producer.

use std::sync::Arc;

use contracts::{Bucket, Chunk, ReadySignal, ShutoffValve, Upstream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::FunnelError;
use crate::funnel::Funnel;
use crate::metrics::{FunnelMetrics, MetricsSnapshot};

/// Control messages accepted by a running driver
#[derive(Debug)]
pub enum FunnelCommand<B> {
    /// Cap the current bucket and fill this one
    Attach(B),
    /// Cap the current bucket
    Detach,
    /// Stop reading the upstream and terminate
    Terminate,
}

/// Cloneable control handle for a running driver
pub struct FunnelHandle<B> {
    name: Arc<str>,
    tx: mpsc::Sender<FunnelCommand<B>>,
    metrics: Arc<FunnelMetrics>,
}

impl<B> Clone for FunnelHandle<B> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B> FunnelHandle<B> {
    /// Funnel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared funnel counters
    pub fn metrics(&self) -> &Arc<FunnelMetrics> {
        &self.metrics
    }

    /// Attach a bucket
    pub async fn attach(&self, bucket: B) -> Result<(), FunnelError> {
        self.send(FunnelCommand::Attach(bucket)).await
    }

    /// Detach the current bucket
    pub async fn detach(&self) -> Result<(), FunnelError> {
        self.send(FunnelCommand::Detach).await
    }

    /// Terminate the funnel
    pub async fn terminate(&self) -> Result<(), FunnelError> {
        self.send(FunnelCommand::Terminate).await
    }

    async fn send(&self, command: FunnelCommand<B>) -> Result<(), FunnelError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| FunnelError::driver_closed(self.name.as_ref()))
    }
}

/// Why the driver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Upstream produced its last chunk
    UpstreamFinished,
    /// A handle asked for termination
    Terminated,
    /// Every handle was dropped while nothing could make progress
    Abandoned,
}

/// Final report of a driver run
#[derive(Debug)]
pub struct DriverReport {
    pub reason: StopReason,
    /// Chunks that never reached a bucket
    pub stranded: Vec<Chunk>,
    pub metrics: MetricsSnapshot,
}

/// Async driver for a [`Funnel`]
pub struct FunnelDriver<B, V, U> {
    funnel: Funnel<B, V>,
    upstream: U,
    commands: mpsc::Receiver<FunnelCommand<B>>,
}

impl<B, V, U> FunnelDriver<B, V, U>
where
    B: Bucket + Send + 'static,
    V: ShutoffValve + Send + 'static,
    U: Upstream + Send + 'static,
{
    /// Wrap a funnel and its upstream; returns the driver and a control handle
    pub fn new(
        funnel: Funnel<B, V>,
        upstream: U,
        command_capacity: usize,
    ) -> (Self, FunnelHandle<B>) {
        let (tx, commands) = mpsc::channel(command_capacity.max(1));
        let handle = FunnelHandle {
            name: Arc::from(funnel.name()),
            tx,
            metrics: Arc::clone(funnel.metrics()),
        };

        (
            Self {
                funnel,
                upstream,
                commands,
            },
            handle,
        )
    }

    /// Run until the upstream ends, a handle terminates, or an error
    ///
    /// Once the upstream ends the driver keeps waiting for a pending ready
    /// signal, so a bucket in backpressure still receives the rest of the
    /// buffer before the final cap. The upstream must be cancel safe.
    ///
    /// # Errors
    /// Valve, bucket and buffer failures stop the driver and are returned
    /// as-is.
    #[instrument(name = "funnel_driver_run", skip(self), fields(funnel = %self.funnel.name()))]
    pub async fn run(self) -> Result<DriverReport, FunnelError> {
        let Self {
            mut funnel,
            mut upstream,
            mut commands,
        } = self;

        info!(funnel = %funnel.name(), upstream = %upstream.name(), "Funnel driver started");

        let mut commands_open = true;
        let mut upstream_done = false;

        let reason = loop {
            let ready = funnel.awaited_readiness();
            if upstream_done && ready.is_none() {
                break StopReason::UpstreamFinished;
            }
            let pull = !upstream_done && funnel.gate().is_open() && funnel.has_capacity();

            tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(FunnelCommand::Attach(bucket)) => funnel.attach(bucket)?,
                    Some(FunnelCommand::Detach) => {
                        funnel.detach()?;
                    }
                    Some(FunnelCommand::Terminate) => break StopReason::Terminated,
                    None => {
                        debug!(funnel = %funnel.name(), "All handles dropped");
                        commands_open = false;
                    }
                },

                _ = wait_ready(ready.clone()), if ready.is_some() => funnel.drained()?,

                chunk = upstream.next_chunk(), if pull => match chunk {
                    Some(chunk) => funnel.ingest(chunk)?,
                    None => {
                        debug!(funnel = %funnel.name(), pending = funnel.pending(), "Upstream finished");
                        upstream_done = true;
                    }
                },

                else => break StopReason::Abandoned,
            }
        };

        let termination = funnel.terminate().inspect_err(|e| {
            error!(funnel = %funnel.name(), error = %e, "Final cap failed");
        })?;
        let metrics = funnel.metrics().snapshot();
        let stranded = funnel.into_stranded();

        info!(
            reason = ?reason,
            stranded = termination.stranded,
            delivered = metrics.delivered_count,
            "Funnel driver stopped"
        );

        Ok(DriverReport {
            reason,
            stranded,
            metrics,
        })
    }

    /// Spawn the driver as a background task
    pub fn spawn(self) -> JoinHandle<Result<DriverReport, FunnelError>> {
        tokio::spawn(self.run())
    }
}

async fn wait_ready(awaited: Option<(ReadySignal, u64)>) {
    if let Some((signal, generation)) = awaited {
        signal.ready_after(generation).await;
    }
}
