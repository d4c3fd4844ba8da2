//! # Funnel
//!
//! Dynamic stream funnel.
//!
//! Responsibilities:
//! - Retain upstream chunks in arrival order while no bucket is attached
//! - Fill one swappable bucket at a time
//! - Cap the bucket when the shutoff valve fires, raising `shutoff` once
//! - Suspend the upstream while the bucket pushes back
//!
//! ## Example
//!
//! ```
//! use funnel::{Chunk, Funnel, FunnelEvent, MemoryBucket};
//!
//! let mut funnel = Funnel::new("demo");
//! funnel.subscribe(FunnelEvent::Shutoff, || println!("need a bucket"));
//!
//! funnel.ingest(Chunk::text("a")).unwrap();
//!
//! let bucket = MemoryBucket::new("first");
//! funnel.attach(bucket.clone()).unwrap();
//! assert_eq!(bucket.received_text(), vec!["a"]);
//! ```

pub mod buckets;
pub mod driver;
pub mod error;
pub mod events;
pub mod funnel;
pub mod metrics;

mod buffer;
mod gate;
mod slot;
mod valve;

pub use buckets::{
    create_bucket, ChannelBucket, DynBucket, FileBucket, FileBucketConfig, LogBucket,
    MemoryBucket,
};
pub use contracts::{
    try_valve, Bucket, ByteBudget, ChannelUpstream, Chunk, Encoding, NeverShutoff, ReadySignal,
    ShutoffValve, Upstream, WriteAck,
};
pub use driver::{DriverReport, FunnelCommand, FunnelDriver, FunnelHandle, StopReason};
pub use error::FunnelError;
pub use events::{FunnelEvent, SubscriptionId};
pub use funnel::{BucketFill, Funnel, FunnelState, Termination};
pub use gate::IngestionGate;
pub use metrics::{FunnelMetrics, MetricsSnapshot};
