//! Funnel error types

use thiserror::Error;

/// Funnel-specific errors
#[derive(Debug, Error)]
pub enum FunnelError {
    /// Operation after terminate
    #[error("funnel '{funnel}' is terminated")]
    Terminated { funnel: String },

    /// Bounded buffer refused a chunk
    #[error("ingest buffer full for funnel '{funnel}': depth={depth}, max={max}")]
    BufferFull {
        funnel: String,
        depth: usize,
        max: usize,
    },

    /// Shutoff predicate failed; the chunk under evaluation stays queued
    #[error("shutoff valve failed in funnel '{funnel}': {source}")]
    Valve {
        funnel: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Bucket write failed; the chunk was put back at the head
    #[error("bucket '{bucket}' write failed: {source}")]
    BucketWrite {
        bucket: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Bucket end failed; the bucket was detached regardless
    #[error("bucket '{bucket}' end failed: {source}")]
    BucketEnd {
        bucket: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Subscription to an event the funnel does not emit
    #[error("unknown funnel event '{0}'")]
    UnknownEvent(String),

    /// Driver task is gone
    #[error("funnel driver '{funnel}' is not running")]
    DriverClosed { funnel: String },

    /// Configuration or bucket construction error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FunnelError {
    /// Create a terminated error
    pub fn terminated(funnel: impl Into<String>) -> Self {
        Self::Terminated {
            funnel: funnel.into(),
        }
    }

    /// Create a driver-closed error
    pub fn driver_closed(funnel: impl Into<String>) -> Self {
        Self::DriverClosed {
            funnel: funnel.into(),
        }
    }
}
