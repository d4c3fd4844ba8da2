//! Funnel configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Complete funnel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FunnelConfig {
    /// Funnel name (used for logging/metrics)
    #[serde(default = "default_funnel_name")]
    #[validate(length(min = 1, message = "funnel name cannot be empty"))]
    pub name: String,

    /// Ingest buffer configuration
    #[serde(default)]
    #[validate(nested)]
    pub buffer: BufferConfig,

    /// Logging / metrics settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Buckets to fill, in order
    #[serde(default)]
    #[validate(nested)]
    pub buckets: Vec<BucketConfig>,
}

fn default_funnel_name() -> String {
    "funnel".to_string()
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            name: default_funnel_name(),
            buffer: BufferConfig::default(),
            telemetry: TelemetryConfig::default(),
            buckets: Vec::new(),
        }
    }
}

/// Ingest buffer configuration
///
/// Unbounded unless `max_chunks` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BufferConfig {
    /// Maximum number of retained chunks
    #[serde(default)]
    #[validate(range(min = 1, message = "max_chunks must be >= 1"))]
    pub max_chunks: Option<usize>,

    /// What to do when the buffer is full
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

/// Strategy for a full ingest buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the incoming chunk
    #[default]
    Reject,
    /// Evict the oldest retained chunk
    DropOldest,
}

/// Logging and metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormatKind,

    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormatKind::default(),
            log_level: default_log_level(),
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatKind {
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Bucket configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BucketConfig {
    /// Bucket name
    #[validate(length(min = 1, message = "bucket name cannot be empty"))]
    pub name: String,

    /// Bucket type
    pub bucket_type: BucketType,

    /// Bytes a bucket may hold in memory before flushing
    #[serde(default = "default_high_water_mark")]
    #[validate(range(min = 1, message = "high_water_mark must be >= 1"))]
    pub high_water_mark: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_high_water_mark() -> usize {
    16 * 1024
}

/// Bucket type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketType {
    /// Log summaries via tracing
    Log,
    /// Append to a file
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FunnelConfig::default();
        assert_eq!(config.name, "funnel");
        assert_eq!(config.buffer.max_chunks, None);
        assert_eq!(config.buffer.overflow, OverflowPolicy::Reject);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = FunnelConfig::default();
        config.buffer.max_chunks = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bucket_config_serde() {
        let json = r#"{ "name": "seg", "bucket_type": "file", "params": { "path": "/tmp/x" } }"#;
        let bucket: BucketConfig = serde_json::from_str(json).unwrap();
        assert_eq!(bucket.bucket_type, BucketType::File);
        assert_eq!(bucket.high_water_mark, 16 * 1024);
        assert_eq!(bucket.params.get("path").map(String::as_str), Some("/tmp/x"));
    }
}
