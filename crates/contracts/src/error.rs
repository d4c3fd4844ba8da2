//! Layered error definitions
//!
//! Categorized by source: config / valve / bucket

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Valve Errors =====
    /// Shutoff predicate failed
    #[error("shutoff valve failed: {message}")]
    ValveFailed { message: String },

    // ===== Bucket Errors =====
    /// Bucket write error
    #[error("bucket '{bucket}' write error: {message}")]
    BucketWrite { bucket: String, message: String },

    /// Bucket write after end
    #[error("bucket '{bucket}' already ended")]
    BucketEnded { bucket: String },

    // ===== Data Errors =====
    /// Unknown encoding tag
    #[error("unknown encoding '{name}'")]
    UnknownEncoding { name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create valve failure
    pub fn valve(message: impl Into<String>) -> Self {
        Self::ValveFailed {
            message: message.into(),
        }
    }

    /// Create bucket write error
    pub fn bucket_write(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BucketWrite {
            bucket: bucket.into(),
            message: message.into(),
        }
    }

    /// Create write-after-end error
    pub fn bucket_ended(bucket: impl Into<String>) -> Self {
        Self::BucketEnded {
            bucket: bucket.into(),
        }
    }

    /// Create unknown encoding error
    pub fn unknown_encoding(name: impl Into<String>) -> Self {
        Self::UnknownEncoding { name: name.into() }
    }
}
