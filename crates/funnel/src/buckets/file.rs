//! FileBucket - appends chunk payloads to a file

use chrono::Utc;
use contracts::{Bucket, Chunk, ContractError, ReadySignal, WriteAck};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileBucket
#[derive(Debug, Clone)]
pub struct FileBucketConfig {
    /// Output file
    pub path: PathBuf,
    /// Buffered bytes that trigger a flush
    pub high_water_mark: usize,
}

impl FileBucketConfig {
    /// Create config from params map
    ///
    /// A `{timestamp}` placeholder in `path` is replaced with the current
    /// UTC time, so one config entry can produce a fresh segment per bucket.
    pub fn from_params(
        params: &HashMap<String, String>,
        high_water_mark: usize,
    ) -> Result<Self, ContractError> {
        let path = params.get("path").map(|p| expand_path(p)).ok_or_else(|| {
            ContractError::config_validation("params.path", "file bucket requires a path")
        })?;

        Ok(Self {
            path,
            high_water_mark,
        })
    }
}

const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

fn expand_path(raw: &str) -> PathBuf {
    if !raw.contains(TIMESTAMP_PLACEHOLDER) {
        return PathBuf::from(raw);
    }
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    PathBuf::from(raw.replace(TIMESTAMP_PLACEHOLDER, &stamp))
}

/// Bucket that appends raw chunk bytes to a file
///
/// Writes are buffered in memory and flushed once the high-water mark is
/// crossed, and on `end()`. Flushing is synchronous, so this bucket never
/// answers with backpressure.
pub struct FileBucket {
    name: String,
    config: FileBucketConfig,
    file: Option<File>,
    pending: Vec<u8>,
    written: u64,
    ready: ReadySignal,
}

impl FileBucket {
    /// Create a new FileBucket, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileBucketConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            pending: Vec::with_capacity(config.high_water_mark),
            config,
            file: Some(file),
            written: 0,
            ready: ReadySignal::new(),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        high_water_mark: usize,
    ) -> Result<Self, ContractError> {
        let config = FileBucketConfig::from_params(params, high_water_mark)?;
        Ok(Self::new(name, config)?)
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Bytes flushed to disk so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn flush_pending(&mut self) -> std::io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let file = self.file.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "file bucket already ended")
        })?;
        file.write_all(&self.pending)?;
        self.written += self.pending.len() as u64;
        debug!(bucket = %self.name, bytes = self.pending.len(), "Flushed");
        self.pending.clear();
        Ok(())
    }
}

impl Bucket for FileBucket {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_bucket_write",
        skip(self, chunk),
        fields(bucket = %self.name, bytes = chunk.len())
    )]
    fn write(&mut self, chunk: &Chunk) -> Result<WriteAck, ContractError> {
        if self.file.is_none() {
            return Err(ContractError::bucket_ended(&self.name));
        }

        let before = self.pending.len();
        self.pending.extend_from_slice(&chunk.data);
        if self.pending.len() >= self.config.high_water_mark {
            if let Err(e) = self.flush_pending() {
                // The chunk is handed back to the funnel, so drop its bytes
                self.pending.truncate(before);
                error!(bucket = %self.name, error = %e, "Flush failed");
                return Err(ContractError::bucket_write(&self.name, e.to_string()));
            }
        }
        Ok(WriteAck::Accepted)
    }

    #[instrument(name = "file_bucket_end", skip(self), fields(bucket = %self.name))]
    fn end(&mut self) -> Result<(), ContractError> {
        self.flush_pending()?;
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        debug!(
            bucket = %self.name,
            path = %self.config.path.display(),
            written = self.written,
            "FileBucket ended"
        );
        Ok(())
    }

    fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_bucket_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segments").join("seg-0.log");
        let config = FileBucketConfig {
            path: path.clone(),
            high_water_mark: 4,
        };

        let mut bucket = FileBucket::new("seg-0", config).unwrap();
        bucket.write(&Chunk::text("ab")).unwrap();
        bucket.write(&Chunk::text("cd")).unwrap();
        assert_eq!(bucket.written(), 4);
        bucket.write(&Chunk::text("e")).unwrap();
        bucket.end().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abcde");
        assert_eq!(bucket.written(), 5);
    }

    #[test]
    fn test_write_after_end_fails() {
        let dir = TempDir::new().unwrap();
        let config = FileBucketConfig {
            path: dir.path().join("x.log"),
            high_water_mark: 1024,
        };
        let mut bucket = FileBucket::new("x", config).unwrap();
        bucket.end().unwrap();

        assert!(matches!(
            bucket.write(&Chunk::text("late")),
            Err(ContractError::BucketEnded { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_flush_does_not_keep_chunk() {
        let config = FileBucketConfig {
            path: PathBuf::from("/dev/full"),
            high_water_mark: 4,
        };
        let mut bucket = FileBucket::new("full", config).unwrap();

        assert_eq!(bucket.write(&Chunk::text("ab")).unwrap(), WriteAck::Accepted);
        assert_eq!(bucket.buffered(), 2);

        assert!(matches!(
            bucket.write(&Chunk::text("cd")),
            Err(ContractError::BucketWrite { .. })
        ));
        assert_eq!(bucket.buffered(), 2);
        assert_eq!(bucket.written(), 0);

        // A retry of the same chunk fails the same way without growing the buffer
        assert!(bucket.write(&Chunk::text("cd")).is_err());
        assert_eq!(bucket.buffered(), 2);
    }

    #[test]
    fn test_from_params_expands_timestamp() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("seg-{timestamp}.log");
        let params = HashMap::from([("path".to_string(), raw.display().to_string())]);

        let bucket = FileBucket::from_params("seg", &params, 16).unwrap();
        let name = bucket.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("seg-2"));
        assert!(!name.contains("{timestamp}"));
        assert!(bucket.path().exists());
    }

    #[test]
    fn test_from_params_requires_path() {
        let params = HashMap::new();
        let result = FileBucket::from_params("no_path", &params, 1024);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }
}
