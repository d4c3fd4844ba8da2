//! Bucket implementations
//!
//! Contains LogBucket, FileBucket, ChannelBucket and MemoryBucket.

mod channel;
mod file;
mod log;
mod memory;

pub use self::channel::ChannelBucket;
pub use self::file::{FileBucket, FileBucketConfig};
pub use self::log::LogBucket;
pub use self::memory::MemoryBucket;

use contracts::{Bucket, BucketConfig, BucketType};
use tracing::instrument;

use crate::error::FunnelError;

/// Boxed bucket, as built from configuration
pub type DynBucket = Box<dyn Bucket + Send>;

/// Create a bucket from configuration
#[instrument(
    name = "funnel_create_bucket",
    skip(config),
    fields(bucket = %config.name, bucket_type = ?config.bucket_type)
)]
pub fn create_bucket(config: &BucketConfig) -> Result<DynBucket, FunnelError> {
    match config.bucket_type {
        BucketType::Log => Ok(Box::new(LogBucket::new(&config.name))),
        BucketType::File => {
            let bucket =
                FileBucket::from_params(&config.name, &config.params, config.high_water_mark)?;
            Ok(Box::new(bucket))
        }
    }
}
