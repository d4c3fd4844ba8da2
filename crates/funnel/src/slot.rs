//! Bucket slot - holds the bucket currently being filled.

use contracts::Bucket;

/// Single-occupancy holder for the active bucket
#[derive(Debug)]
pub struct BucketSlot<B> {
    bucket: Option<B>,
}

impl<B> Default for BucketSlot<B> {
    fn default() -> Self {
        Self { bucket: None }
    }
}

impl<B: Bucket> BucketSlot<B> {
    /// Create an empty slot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Place a bucket into the slot, returning the displaced occupant
    pub fn replace(&mut self, bucket: B) -> Option<B> {
        self.bucket.replace(bucket)
    }

    /// Take the current bucket out
    #[inline]
    pub fn take(&mut self) -> Option<B> {
        self.bucket.take()
    }

    /// Current bucket
    #[inline]
    pub fn get(&self) -> Option<&B> {
        self.bucket.as_ref()
    }

    /// Current bucket, mutably
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut B> {
        self.bucket.as_mut()
    }

    /// Whether a bucket is present
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.bucket.is_some()
    }

    /// Name of the current bucket
    pub fn name(&self) -> Option<&str> {
        self.bucket.as_ref().map(|bucket| bucket.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::LogBucket;

    #[test]
    fn test_slot_single_occupancy() {
        let mut slot = BucketSlot::empty();
        assert!(!slot.is_occupied());

        assert!(slot.replace(LogBucket::new("first")).is_none());
        let displaced = slot.replace(LogBucket::new("second")).unwrap();
        assert_eq!(displaced.name(), "first");
        assert_eq!(slot.name(), Some("second"));

        let taken = slot.take().unwrap();
        assert_eq!(taken.name(), "second");
        assert!(slot.get().is_none());
        assert!(!slot.is_occupied());
    }
}
