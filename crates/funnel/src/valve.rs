//! Shutoff valve with its notification latch.

use contracts::{Chunk, ContractError, ShutoffValve};

/// A valve plus the latch that keeps "shutoff" to one emission per idle
/// period
#[derive(Debug)]
pub struct LatchedValve<V> {
    valve: V,
    latched: bool,
}

impl<V: ShutoffValve> LatchedValve<V> {
    pub fn new(valve: V) -> Self {
        Self {
            valve,
            latched: false,
        }
    }

    /// Evaluate the predicate for one chunk
    #[inline]
    pub fn evaluate(&self, chunk: &Chunk) -> Result<bool, ContractError> {
        self.valve.shutoff(chunk)
    }

    /// Report a chunk the bucket took
    #[inline]
    pub fn delivered(&self, chunk: &Chunk) {
        self.valve.delivered(chunk);
    }

    /// Set the latch; true if it was not already set
    #[inline]
    pub fn latch(&mut self) -> bool {
        !std::mem::replace(&mut self.latched, true)
    }

    /// Clear the latch (on every attach and detach)
    #[inline]
    pub fn reset(&mut self) {
        self.latched = false;
    }

    #[inline]
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::NeverShutoff;

    #[test]
    fn test_latch_fires_once_until_reset() {
        let mut valve = LatchedValve::new(NeverShutoff);
        assert!(!valve.is_latched());
        assert!(valve.latch());
        assert!(!valve.latch());
        assert!(valve.is_latched());

        valve.reset();
        assert!(!valve.is_latched());
        assert!(valve.latch());
    }

    #[test]
    fn test_evaluate_delegates() {
        let valve = LatchedValve::new(|chunk: &Chunk| chunk.len() > 3);
        assert!(!valve.evaluate(&Chunk::text("abc")).unwrap());
        assert!(valve.evaluate(&Chunk::text("abcd")).unwrap());
    }
}
