//! ShutoffValve - per-chunk admission predicate
//!
//! Evaluated against every chunk before it reaches a bucket. A valve that
//! answers `true` forces the funnel to cap the current bucket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Chunk, ContractError};

/// Per-chunk admission predicate
///
/// Plain closures taking `&Chunk` and returning `bool` are valves. Use
/// [`try_valve`] for a predicate that can fail.
pub trait ShutoffValve {
    /// Whether the funnel should shut off before delivering `chunk`
    ///
    /// # Errors
    /// A failing predicate aborts the delivery in progress; the chunk stays
    /// queued.
    fn shutoff(&self, chunk: &Chunk) -> Result<bool, ContractError>;

    /// Called once `chunk` was taken by a bucket
    ///
    /// A chunk can be evaluated more than once (a failed write puts it back
    /// at the head), but it is delivered only once.
    #[inline]
    fn delivered(&self, _chunk: &Chunk) {}
}

/// Default valve, never shuts off
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverShutoff;

impl ShutoffValve for NeverShutoff {
    #[inline]
    fn shutoff(&self, _chunk: &Chunk) -> Result<bool, ContractError> {
        Ok(false)
    }
}

impl<F> ShutoffValve for F
where
    F: Fn(&Chunk) -> bool,
{
    #[inline]
    fn shutoff(&self, chunk: &Chunk) -> Result<bool, ContractError> {
        Ok(self(chunk))
    }
}

/// Valve built from a fallible predicate
#[derive(Debug, Clone, Copy)]
pub struct TryValve<F>(F);

impl<F> ShutoffValve for TryValve<F>
where
    F: Fn(&Chunk) -> Result<bool, ContractError>,
{
    #[inline]
    fn shutoff(&self, chunk: &Chunk) -> Result<bool, ContractError> {
        (self.0)(chunk)
    }
}

/// Wrap a fallible predicate as a valve
pub fn try_valve<F>(predicate: F) -> TryValve<F>
where
    F: Fn(&Chunk) -> Result<bool, ContractError>,
{
    TryValve(predicate)
}

/// Size-based rotation valve
///
/// Shuts off once the bytes delivered since the last [`reset`](Self::reset)
/// would exceed `limit`. The first chunk after a reset always passes, so an
/// oversized chunk still reaches a bucket of its own. Clones share the
/// counter: keep one to reset it when attaching the next bucket.
#[derive(Debug, Clone)]
pub struct ByteBudget {
    limit: u64,
    used: Arc<AtomicU64>,
}

impl ByteBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bytes delivered since the last reset
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Start a new budget
    pub fn reset(&self) {
        self.used.store(0, Ordering::Relaxed);
    }
}

impl ShutoffValve for ByteBudget {
    fn shutoff(&self, chunk: &Chunk) -> Result<bool, ContractError> {
        let used = self.used();
        Ok(used > 0 && used + chunk.len() as u64 > self.limit)
    }

    fn delivered(&self, chunk: &Chunk) {
        self.used.fetch_add(chunk.len() as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_budget_rotates() {
        let budget = ByteBudget::new(4);
        let valve = budget.clone();

        for text in ["ab", "cd"] {
            let chunk = Chunk::text(text);
            assert!(!valve.shutoff(&chunk).unwrap());
            valve.delivered(&chunk);
        }
        assert!(valve.shutoff(&Chunk::text("e")).unwrap());
        assert_eq!(budget.used(), 4);

        budget.reset();
        assert!(!valve.shutoff(&Chunk::text("e")).unwrap());
    }

    #[test]
    fn test_byte_budget_passes_oversized_first_chunk() {
        let budget = ByteBudget::new(2);
        let oversized = Chunk::text("oversized");
        assert!(!budget.shutoff(&oversized).unwrap());
        budget.delivered(&oversized);
        assert!(budget.shutoff(&Chunk::text("x")).unwrap());
    }

    #[test]
    fn test_byte_budget_ignores_undelivered_evaluations() {
        let budget = ByteBudget::new(4);
        let chunk = Chunk::text("ab");

        // Evaluated three times, e.g. around failed writes, delivered once
        for _ in 0..3 {
            assert!(!budget.shutoff(&chunk).unwrap());
        }
        budget.delivered(&chunk);
        assert_eq!(budget.used(), 2);
        assert!(!budget.shutoff(&Chunk::text("cd")).unwrap());
    }

    #[test]
    fn test_never_shutoff() {
        assert!(!NeverShutoff.shutoff(&Chunk::text("a")).unwrap());
    }

    #[test]
    fn test_closure_valve() {
        let valve = |chunk: &Chunk| chunk.as_str() == Some("x");
        assert!(valve.shutoff(&Chunk::text("x")).unwrap());
        assert!(!valve.shutoff(&Chunk::text("y")).unwrap());
    }

    #[test]
    fn test_try_valve_propagates_failure() {
        let valve = try_valve(|chunk: &Chunk| {
            if chunk.is_empty() {
                Err(ContractError::valve("empty chunk"))
            } else {
                Ok(false)
            }
        });
        assert!(valve.shutoff(&Chunk::text("a")).is_ok());
        assert!(matches!(
            valve.shutoff(&Chunk::text("")),
            Err(ContractError::ValveFailed { .. })
        ));
    }
}
