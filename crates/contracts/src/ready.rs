//! ReadySignal - bucket readiness notification
//!
//! Buckets that answer [`WriteAck::Backpressure`](crate::WriteAck) fire this
//! signal once they can take writes again.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable, generation-counted readiness signal
///
/// Every [`signal`](Self::signal) bumps a generation counter. A waiter
/// records the generation before the write that answered with backpressure
/// and waits for a newer one with [`ready_after`](Self::ready_after), so a
/// signal fired during an earlier backpressure episode never releases a
/// later one, and a signal fired before the wait starts is not lost.
#[derive(Clone)]
pub struct ReadySignal {
    generation: Arc<watch::Sender<u64>>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            generation: Arc::new(generation),
        }
    }
}

impl ReadySignal {
    /// Create a new, unfired signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal
    pub fn signal(&self) {
        self.generation
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Number of times the signal fired
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Wait until the signal fires after `generation`
    ///
    /// Completes at once if it already has.
    pub async fn ready_after(&self, generation: u64) {
        let mut rx = self.generation.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|current| *current != generation).await;
    }

    /// Whether both handles fire the same signal
    pub fn same_as(&self, other: &ReadySignal) -> bool {
        Arc::ptr_eq(&self.generation, &other.generation)
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("generation", &self.generation())
            .field("handles", &Arc::strong_count(&self.generation))
            .finish()
    }
}
