//! Cooperative cancellation for render and load requests

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared cancellation flag.
///
/// Clones observe the same state. The worker checks it around the engine call
/// and engines may poll it to stop early; cancelling never interrupts work
/// that is already running.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; every clone sees the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        assert!(!worker_token.is_cancelled());

        token.cancel();
        assert!(worker_token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }
}
