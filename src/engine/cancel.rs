//! Shutdown signal shared by the engine, the prober and the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::Clock;

/// Longest single sleep between cancellation checks.
const SLICE_MS: u64 = 100;

/// Cloneable cancellation flag.
///
/// Every clone observes the same flag. Once cancelled it stays cancelled.
///
/// # Example
///
/// ```rust
/// use mqtt_bed::CancelToken;
/// use mqtt_bed::hal::MockClock;
/// use mqtt_bed::traits::Clock;
///
/// let token = CancelToken::new();
/// let clock = MockClock::new();
///
/// assert!(token.sleep(&clock, 250));
/// assert_eq!(clock.now_ms(), 250);
///
/// token.clone().cancel();
/// assert!(!token.sleep(&clock, 250));
/// assert_eq!(clock.now_ms(), 250);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sleep for `ms` on `clock`, waking early if cancelled.
    ///
    /// Returns `true` if the full duration elapsed without cancellation.
    pub fn sleep<K: Clock + ?Sized>(&self, clock: &K, ms: u64) -> bool {
        let mut remaining = ms;
        while remaining > 0 {
            if self.is_cancelled() {
                return false;
            }
            let slice = remaining.min(SLICE_MS);
            clock.sleep_ms(slice);
            remaining -= slice;
        }
        !self.is_cancelled()
    }
}
