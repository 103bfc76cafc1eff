//! Time source for ledger timestamps and table suffixes

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current UTC time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Used to pin table suffixes and ledger timestamps in tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    base: DateTime<Utc>,
    elapsed_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            elapsed_ms: AtomicI64::new(0),
        }
    }

    /// Advances the clock by the given duration
    ///
    /// Saturates at the latest representable instant.
    pub fn advance(&self, duration: Duration) {
        let ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        // The closure always returns Some, so the update cannot fail
        let _ = self
            .elapsed_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |elapsed| {
                Some(elapsed.saturating_add(ms))
            });
    }

    /// Jumps to an absolute point in time (may move backwards)
    pub fn set(&self, when: DateTime<Utc>) {
        let offset = (when - self.base).num_milliseconds();
        self.elapsed_ms.store(offset, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.elapsed_ms.load(Ordering::Relaxed);
        chrono::Duration::try_milliseconds(elapsed)
            .and_then(|offset| self.base.checked_add_signed(offset))
            .unwrap_or(if elapsed < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}
