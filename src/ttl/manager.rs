//! Expiration math for the TTL store.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

use super::entry::TtlEntry;

/// Source of wall-clock milliseconds. Injected so tests control expiry
/// deterministically.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Computes and evaluates entry expirations.
///
/// Holds the store's optional default TTL: a put without an explicit
/// duration falls back to it, and a put with one overrides it. With
/// neither configured, entries never expire.
pub struct TtlManager {
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl TtlManager {
    pub fn new(default_ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self { default_ttl, clock }
    }

    /// Current wall-clock milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// The expiry instant for a put carrying `duration`, or `None` when
    /// neither the put nor the store configures a lifetime.
    pub fn expiration_for(&self, duration: Option<Duration>) -> Option<i64> {
        duration
            .or(self.default_ttl)
            .map(|d| self.now_ms() + d.as_millis() as i64)
    }

    /// Whether an expiry instant has passed. `None` never expires.
    pub fn is_expired(&self, expires_at: Option<i64>) -> bool {
        expires_at.is_some_and(|e| self.now_ms() >= e)
    }

    /// Whether an entry has expired.
    pub fn is_entry_expired(&self, entry: &TtlEntry) -> bool {
        self.is_expired(entry.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(default_ttl: Option<Duration>, clock: Arc<ManualClock>) -> TtlManager {
        TtlManager::new(default_ttl, clock)
    }

    #[test]
    fn no_duration_and_no_default_never_expires() {
        let clock = Arc::new(ManualClock::new(1_000));
        let manager = manager(None, Arc::clone(&clock));

        assert_eq!(manager.expiration_for(None), None);
        assert!(!manager.is_expired(None));

        clock.advance(Duration::from_secs(u32::MAX as u64));
        assert!(!manager.is_expired(None));
    }

    #[test]
    fn explicit_duration_wins_over_default() {
        let clock = Arc::new(ManualClock::new(0));
        let manager = manager(Some(Duration::from_secs(10)), clock);

        assert_eq!(
            manager.expiration_for(Some(Duration::from_secs(1))),
            Some(1_000)
        );
        assert_eq!(manager.expiration_for(None), Some(10_000));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let clock = Arc::new(ManualClock::new(0));
        let manager = manager(None, Arc::clone(&clock));

        let deadline = Some(5_000);
        clock.set(4_999);
        assert!(!manager.is_expired(deadline));
        clock.set(5_000);
        assert!(manager.is_expired(deadline));
    }
}
