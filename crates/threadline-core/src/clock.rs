//! Clock - Injectable Time
//!
//! TigerStyle: the service never calls `Utc::now()` directly. Production
//! uses `SystemClock`; tests use `SimClock`, which only moves when told to.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Source of creation timestamps.
pub trait Clock: Send + Sync {
    /// Current time (UTC).
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// SystemClock
// =============================================================================

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// SimClock
// =============================================================================

/// A simulated clock for deterministic testing.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time operations are explicit
/// - Shareable across tasks (`&self` methods)
#[derive(Debug, Default)]
pub struct SimClock {
    /// Current time in milliseconds since epoch
    current_ms: AtomicI64,
}

impl SimClock {
    /// Create a new clock starting at the epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given time.
    ///
    /// # Panics
    /// Panics if `start_ms` is negative.
    #[must_use]
    pub fn at_ms(start_ms: i64) -> Self {
        assert!(start_ms >= 0, "start_ms must be non-negative, got {start_ms}");
        Self {
            current_ms: AtomicI64::new(start_ms),
        }
    }

    /// Get current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Advance time by the given milliseconds, returning the new time.
    ///
    /// # Panics
    /// Panics if `ms` is negative.
    pub fn advance_ms(&self, ms: i64) -> i64 {
        assert!(ms >= 0, "advance_ms({ms}) would move time backwards");

        let old_time = self.current_ms.fetch_add(ms, Ordering::SeqCst);
        let new_time = old_time.saturating_add(ms);

        // Postcondition
        assert!(new_time >= old_time, "time must not go backwards");

        new_time
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms())
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

// =============================================================================
// Tests
// =============================================================================
