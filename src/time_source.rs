//! Time source abstraction for real and simulated wall-clock time.
//!
//! The scheduler never calls `Local::now()` directly; it asks a [`TimeSource`]
//! so tests can pin "now" to a chosen instant and move it forward.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::sync::Mutex;

/// Trait for abstracting wall-clock reads.
pub trait TimeSource: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Local>;
}

/// Real-time implementation backed by the system clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven time source for tests.
///
/// Time only moves when [`SimulatedTimeSource::advance`] or
/// [`SimulatedTimeSource::set`] is called.
pub struct SimulatedTimeSource {
    current: Mutex<DateTime<Local>>,
}

impl SimulatedTimeSource {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Local>) {
        *self.lock() = instant;
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        let delta = ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX);
        let mut current = self.lock();
        *current = current.checked_add_signed(delta).unwrap_or(*current);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Local>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_simulated_time_advances_only_on_request() {
        let start = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let source = SimulatedTimeSource::new(start);
        assert_eq!(source.now(), start);

        source.advance(Duration::from_secs(90));
        assert_eq!(source.now(), start + ChronoDuration::seconds(90));

        let later = start + ChronoDuration::days(1);
        source.set(later);
        assert_eq!(source.now(), later);
    }
}
