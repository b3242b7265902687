//! Suspend-aware one-shot alarms.
//!
//! The scheduler needs a wake-up at the next sunrise or sundown. Ordinary
//! monotonic timers stop counting while the machine sleeps, so a six hour
//! timer armed before an eight hour suspend would fire six hours *after*
//! resume. Timers here are measured on a clock that keeps running through
//! suspend, so the same timer fires as soon as the machine wakes.
//!
//! ## Ownership model
//!
//! A [`SuspendAwareTimer`] owns exactly one alarm slot. Every call to
//! [`SuspendAwareTimer::arm`] returns a fresh [`TimerHandle`] tagged with a
//! generation number and invalidates whatever handle came before it. When the
//! alarm expires, an [`AlarmFired`] carrying that handle is sent on the
//! channel supplied at construction. The receiver compares it against the
//! handle it last stored and drops anything stale.
//!
//! Implementations:
//! - [`BootTimer`]: Linux `timerfd` on `CLOCK_BOOTTIME`
//! - [`SimulatedTimer`]: deterministic clock for tests

pub mod boottimer;
#[cfg(any(test, feature = "testing-support"))]
pub mod simulated;

pub use boottimer::BootTimer;
#[cfg(any(test, feature = "testing-support"))]
pub use simulated::SimulatedTimer;

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Identifies one arming of a timer.
///
/// Handles are only meaningful to the timer that produced them. A handle is
/// live until it fires, is cancelled, or a newer handle is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    generation: u64,
}

impl TimerHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.generation)
    }
}

/// Notification that the alarm for `handle` expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmFired(pub TimerHandle);

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("failed to create boot-clock timer: {0}")]
    Create(#[source] nix::Error),

    #[error("failed to arm boot-clock timer: {0}")]
    Arm(#[source] nix::Error),

    #[error("timer has been shut down")]
    Closed,

    #[error("failed to start timer thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// A single-slot alarm on a suspend-inclusive clock.
pub trait SuspendAwareTimer: Send {
    /// Schedule a wake-up `duration` from now, replacing any pending one.
    ///
    /// On error no alarm is pending, including any that was pending before.
    fn arm(&mut self, duration: Duration) -> Result<TimerHandle, TimerError>;

    /// Invalidate `handle`. Stale or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);

    /// Whether `handle` may still fire.
    fn is_live(&self, handle: TimerHandle) -> bool;
}

/// Delivers fire notifications into whatever event type the owner uses.
///
/// Returns false once the receiving side is gone.
pub(crate) type Notifier = Arc<dyn Fn(AlarmFired) -> bool + Send + Sync>;

pub(crate) fn notifier<E>(sender: Sender<E>) -> Notifier
where
    E: From<AlarmFired> + Send + 'static,
{
    Arc::new(move |fired| sender.send(E::from(fired)).is_ok())
}

#[cfg(test)]
mod tests;
