//! Deterministic suspend-aware timer for tests.
//!
//! Two clocks are tracked: a suspend-inclusive boot clock and a monotonic
//! clock that pauses while suspended. Only the boot clock drives expiry,
//! matching `CLOCK_BOOTTIME`. Time moves only when the test calls
//! [`SimulatedTimer::advance`] (machine awake) or [`SimulatedTimer::suspend`]
//! (machine asleep).
//!
//! Clones share state, so a test can hand one clone to the scheduler and keep
//! another to drive time.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{AlarmFired, Notifier, SuspendAwareTimer, TimerError, TimerHandle, notifier};

#[derive(Default)]
struct SimState {
    boot_now: Duration,
    monotonic_now: Duration,
    next_generation: u64,
    armed: Option<(TimerHandle, Duration)>,
    fail_next_arm: bool,
    armed_durations: Vec<Duration>,
}

#[derive(Clone)]
pub struct SimulatedTimer {
    state: Arc<Mutex<SimState>>,
    notify: Notifier,
}

impl SimulatedTimer {
    pub fn new<E>(sender: Sender<E>) -> Self
    where
        E: From<AlarmFired> + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(SimState {
                next_generation: 1,
                ..SimState::default()
            })),
            notify: notifier(sender),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Let `duration` pass with the machine awake.
    ///
    /// Returns the handle that fired, if any.
    pub fn advance(&self, duration: Duration) -> Option<TimerHandle> {
        self.elapse(duration, true)
    }

    /// Let `duration` pass with the machine suspended.
    ///
    /// Only the boot clock moves. An alarm whose deadline passed while asleep
    /// fires on resume, at the end of the call.
    pub fn suspend(&self, duration: Duration) -> Option<TimerHandle> {
        self.elapse(duration, false)
    }

    fn elapse(&self, duration: Duration, awake: bool) -> Option<TimerHandle> {
        let fired = {
            let mut state = self.lock();
            state.boot_now += duration;
            if awake {
                state.monotonic_now += duration;
            }
            match state.armed {
                Some((handle, deadline)) if state.boot_now >= deadline => {
                    state.armed = None;
                    Some(handle)
                }
                _ => None,
            }
        };

        if let Some(handle) = fired {
            (self.notify)(AlarmFired(handle));
        }
        fired
    }

    /// Time elapsed on the suspend-inclusive clock.
    pub fn boot_elapsed(&self) -> Duration {
        self.lock().boot_now
    }

    /// Time elapsed on the clock that pauses during suspend.
    pub fn monotonic_elapsed(&self) -> Duration {
        self.lock().monotonic_now
    }

    /// Time left on the boot clock until the pending alarm fires.
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.lock();
        state
            .armed
            .map(|(_, deadline)| deadline.saturating_sub(state.boot_now))
    }

    /// The pending handle, if any.
    pub fn pending(&self) -> Option<TimerHandle> {
        self.lock().armed.map(|(handle, _)| handle)
    }

    /// Every duration passed to `arm`, in order.
    pub fn armed_durations(&self) -> Vec<Duration> {
        self.lock().armed_durations.clone()
    }

    /// Make the next `arm` call fail as if the OS refused.
    pub fn fail_next_arm(&self) {
        self.lock().fail_next_arm = true;
    }
}

impl SuspendAwareTimer for SimulatedTimer {
    fn arm(&mut self, duration: Duration) -> Result<TimerHandle, TimerError> {
        let mut state = self.lock();
        state.armed = None;
        state.armed_durations.push(duration);

        if std::mem::take(&mut state.fail_next_arm) {
            return Err(TimerError::Arm(nix::errno::Errno::EINVAL));
        }

        let handle = TimerHandle::new(state.next_generation);
        state.next_generation += 1;
        let deadline = state.boot_now + duration;
        state.armed = Some((handle, deadline));
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut state = self.lock();
        if matches!(state.armed, Some((armed, _)) if armed == handle) {
            state.armed = None;
        }
    }

    fn is_live(&self, handle: TimerHandle) -> bool {
        matches!(self.lock().armed, Some((armed, _)) if armed == handle)
    }
}
