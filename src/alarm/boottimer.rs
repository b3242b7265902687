//! `CLOCK_BOOTTIME` alarm backed by a Linux timerfd.
//!
//! `CLOCK_BOOTTIME` behaves like `CLOCK_MONOTONIC` but also counts time spent
//! in suspend. A one-shot timerfd on that clock therefore expires at the right
//! moment even if the machine slept through part of the interval, and the
//! kernel makes the fd readable immediately on resume when the deadline passed
//! during sleep.
//!
//! A single waiter thread blocks on the fd. Arming re-programs the same fd, so
//! only the newest expiry can ever be observed. The waiter turns each expiry
//! into an [`AlarmFired`] for the handle that was armed at that moment.

use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{AlarmFired, Notifier, SuspendAwareTimer, TimerError, TimerHandle, notifier};
use crate::constants::MINIMUM_ALARM_DURATION;

struct ArmState {
    next_generation: u64,
    armed: Option<TimerHandle>,
    closed: bool,
}

struct Shared {
    fd: TimerFd,
    state: Mutex<ArmState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ArmState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Suspend-aware one-shot timer on `CLOCK_BOOTTIME`.
pub struct BootTimer {
    shared: Arc<Shared>,
    waiter: Option<JoinHandle<()>>,
}

impl BootTimer {
    /// Create the timer and start its waiter thread.
    ///
    /// Expiries are delivered on `sender` as `E::from(AlarmFired(..))`.
    pub fn new<E>(sender: Sender<E>) -> Result<Self, TimerError>
    where
        E: From<AlarmFired> + Send + 'static,
    {
        let fd = TimerFd::new(ClockId::CLOCK_BOOTTIME, TimerFlags::TFD_CLOEXEC)
            .map_err(TimerError::Create)?;

        let shared = Arc::new(Shared {
            fd,
            state: Mutex::new(ArmState {
                next_generation: 1,
                armed: None,
                closed: false,
            }),
        });

        let notify = notifier(sender);
        let waiter = thread::Builder::new()
            .name("darkman-alarm".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || wait_for_expiries(&shared, &notify)
            })
            .map_err(TimerError::Thread)?;

        Ok(Self {
            shared,
            waiter: Some(waiter),
        })
    }

    /// Resolution of the boot clock, if the kernel reports one.
    pub fn resolution() -> Option<Duration> {
        nix::time::clock_getres(nix::time::ClockId::CLOCK_BOOTTIME)
            .ok()
            .map(Duration::from)
    }
}

fn wait_for_expiries(shared: &Shared, notify: &Notifier) {
    loop {
        if let Err(e) = shared.fd.wait() {
            log_pipe!();
            log_error!("Boot-clock timer stopped: {e}");
            return;
        }

        let fired = {
            let mut state = shared.lock();
            if state.closed {
                return;
            }
            // Re-armed between the expiry and taking the lock: the expiry we
            // just read belonged to an older handle.
            if matches!(shared.fd.get(), Ok(Some(_))) {
                continue;
            }
            state.armed.take()
        };

        if let Some(handle) = fired {
            log_debug!("Alarm {handle} fired");
            if !notify(AlarmFired(handle)) {
                return;
            }
        }
    }
}

impl SuspendAwareTimer for BootTimer {
    fn arm(&mut self, duration: Duration) -> Result<TimerHandle, TimerError> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(TimerError::Closed);
        }

        let handle = TimerHandle::new(state.next_generation);
        state.next_generation += 1;
        state.armed = None;

        let expiry = TimeSpec::from_duration(duration.max(MINIMUM_ALARM_DURATION));
        if let Err(e) = self
            .shared
            .fd
            .set(Expiration::OneShot(expiry), TimerSetTimeFlags::empty())
        {
            let _ = self.shared.fd.unset();
            return Err(TimerError::Arm(e));
        }

        state.armed = Some(handle);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut state = self.shared.lock();
        if state.armed == Some(handle) {
            let _ = self.shared.fd.unset();
            state.armed = None;
        }
    }

    fn is_live(&self, handle: TimerHandle) -> bool {
        self.shared.lock().armed == Some(handle)
    }
}

impl Drop for BootTimer {
    fn drop(&mut self) {
        let woke = {
            let mut state = self.shared.lock();
            state.closed = true;
            state.armed = None;
            // Expire immediately so the waiter observes `closed`.
            self.shared
                .fd
                .set(
                    Expiration::OneShot(TimeSpec::from_duration(MINIMUM_ALARM_DURATION)),
                    TimerSetTimeFlags::empty(),
                )
                .is_ok()
        };

        if let Some(waiter) = self.waiter.take()
            && woke
        {
            let _ = waiter.join();
        }
    }
}
