//! The serialized event loop that drives the scheduler.
//!
//! Many things can ask for a recomputation: the boot-clock alarm, a new
//! location from GeoClue, an edited config file, a resume from suspend, a
//! wall-clock jump, or `SIGUSR1`. Each of those runs on its own thread and
//! sends a [`SchedulerEvent`] into one channel. [`EventLoop`] is the single
//! consumer and the only code that touches [`ModeScheduler`], so the
//! scheduler never sees concurrent calls.
//!
//! ## Shutdown
//!
//! The [`ShutdownToken`] is checked before acting on *every* event, not only
//! when entering the loop: a signal can land between `recv` returning and the
//! event being handled, and such late events must be dropped. On exit the
//! loop stops the scheduler, which cancels the pending alarm.

pub mod mode;
pub mod scheduler;

pub use mode::{InvalidMode, Mode};
pub use scheduler::{
    ModeScheduler, ModeSink, SchedulerParams, TickOutcome, decide_mode,
    determine_mode_for_instant,
};

use std::sync::mpsc::{Receiver, RecvTimeoutError};

use crate::alarm::{AlarmFired, TimerHandle};
use crate::constants::EVENT_POLL_INTERVAL;
use crate::geo::ScheduleSource;
use crate::io::signals::ShutdownToken;

/// Everything that can wake the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// The suspend-aware alarm expired.
    AlarmFired(TimerHandle),
    /// A new location or schedule is available.
    SourceUpdated(ScheduleSource),
    /// Recompute now (resume, clock change, manual request).
    TickRequested,
    /// Stop the loop.
    Shutdown,
}

impl From<AlarmFired> for SchedulerEvent {
    fn from(fired: AlarmFired) -> Self {
        SchedulerEvent::AlarmFired(fired.0)
    }
}

/// Errors that stop the scheduler from starting.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Timer(#[from] crate::alarm::TimerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "no location or schedule available: set lat/lng, sunrise/sunset, or enable usegeoclue"
    )]
    NoSource,
}

/// Single consumer of [`SchedulerEvent`]s.
pub struct EventLoop {
    scheduler: ModeScheduler,
    events: Receiver<SchedulerEvent>,
    shutdown: ShutdownToken,
}

impl EventLoop {
    pub fn new(
        scheduler: ModeScheduler,
        events: Receiver<SchedulerEvent>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            scheduler,
            events,
            shutdown,
        }
    }

    /// Run until shutdown or until every sender is gone.
    ///
    /// Performs an initial tick, so a scheduler built with a source starts
    /// reporting immediately. Returns the stopped scheduler.
    pub fn run(mut self) -> ModeScheduler {
        if self.shutdown.is_live() {
            self.scheduler.tick();
        }

        while self.shutdown.is_live() {
            match self.events.recv_timeout(EVENT_POLL_INTERVAL) {
                Ok(event) => {
                    if !self.shutdown.is_live() {
                        log_debug!("Dropping {event:?} received after shutdown");
                        break;
                    }
                    self.handle_event(event);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log_debug!("All event senders closed");
                    break;
                }
            }
        }

        self.scheduler.stop();
        self.scheduler
    }

    fn handle_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::AlarmFired(handle) => {
                self.scheduler.on_alarm(handle);
            }
            SchedulerEvent::SourceUpdated(source) => {
                self.scheduler.update_source(source);
            }
            SchedulerEvent::TickRequested => {
                self.scheduler.tick();
            }
            SchedulerEvent::Shutdown => {
                self.shutdown.cancel();
            }
        }
    }
}
