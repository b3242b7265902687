//! The mode scheduler state machine.
//!
//! [`ModeScheduler`] turns a [`ScheduleSource`] and the current time into a
//! [`Mode`], reports it, and arms a single suspend-aware wake-up for the next
//! boundary. It is driven from one thread only (the event loop in
//! [`crate::core`]) and keeps no mode of its own: every tick recomputes and
//! reports the mode, and the sink decides whether anything changed.
//!
//! ## Decision rule
//!
//! Given the *next* sunrise and the *next* sundown:
//! - next sunrise earlier than next sundown: we are in the night leading up to
//!   that sunrise, so the mode is dark;
//! - otherwise we are in the day leading up to that sundown, so it is light.
//!
//! ## Wake-up
//!
//! The alarm is armed for the earliest of the two boundaries, independent of
//! the mode just computed, so no boundary can be skipped.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::mode::Mode;
use crate::alarm::{SuspendAwareTimer, TimerHandle};
use crate::constants::TICK_MARGIN;
use crate::geo::{CalculationError, ScheduleSource, SunCalculator, SunTimes};
use crate::time_source::TimeSource;

/// Receives every mode the scheduler computes.
pub type ModeSink = Box<dyn FnMut(Mode) + Send>;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No schedule source yet.
    Uninitialized,
    /// The scheduler was stopped.
    Stopped,
    /// The sun calculation failed; nothing was reported or armed.
    CalculationFailed,
    /// A mode was reported. `timer` is `None` when arming failed.
    Reported {
        mode: Mode,
        next_boundary: DateTime<Utc>,
        timer: Option<TimerHandle>,
    },
}

/// Everything needed to build a [`ModeScheduler`].
pub struct SchedulerParams {
    pub source: Option<ScheduleSource>,
    pub timer: Box<dyn SuspendAwareTimer>,
    pub calculator: Box<dyn SunCalculator>,
    pub clock: Arc<dyn TimeSource>,
    pub sink: ModeSink,
}

pub struct ModeScheduler {
    source: Option<ScheduleSource>,
    latest_timer: Option<TimerHandle>,
    timer: Box<dyn SuspendAwareTimer>,
    calculator: Box<dyn SunCalculator>,
    clock: Arc<dyn TimeSource>,
    sink: ModeSink,
    stopped: bool,
}

/// Dark if the next sunrise comes before the next sundown, light otherwise.
pub fn decide_mode(times: &SunTimes) -> Mode {
    if times.sunrise < times.sundown {
        Mode::Dark
    } else {
        Mode::Light
    }
}

/// The reference instant used for a tick evaluated at `now`.
fn reference_instant(now: DateTime<Utc>) -> DateTime<Utc> {
    now + TimeDelta::from_std(TICK_MARGIN).unwrap_or(TimeDelta::zero())
}

/// Mode at `now` for `source`, without touching any timer.
///
/// Uses the same forward margin and decision rule as a tick. Meant for
/// one-shot queries such as picking the initial mode at startup.
pub fn determine_mode_for_instant(
    source: &ScheduleSource,
    calculator: &dyn SunCalculator,
    now: DateTime<Utc>,
) -> Result<Mode, CalculationError> {
    let times = calculator.next_sunrise_and_sundown(source, reference_instant(now))?;
    Ok(decide_mode(&times))
}

impl ModeScheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self {
            source: params.source,
            latest_timer: None,
            timer: params.timer,
            calculator: params.calculator,
            clock: params.clock,
            sink: params.sink,
            stopped: false,
        }
    }

    pub fn source(&self) -> Option<&ScheduleSource> {
        self.source.as_ref()
    }

    /// The handle of the most recently armed wake-up.
    pub fn latest_timer(&self) -> Option<TimerHandle> {
        self.latest_timer
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Replace the schedule source and tick.
    ///
    /// Returns `None` without ticking when `source` equals the current one.
    pub fn update_source(&mut self, source: ScheduleSource) -> Option<TickOutcome> {
        if self.stopped {
            log_debug!("Ignoring source update after stop");
            return None;
        }
        if self.source.as_ref() == Some(&source) {
            log_debug!("Schedule source has not changed, nothing to do");
            return None;
        }

        log_block_start!("Schedule source updated");
        log_indented!("Now using {source}");
        self.source = Some(source);
        Some(self.tick())
    }

    /// Recompute the mode, report it, and arm the next wake-up.
    pub fn tick(&mut self) -> TickOutcome {
        if self.stopped {
            return TickOutcome::Stopped;
        }
        let Some(source) = self.source else {
            log_pipe!();
            log_info!("No location or schedule known yet, waiting");
            return TickOutcome::Uninitialized;
        };

        let now = self.clock.now().with_timezone(&Utc);
        let times = match self
            .calculator
            .next_sunrise_and_sundown(&source, reference_instant(now))
        {
            Ok(times) => times,
            Err(e) => {
                log_pipe!();
                log_error!("Could not calculate sunrise and sundown: {e}");
                return TickOutcome::CalculationFailed;
            }
        };

        let mode = decide_mode(&times);
        log_debug!(
            "Next sunrise {}, next sundown {}, mode {mode}",
            times.sunrise.with_timezone(&chrono::Local).format("%F %T"),
            times.sundown.with_timezone(&chrono::Local).format("%F %T")
        );
        (self.sink)(mode);

        let next_boundary = times.earliest();
        let wait = (next_boundary - now).to_std().unwrap_or(Duration::ZERO);

        if let Some(previous) = self.latest_timer.take() {
            self.timer.cancel(previous);
        }
        let timer = match self.timer.arm(wait) {
            Ok(handle) => {
                log_decorated!(
                    "Next transition at {}",
                    next_boundary
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                );
                Some(handle)
            }
            Err(e) => {
                log_pipe!();
                log_error!("Could not schedule the next transition: {e}");
                None
            }
        };
        self.latest_timer = timer;

        TickOutcome::Reported {
            mode,
            next_boundary,
            timer,
        }
    }

    /// Handle an alarm expiry. Only the latest handle triggers a tick.
    pub fn on_alarm(&mut self, handle: TimerHandle) -> Option<TickOutcome> {
        if self.latest_timer != Some(handle) {
            log_debug!("Ignoring stale alarm {handle}");
            return None;
        }
        self.latest_timer = None;
        Some(self.tick())
    }

    /// Cancel the pending wake-up and refuse further ticks.
    pub fn stop(&mut self) {
        if let Some(handle) = self.latest_timer.take() {
            self.timer.cancel(handle);
        }
        self.stopped = true;
    }
}
