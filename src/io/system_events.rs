//! Resume and clock-change detection.
//!
//! The boot-clock alarm already accounts for time spent suspended, but two
//! things can still leave a pending alarm pointing at the wrong instant:
//!
//! - resuming from suspend on systems where the alarm is coalesced late,
//!   reported by systemd-logind's `PrepareForSleep(false)`
//! - the wall clock jumping (manual change, NTP step, timezone update),
//!   detected with a `CLOCK_REALTIME` timerfd armed with
//!   `TFD_TIMER_CANCEL_ON_SET`
//!
//! Both send [`SchedulerEvent::TickRequested`]. Either monitor failing is
//! logged and otherwise ignored.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use zbus::blocking::Connection;

use crate::core::SchedulerEvent;

const MAX_MONITOR_RESTARTS: u8 = 3;
const RESTART_DELAY: Duration = Duration::from_secs(2);

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LogindManager {
    /// `start` is true before suspending and false after resuming.
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// Spawn the resume and clock-change monitor threads.
pub fn start_system_event_monitors(sender: Sender<SchedulerEvent>) -> Result<()> {
    let resume_sender = sender.clone();
    thread::Builder::new()
        .name("darkman-resume".into())
        .spawn(move || {
            for attempt in 0..=MAX_MONITOR_RESTARTS {
                match monitor_resume(&resume_sender) {
                    Ok(()) => return,
                    Err(e) => {
                        log_warning!("Resume monitor error: {e:#}");
                        if attempt == MAX_MONITOR_RESTARTS {
                            log_indented!("Resume detection will not be available");
                            return;
                        }
                        log_indented!(
                            "Restarting resume monitor (attempt {}/{})",
                            attempt + 1,
                            MAX_MONITOR_RESTARTS
                        );
                        thread::sleep(RESTART_DELAY);
                    }
                }
            }
        })
        .context("Failed to spawn resume monitor thread")?;

    thread::Builder::new()
        .name("darkman-clock".into())
        .spawn(move || {
            if let Err(e) = monitor_clock_changes(&sender) {
                log_warning!("Clock change monitor error: {e:#}");
                log_indented!("Wall-clock jumps will not be detected");
            }
        })
        .context("Failed to spawn clock change monitor thread")?;

    Ok(())
}

/// Returns `Ok` once the event channel closes.
fn monitor_resume(sender: &Sender<SchedulerEvent>) -> Result<()> {
    let connection = Connection::system().context("Failed to connect to system D-Bus")?;
    let logind =
        LogindManagerProxyBlocking::new(&connection).context("Failed to create logind proxy")?;
    let signals = logind
        .receive_prepare_for_sleep()
        .context("Failed to subscribe to PrepareForSleep signals")?;
    log_debug!("Subscribed to systemd-logind PrepareForSleep signals");

    for signal in signals {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => {
                log_warning!("Failed to parse PrepareForSleep signal args: {e}");
                continue;
            }
        };

        if args.start {
            log_debug!("System is going to sleep");
            continue;
        }

        log_info!("System resumed from sleep");
        if sender.send(SchedulerEvent::TickRequested).is_err() {
            return Ok(());
        }
    }

    anyhow::bail!("D-Bus connection lost: PrepareForSleep signal stream ended")
}

/// A far-future `CLOCK_REALTIME` timer that the kernel cancels whenever the
/// wall clock is set.
struct ClockChangeDetector {
    timer: TimerFd,
}

impl ClockChangeDetector {
    fn new() -> nix::Result<Self> {
        let timer = TimerFd::new(ClockId::CLOCK_REALTIME, TimerFlags::TFD_CLOEXEC)?;
        let detector = Self { timer };
        detector.arm()?;
        Ok(detector)
    }

    fn arm(&self) -> nix::Result<()> {
        let flags =
            TimerSetTimeFlags::TFD_TIMER_ABSTIME | TimerSetTimeFlags::TFD_TIMER_CANCEL_ON_SET;
        let far_future = TimeSpec::new(i64::MAX / 1000, 0);
        self.timer.set(Expiration::OneShot(far_future), flags)
    }

    /// Block until the wall clock changes.
    fn wait(&self) -> Result<()> {
        match self.timer.wait() {
            Ok(()) | Err(Errno::ECANCELED) => {
                self.arm().context("Failed to re-arm clock change timer")
            }
            Err(e) => Err(e).context("Clock change timer wait failed"),
        }
    }
}

fn monitor_clock_changes(sender: &Sender<SchedulerEvent>) -> Result<()> {
    let detector =
        ClockChangeDetector::new().context("Failed to create clock change detector")?;
    log_debug!("Watching for wall-clock changes");

    loop {
        detector.wait()?;
        log_info!("System clock changed");
        if sender.send(SchedulerEvent::TickRequested).is_err() {
            return Ok(());
        }
    }
}
