//! Unix signal handling and the shutdown token.
//!
//! `SIGINT`, `SIGTERM` and `SIGHUP` cancel the [`ShutdownToken`] and send
//! [`SchedulerEvent::Shutdown`] so the event loop wakes up immediately.
//! `SIGUSR1` requests a manual tick.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1},
    iterator::{Handle, Signals},
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
};

use crate::core::SchedulerEvent;

/// Shared "keep running" flag.
///
/// Clones observe the same state. Once cancelled it never becomes live again.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    running: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Running signal listener. Dropping it stops the listener thread.
pub struct SignalHandler {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Install handlers and forward signals as scheduler events.
pub fn setup_signal_handler(
    sender: Sender<SchedulerEvent>,
    shutdown: ShutdownToken,
) -> Result<SignalHandler> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1])
        .context("failed to register signal handlers")?;
    let handle = signals.handle();

    let thread = thread::Builder::new()
        .name("darkman-signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                match sig {
                    SIGUSR1 => {
                        log_pipe!();
                        log_info!("Received SIGUSR1, recomputing mode");
                        if sender.send(SchedulerEvent::TickRequested).is_err() {
                            break;
                        }
                    }
                    SIGINT | SIGTERM | SIGHUP => {
                        let name = match sig {
                            SIGINT => "SIGINT",
                            SIGTERM => "SIGTERM",
                            _ => "SIGHUP",
                        };
                        log_pipe!();
                        log_info!("Received {name}, shutting down");
                        shutdown.cancel();
                        let _ = sender.send(SchedulerEvent::Shutdown);
                        break;
                    }
                    _ => {}
                }
            }
        })
        .context("failed to spawn signal handler thread")?;

    Ok(SignalHandler {
        handle,
        thread: Some(thread),
    })
}
