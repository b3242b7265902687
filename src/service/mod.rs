//! The mode-change sink between the scheduler and the outside world.
//!
//! The scheduler reports a mode on every tick, changed or not. [`Service`]
//! remembers the last mode it accepted and only fans out real changes to its
//! [`ModeListener`]s: transition scripts, the mode cache, and the D-Bus
//! server. The same entry point serves explicit requests from `darkman set`
//! and `darkman toggle` arriving over D-Bus.

pub mod cache;
pub mod dispatch;
pub mod scripts;

pub use dispatch::{DispatchHandle, Dispatcher, ListenerOutcome, ListenerQueue};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::Mode;

/// Something that reacts to mode changes.
pub trait ModeListener: Send + Sync {
    /// Short name used in logs and outcome records.
    fn name(&self) -> &str;

    fn on_mode_changed(&self, mode: Mode) -> anyhow::Result<()>;
}

#[derive(Default)]
struct ServiceState {
    current: Mode,
    listeners: Vec<ListenerQueue>,
}

/// Deduplicating mode sink.
///
/// Shared across threads: the scheduler loop and the D-Bus server both call
/// [`Service::change_mode`].
#[derive(Default)]
pub struct Service {
    state: Mutex<ServiceState>,
    dispatcher: Dispatcher,
}

impl Service {
    /// A service that starts in `initial` without notifying anyone.
    pub fn new(initial: Mode) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                current: initial,
                listeners: Vec::new(),
            }),
            dispatcher: Dispatcher::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_mode(&self) -> Mode {
        self.lock().current
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register a listener and start its worker.
    ///
    /// If the mode is already known the listener is brought up to date right
    /// away, and this waits for that first run.
    pub fn add_listener(
        &self,
        listener: Arc<dyn ModeListener>,
    ) -> anyhow::Result<Option<ListenerOutcome>> {
        let queue = self.dispatcher.spawn_worker(listener)?;

        // Queued under the lock so no later change can overtake it
        let catch_up = {
            let mut state = self.lock();
            state.listeners.push(queue.clone());
            state
                .current
                .is_known()
                .then(|| self.dispatcher.dispatch(&[queue], state.current))
        };

        Ok(catch_up.and_then(|handle| handle.wait().into_iter().next()))
    }

    /// Switch to `mode` and notify listeners, unless nothing changes.
    ///
    /// Returns `None` for `Unknown` or for a repeat of the current mode.
    /// Changes reach each listener in the order they were accepted here.
    pub fn change_mode(&self, mode: Mode) -> Option<DispatchHandle> {
        if !mode.is_known() {
            return None;
        }

        let mut state = self.lock();
        if state.current == mode {
            log_debug!("Already in {mode} mode, no transition necessary");
            return None;
        }
        state.current = mode;

        log_block_start!("Switching to {mode} mode");
        Some(self.dispatcher.dispatch(&state.listeners, mode))
    }
}

#[cfg(test)]
mod tests;
