//! Listener fan-out with per-listener outcome capture.
//!
//! Every listener gets one long-lived worker thread fed by its own queue, so
//! a slow script or a stuck D-Bus call never holds up the scheduler, and each
//! listener still applies mode changes in the order they were accepted. Every
//! run produces a [`ListenerOutcome`]; failures (including panics) are logged
//! and kept in a bounded history that can be inspected later.

use anyhow::Context;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::ModeListener;
use crate::constants::OUTCOME_HISTORY_LIMIT;
use crate::core::Mode;

/// Result of delivering one mode to one listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerOutcome {
    pub listener: String,
    pub mode: Mode,
    pub result: Result<(), String>,
    pub elapsed: Duration,
}

impl ListenerOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

struct Job {
    mode: Mode,
    reply: Sender<ListenerOutcome>,
}

/// Queue into one listener's worker thread.
///
/// The worker exits once every clone of its queue is dropped.
#[derive(Clone)]
pub struct ListenerQueue {
    name: String,
    jobs: Sender<Job>,
}

impl ListenerQueue {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `mode` behind anything already pending for this listener.
    fn enqueue(&self, mode: Mode) -> Option<Receiver<ListenerOutcome>> {
        let (reply, outcome) = channel();
        match self.jobs.send(Job { mode, reply }) {
            Ok(()) => Some(outcome),
            Err(_) => {
                log_pipe!();
                log_error!("{} worker is gone, dropping {mode}", self.name);
                None
            }
        }
    }
}

/// Pending deliveries of one mode change.
///
/// Dropping the handle does not cancel anything; the workers still run the
/// change and record their outcomes.
pub struct DispatchHandle {
    pending: Vec<Receiver<ListenerOutcome>>,
}

impl DispatchHandle {
    /// Block until every listener has handled this change.
    pub fn wait(self) -> Vec<ListenerOutcome> {
        self.pending
            .into_iter()
            .filter_map(|outcome| outcome.recv().ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Runs listeners and remembers how they did.
#[derive(Clone, Default)]
pub struct Dispatcher {
    history: Arc<Mutex<VecDeque<ListenerOutcome>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the worker thread for `listener`.
    pub fn spawn_worker(
        &self,
        listener: Arc<dyn ModeListener>,
    ) -> anyhow::Result<ListenerQueue> {
        let name = listener.name().to_string();
        let (jobs, queue) = channel::<Job>();
        let history = Arc::clone(&self.history);

        thread::Builder::new()
            .name(format!("darkman-{name}"))
            .spawn(move || {
                for job in queue {
                    let outcome = run_listener(listener.as_ref(), job.mode, &history);
                    let _ = job.reply.send(outcome);
                }
            })
            .with_context(|| format!("Could not start the {name} listener thread"))?;

        Ok(ListenerQueue { name, jobs })
    }

    /// Queue `mode` on every listener. Never blocks on the listeners.
    pub fn dispatch(&self, queues: &[ListenerQueue], mode: Mode) -> DispatchHandle {
        DispatchHandle {
            pending: queues
                .iter()
                .filter_map(|queue| queue.enqueue(mode))
                .collect(),
        }
    }

    /// Recorded outcomes, oldest first.
    pub fn history(&self) -> Vec<ListenerOutcome> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Recorded failures, oldest first.
    pub fn failures(&self) -> Vec<ListenerOutcome> {
        self.history()
            .into_iter()
            .filter(|outcome| !outcome.is_success())
            .collect()
    }
}

fn run_listener(
    listener: &dyn ModeListener,
    mode: Mode,
    history: &Mutex<VecDeque<ListenerOutcome>>,
) -> ListenerOutcome {
    let started = Instant::now();
    let result = match panic::catch_unwind(AssertUnwindSafe(|| listener.on_mode_changed(mode))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(_) => Err("listener panicked".to_string()),
    };

    let outcome = ListenerOutcome {
        listener: listener.name().to_string(),
        mode,
        result,
        elapsed: started.elapsed(),
    };

    match &outcome.result {
        Ok(()) => log_debug!(
            "{} handled {mode} in {:?}",
            outcome.listener,
            outcome.elapsed
        ),
        Err(e) => {
            log_pipe!();
            log_error!("{} failed to switch to {mode}: {e}", outcome.listener);
        }
    }

    let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
    if history.len() >= OUTCOME_HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(outcome.clone());

    outcome
}
