//! Hot reloading of the configuration file.
//!
//! Editing `config.toml` while the daemon runs re-reads it and, when the
//! effective schedule source changed, hands the new source to the event loop
//! as [`SchedulerEvent::SourceUpdated`]. Settings that need a restart
//! (`usegeoclue`, `dbusserver`, `portal`) are only reported.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, Sender, channel};
use std::thread;

use super::Config;
use crate::constants::CONFIG_DEBOUNCE;
use crate::core::SchedulerEvent;
use crate::geo::ScheduleSource;

/// Watches one configuration file and feeds source changes to the event loop.
pub struct ConfigWatcher {
    path: PathBuf,
    sender: Sender<SchedulerEvent>,
    /// Last loaded configuration, compared against on every reload
    current: Config,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf, current: Config, sender: Sender<SchedulerEvent>) -> Self {
        Self {
            path,
            sender,
            current,
        }
    }

    /// Spawn the watcher thread.
    ///
    /// The parent directory is watched rather than the file itself since
    /// editors usually replace the file on save.
    pub fn start(mut self) -> Result<()> {
        let Some(dir) = self.path.parent().map(Path::to_path_buf) else {
            return Ok(());
        };
        if !dir.is_dir() {
            log_debug!("{} does not exist, not watching for config changes", dir.display());
            return Ok(());
        }

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
        log_debug!("Watching {} for changes", self.path.display());

        thread::Builder::new()
            .name("darkman-config".into())
            .spawn(move || {
                // The watcher stops when dropped
                let _watcher = watcher;

                while let Ok(event) = rx.recv() {
                    if !self.affects_config(&event) {
                        continue;
                    }

                    // Editors write in several steps; wait for them to settle
                    loop {
                        match rx.recv_timeout(CONFIG_DEBOUNCE) {
                            Ok(_) => continue,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }

                    if let Some(source) = self.reload()
                        && self.sender.send(SchedulerEvent::SourceUpdated(source)).is_err()
                    {
                        break;
                    }
                }
            })
            .context("Failed to spawn config watcher thread")?;

        Ok(())
    }

    fn affects_config(&self, event: &Event) -> bool {
        let name = self.path.file_name();
        event.paths.iter().any(|p| p.file_name() == name)
    }

    /// Re-read the file and return the schedule source if it changed.
    ///
    /// Invalid files are reported and otherwise ignored; the daemon keeps
    /// running with the previous configuration.
    pub fn reload(&mut self) -> Option<ScheduleSource> {
        log_block_start!("Configuration file changed, reloading");
        let config = match Config::load_from_path(&self.path) {
            Ok(config) => config,
            Err(e) => {
                log_warning!("Ignoring invalid configuration: {e:#}");
                return None;
            }
        };

        if config.use_geoclue() != self.current.use_geoclue()
            || config.dbus_server() != self.current.dbus_server()
            || config.portal() != self.current.portal()
        {
            log_warning!(
                "Changes to usegeoclue, dbusserver and portal take effect after a restart"
            );
        }

        let previous = self.current.schedule_source().ok().flatten();
        let next = config.schedule_source().ok().flatten();
        self.current = config;

        match next {
            Some(source) if Some(source) != previous => {
                log_indented!("New source: {source}");
                Some(source)
            }
            Some(_) => {
                log_indented!("Source unchanged");
                None
            }
            None => {
                log_indented!("No source configured, keeping the current one");
                None
            }
        }
    }
}
