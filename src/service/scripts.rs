//! User transition scripts.
//!
//! On a switch to `dark`, every executable in `darkman/dark-mode.d/` under
//! each XDG data directory runs (likewise `light-mode.d/`). Directories are
//! merged by file name with later (higher priority) directories winning, so a
//! script in `~/.local/share` shadows a system one of the same name.

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use super::ModeListener;
use crate::constants::APP_DIR_NAME;
use crate::core::Mode;

const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

pub struct ScriptRunner {
    /// Lowest priority first.
    data_dirs: Vec<PathBuf>,
    /// Serializes runs so transitions never interleave.
    running: Mutex<()>,
}

impl ScriptRunner {
    /// Data directories from `XDG_DATA_DIRS` and `XDG_DATA_HOME`.
    pub fn from_environment() -> Self {
        let system = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|dirs| !dirs.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIRS.to_string());

        // XDG_DATA_DIRS lists the most important directory first.
        let mut data_dirs: Vec<PathBuf> = std::env::split_paths(&system)
            .filter(|dir| dir.is_absolute())
            .collect();
        data_dirs.reverse();
        data_dirs.extend(dirs::data_dir());

        Self::with_data_dirs(data_dirs)
    }

    /// Use explicit data directories, lowest priority first.
    pub fn with_data_dirs(data_dirs: Vec<PathBuf>) -> Self {
        Self {
            data_dirs,
            running: Mutex::new(()),
        }
    }

    /// Scripts for `mode` in execution order.
    pub fn scripts_for(&self, mode: Mode) -> Vec<PathBuf> {
        let subdir = format!("{mode}-mode.d");
        let mut scripts: BTreeMap<OsString, PathBuf> = BTreeMap::new();

        for dir in &self.data_dirs {
            let Ok(entries) = fs::read_dir(dir.join(APP_DIR_NAME).join(&subdir)) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    scripts.insert(entry.file_name(), path);
                }
            }
        }

        scripts.into_values().collect()
    }

    /// Run every script for `mode`, one after another.
    pub fn run(&self, mode: Mode) -> Result<()> {
        let _guard = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let scripts = self.scripts_for(mode);
        if scripts.is_empty() {
            log_debug!("No {mode}-mode scripts found");
            return Ok(());
        }

        let mut failures = Vec::new();
        for script in &scripts {
            if let Err(e) = run_script(script) {
                failures.push(format!("{}: {e}", script.display()));
            } else {
                log_indented!("Ran {}", script.display());
            }
        }

        if !failures.is_empty() {
            bail!("{} script(s) failed: {}", failures.len(), failures.join("; "));
        }
        Ok(())
    }
}

fn run_script(script: &Path) -> Result<()> {
    let status = Command::new(script).status()?;
    if !status.success() {
        bail!("exited with {status}");
    }
    Ok(())
}

impl ModeListener for ScriptRunner {
    fn name(&self) -> &str {
        "scripts"
    }

    fn on_mode_changed(&self, mode: Mode) -> Result<()> {
        self.run(mode)
    }
}
