//! Lock file management for single-instance enforcement.
//!
//! The daemon holds an exclusive `flock` on `$XDG_RUNTIME_DIR/darkman.lock`
//! for its whole lifetime. The file contains the owner's PID so a second
//! instance can report who is running, and so a lock left behind by a
//! crashed process can be told apart from a live one.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::constants::LOCK_FILE_NAME;

/// Held lock. Dropping it releases the lock and removes the file.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock in the runtime directory.
    pub fn acquire() -> Result<Self> {
        Self::acquire_in(&runtime_dir())
    }

    /// Acquire the lock in `dir`.
    ///
    /// Fails if another live process holds it. A lock whose recorded PID no
    /// longer exists is removed and acquisition is retried once.
    pub fn acquire_in(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        match try_lock(&path)? {
            Some(lock) => Ok(lock),
            None => {
                handle_lock_conflict(&path)?;
                try_lock(&path)?.with_context(|| {
                    format!("Failed to acquire {} after cleanup", path.display())
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }
}

/// `$XDG_RUNTIME_DIR`, or `/tmp` when unset.
pub fn runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// `Ok(None)` when somebody else holds the lock.
fn try_lock(path: &Path) -> Result<Option<InstanceLock>> {
    // Not truncated: the current holder's PID must survive a failed attempt
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(InstanceLock {
        file,
        path: path.to_path_buf(),
    }))
}

/// PID recorded in a lock file, if it parses.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

pub fn is_process_running(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    kill(Pid::from_raw(pid), None).is_ok()
}

fn handle_lock_conflict(path: &Path) -> Result<()> {
    match read_lock_pid(path) {
        Some(pid) if is_process_running(pid) => {
            bail!("darkman is already running (PID: {pid})")
        }
        Some(pid) => {
            log_warning!("Removing stale lock file (process {pid} no longer running)");
        }
        None => {
            log_warning!("Lock file contains no valid PID, removing it");
        }
    }
    let _ = std::fs::remove_file(path);
    Ok(())
}
