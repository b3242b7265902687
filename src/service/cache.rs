//! Last-known mode and location, persisted under the XDG cache directory.
//!
//! - `$XDG_CACHE_HOME/darkman/mode.txt`: `light` or `dark`
//! - `$XDG_CACHE_HOME/darkman/location.json`: `{"lat": .., "lng": .., "alt": ..}`
//!
//! Both are best-effort: unreadable or malformed files are treated as absent.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ModeListener;
use crate::constants::{APP_DIR_NAME, LOCATION_CACHE_FILE, MODE_CACHE_FILE};
use crate::core::Mode;
use crate::geo::Location;

/// `$XDG_CACHE_HOME/darkman`.
pub fn cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .context("could not determine the cache directory")
}

/// Write `contents` to `path` via a temporary file and rename.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents)?;
    file.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Persists every mode change to `mode.txt`.
pub struct ModeCache {
    path: PathBuf,
}

impl ModeCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(MODE_CACHE_FILE),
        }
    }

    /// The cached mode, if the file holds exactly `light` or `dark`.
    pub fn read(&self) -> Option<Mode> {
        fs::read_to_string(&self.path).ok()?.parse().ok()
    }

    pub fn write(&self, mode: Mode) -> Result<()> {
        write_atomically(&self.path, mode.as_str().as_bytes())
    }
}

impl ModeListener for ModeCache {
    fn name(&self) -> &str {
        "mode-cache"
    }

    fn on_mode_changed(&self, mode: Mode) -> Result<()> {
        self.write(mode)
    }
}

/// Remembers the last location reported by GeoClue.
pub struct LocationCache {
    path: PathBuf,
}

impl LocationCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(LOCATION_CACHE_FILE),
        }
    }

    pub fn read(&self) -> Option<Location> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(location) => Some(location),
            Err(e) => {
                log_warning!("Ignoring malformed location cache: {e}");
                None
            }
        }
    }

    pub fn write(&self, location: &Location) -> Result<()> {
        let json = serde_json::to_vec(location).context("failed to serialize location")?;
        write_atomically(&self.path, &json)
    }
}
