//! Configuration for the darkman daemon.
//!
//! ## Configuration Sources
//!
//! 1. `--config <dir>`: `<dir>/config.toml`
//! 2. **XDG_CONFIG_HOME**/darkman/config.toml
//! 3. each of **XDG_CONFIG_DIRS** (default `/etc/xdg`), first match wins
//!
//! A missing file is not an error: the daemon then relies on the environment,
//! GeoClue, or the location cache. `DARKMAN_*` environment variables override
//! whatever the file says.
//!
//! ## Configuration Structure
//!
//! ```toml
//! #[Fixed schedule] (takes precedence over coordinates)
//! sunrise = "07:00"      # Local wall-clock time (HH:MM or HH:MM:SS)
//! sunset = "19:30"
//!
//! #[Static location]
//! lat = 52.3             # Latitude in degrees (-90 to 90)
//! lng = 4.8              # Longitude in degrees (-180 to 180)
//! alt = 0                # Altitude in metres (optional)
//!
//! #[Integrations]
//! usegeoclue = false     # Follow the location reported by GeoClue
//! dbusserver = true      # Expose nl.whynothugo.darkman on the session bus
//! portal = true          # Serve the color-scheme setting to the XDG portal
//! ```
//!
//! Unknown keys are rejected so typos do not silently fall back to defaults.

pub mod loading;
pub mod validation;
pub mod watcher;

pub use loading::{get_config_path, get_custom_config_dir, set_config_dir};
pub use watcher::ConfigWatcher;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    DEFAULT_ALTITUDE, DEFAULT_DBUS_SERVER, DEFAULT_PORTAL, DEFAULT_USE_GEOCLUE,
};
use crate::geo::{Location, ScheduleSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub alt: Option<f64>,
    pub sunrise: Option<String>, // "HH:MM" or "HH:MM:SS"
    pub sunset: Option<String>,
    pub usegeoclue: Option<bool>,
    pub dbusserver: Option<bool>,
    pub portal: Option<bool>,
}

impl Config {
    /// Load a specific file (missing means empty), then overrides and validation.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        loading::load_from_path(path)
    }

    pub fn use_geoclue(&self) -> bool {
        self.usegeoclue.unwrap_or(DEFAULT_USE_GEOCLUE)
    }

    pub fn dbus_server(&self) -> bool {
        self.dbusserver.unwrap_or(DEFAULT_DBUS_SERVER)
    }

    pub fn portal(&self) -> bool {
        self.portal.unwrap_or(DEFAULT_PORTAL)
    }

    /// The static location, if both coordinates are set.
    pub fn location(&self) -> Option<Location> {
        Some(Location::new(
            self.lat?,
            self.lng?,
            self.alt.unwrap_or(DEFAULT_ALTITUDE),
        ))
    }

    /// The schedule source described by this configuration.
    ///
    /// A fixed sunrise/sunset pair wins over coordinates. `None` means the
    /// source has to come from elsewhere (GeoClue or the location cache).
    pub fn schedule_source(&self) -> Result<Option<ScheduleSource>> {
        if let (Some(sunrise), Some(sunset)) = (&self.sunrise, &self.sunset) {
            let sunrise = validation::parse_time_of_day(sunrise, "sunrise")?;
            let sundown = validation::parse_time_of_day(sunset, "sunset")?;
            return Ok(Some(ScheduleSource::fixed(sunrise, sundown)));
        }
        Ok(self.location().map(ScheduleSource::Location))
    }

    /// Print the effective configuration.
    pub fn log_config(&self, path: &Path) {
        log_block_start!("Loaded configuration from {}", path.display());
        match self.schedule_source() {
            Ok(Some(source)) => log_indented!("Source: {source}"),
            Ok(None) if self.use_geoclue() => log_indented!("Source: GeoClue"),
            Ok(None) => log_indented!("Source: none configured"),
            Err(e) => log_indented!("Source: invalid ({e})"),
        }
        log_indented!("GeoClue: {}", if self.use_geoclue() { "on" } else { "off" });
        log_indented!(
            "D-Bus server: {}",
            if self.dbus_server() { "on" } else { "off" }
        );
        log_indented!("XDG portal: {}", if self.portal() { "on" } else { "off" });
    }
}
