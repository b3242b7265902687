//! Application constants and default values for darkman.
//!
//! Configuration defaults, validation limits, protocol names, and the timing
//! constants used by the scheduler loop all live here.

use std::time::Duration;

// ═══ Application Configuration Defaults ═══
// Used when an option is absent from both the config file and the environment

pub const DEFAULT_USE_GEOCLUE: bool = false;
pub const DEFAULT_DBUS_SERVER: bool = true;
pub const DEFAULT_PORTAL: bool = true;
pub const DEFAULT_ALTITUDE: f64 = 0.0; // metres above sea level

// ═══ Validation Limits ═══

pub const MINIMUM_LATITUDE: f64 = -90.0;
pub const MAXIMUM_LATITUDE: f64 = 90.0;
pub const MINIMUM_LONGITUDE: f64 = -180.0;
pub const MAXIMUM_LONGITUDE: f64 = 180.0;

// ═══ Scheduler Timing ═══

/// Forward margin added to "now" before computing the next boundaries.
///
/// The boot-clock alarm may fire a few milliseconds early after rounding, so
/// each tick evaluates the state as of slightly in the future.
pub const TICK_MARGIN: Duration = Duration::from_secs(60);

/// Smallest duration handed to the OS alarm. A zero expiry would disarm it.
pub const MINIMUM_ALARM_DURATION: Duration = Duration::from_nanos(1);

/// How long the event loop blocks before re-checking the shutdown token.
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Debounce window for configuration file changes.
pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(500);

/// Number of listener outcomes kept for inspection.
pub const OUTCOME_HISTORY_LIMIT: usize = 32;

// ═══ D-Bus ═══

pub const DBUS_SERVICE_NAME: &str = "nl.whynothugo.darkman";
pub const DBUS_OBJECT_PATH: &str = "/nl/whynothugo/darkman";

// ═══ XDG Desktop Portal ═══

pub const PORTAL_SERVICE_NAME: &str = "org.freedesktop.impl.portal.desktop.darkman";
pub const PORTAL_OBJECT_PATH: &str = "/org/freedesktop/portal/desktop";
pub const PORTAL_APPEARANCE_NAMESPACE: &str = "org.freedesktop.appearance";
pub const PORTAL_COLOR_SCHEME_KEY: &str = "color-scheme";
pub const PORTAL_DARKMAN_NAMESPACE: &str = "nl.whynothugo.darkman";
pub const PORTAL_STATUS_KEY: &str = "status";
pub const PORTAL_SETTINGS_VERSION: u32 = 1;

// ═══ GeoClue ═══

pub const GEOCLUE_DESKTOP_ID: &str = "darkman";
pub const GEOCLUE_DISTANCE_THRESHOLD: u32 = 40_000; // metres
pub const GEOCLUE_TIME_THRESHOLD: u32 = 3600 * 4; // seconds

// ═══ Paths ═══

pub const APP_DIR_NAME: &str = "darkman";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const MODE_CACHE_FILE: &str = "mode.txt";
pub const LOCATION_CACHE_FILE: &str = "location.json";
pub const LOCK_FILE_NAME: &str = "darkman.lock";

// ═══ Exit Codes ═══

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
