//! `darkman run`: the daemon.
//!
//! Startup order matters: every listener (scripts, mode cache, D-Bus server,
//! XDG portal) is registered on the [`Service`] before the scheduler's first
//! tick, so the first real transition reaches all of them. The event producers (alarm, signals, config watcher, GeoClue,
//! resume and clock monitors) each get a clone of one channel sender; the
//! [`EventLoop`] on this thread is the only consumer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::mpsc::channel;

use crate::alarm::BootTimer;
use crate::config::{Config, ConfigWatcher, loading};
use crate::core::{
    ConfigurationError, EventLoop, Mode, ModeScheduler, SchedulerError, SchedulerEvent,
    SchedulerParams, determine_mode_for_instant,
};
use crate::geo::{ScheduleSource, SolarCalculator, SunCalculator};
use crate::io::dbus::DbusServer;
use crate::io::geoclue::start_geoclue;
use crate::io::lock::InstanceLock;
use crate::io::portal::PortalServer;
use crate::io::signals::{ShutdownToken, setup_signal_handler};
use crate::io::system_events::start_system_event_monitors;
use crate::logger::Log;
use crate::service::Service;
use crate::service::cache::{self, LocationCache, ModeCache};
use crate::service::scripts::ScriptRunner;
use crate::time_source::{RealTimeSource, TimeSource};

/// The mode to start in before the first tick.
///
/// Computed for `now` when a source is known. The cached mode is only a
/// fallback for when there is no source yet or the calculation fails.
pub fn initial_mode(
    cached: Option<Mode>,
    source: Option<&ScheduleSource>,
    calculator: &dyn SunCalculator,
    now: DateTime<Utc>,
) -> Mode {
    let computed = source.and_then(|source| {
        determine_mode_for_instant(source, calculator, now)
            .inspect_err(|e| log_warning!("Could not determine the initial mode: {e}"))
            .ok()
    });
    computed.or(cached).unwrap_or(Mode::Unknown)
}

/// The source to start with: configuration first, then the last GeoClue fix.
pub fn startup_source(
    config: &Config,
    location_cache: &LocationCache,
) -> Result<ScheduleSource, SchedulerError> {
    let configured = config.schedule_source().ok().flatten();
    if let Some(source) = configured {
        return Ok(source);
    }
    if let Some(location) = location_cache.read() {
        log_decorated!("Using cached location {location}");
        return Ok(ScheduleSource::Location(location));
    }
    Err(ConfigurationError::NoSource.into())
}

pub fn handle_run_command(debug_enabled: bool) -> Result<()> {
    let debug_from_env = std::env::var("DARKMAN_DEBUG").is_ok_and(|v| v == "1");
    Log::set_debug(debug_enabled || debug_from_env);
    log_version!();

    let config_path = loading::resolve_config_path()?;
    let config = Config::load_from_path(&config_path)?;
    config.log_config(&config_path);

    let lock = InstanceLock::acquire()?;
    log_debug!("Holding {}", lock.path().display());

    let cache_dir = cache::cache_dir()?;
    let mode_cache = Arc::new(ModeCache::new(&cache_dir));
    let location_cache = LocationCache::new(&cache_dir);

    // GeoClue may still deliver a location later
    let source = match startup_source(&config, &location_cache) {
        Ok(source) => Some(source),
        Err(SchedulerError::Configuration(ConfigurationError::NoSource)) if config.use_geoclue() => {
            log_decorated!("Waiting for GeoClue to report a location");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let calculator = SolarCalculator::new();
    let clock: Arc<dyn TimeSource> = Arc::new(RealTimeSource);
    let initial = initial_mode(
        mode_cache.read(),
        source.as_ref(),
        &calculator,
        clock.now().with_timezone(&Utc),
    );
    log_decorated!("Starting in {initial} mode");

    let service = Arc::new(Service::new(initial));
    service.add_listener(Arc::new(ScriptRunner::from_environment()))?;
    service.add_listener(mode_cache)?;
    if config.dbus_server() {
        let server = DbusServer::start(&service)?;
        service.add_listener(Arc::new(server))?;
    } else {
        log_decorated!("D-Bus server disabled");
    }
    if config.portal() {
        let portal = PortalServer::start(&service)?;
        service.add_listener(Arc::new(portal))?;
    } else {
        log_decorated!("XDG portal disabled");
    }

    let (sender, events) = channel::<SchedulerEvent>();
    let shutdown = ShutdownToken::new();
    let _signals = setup_signal_handler(sender.clone(), shutdown.clone())?;
    let timer = BootTimer::new(sender.clone())
        .map_err(SchedulerError::from)
        .context("Failed to create the suspend-aware alarm")?;
    if let Some(resolution) = BootTimer::resolution() {
        log_debug!("Boot clock resolution: {resolution:?}");
    }

    if let Err(e) = ConfigWatcher::new(config_path, config.clone(), sender.clone()).start() {
        log_warning!("Config hot reload unavailable: {e:#}");
    }
    if config.use_geoclue() {
        start_geoclue(sender.clone(), location_cache)?;
    }
    start_system_event_monitors(sender.clone())?;
    drop(sender);

    let sink_service = Arc::clone(&service);
    let scheduler = ModeScheduler::new(SchedulerParams {
        source,
        timer: Box::new(timer),
        calculator: Box::new(calculator),
        clock,
        sink: Box::new(move |mode| {
            sink_service.change_mode(mode);
        }),
    });

    EventLoop::new(scheduler, events, shutdown).run();

    log_block_start!("Shut down cleanly");
    log_end!();
    drop(lock);
    Ok(())
}
