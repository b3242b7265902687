//! Location updates from GeoClue.
//!
//! A GeoClue2 client is created on the system bus, identified as `darkman`,
//! and started. Every `LocationUpdated` signal points at a new location object;
//! its coordinates are cached and pushed to the scheduler as
//! [`SchedulerEvent::SourceUpdated`].

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::thread;
use zbus::blocking::Connection;
use zbus::zvariant::OwnedObjectPath;

use crate::constants::{GEOCLUE_DESKTOP_ID, GEOCLUE_DISTANCE_THRESHOLD, GEOCLUE_TIME_THRESHOLD};
use crate::core::SchedulerEvent;
use crate::geo::{Location, ScheduleSource};
use crate::service::cache::LocationCache;

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager"
)]
trait Manager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2"
)]
trait Client {
    fn start(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn desktop_id(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn distance_threshold(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_distance_threshold(&self, metres: u32) -> zbus::Result<()>;

    #[zbus(property)]
    fn time_threshold(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_time_threshold(&self, seconds: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn location_updated(
        &self,
        previous: OwnedObjectPath,
        current: OwnedObjectPath,
    ) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoclueLocation {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn altitude(&self) -> zbus::Result<f64>;
}

/// GeoClue reports an unknown altitude as `-DBL_MAX`.
pub fn sanitize_altitude(altitude: f64) -> f64 {
    if altitude.is_finite() && altitude > f64::MIN {
        altitude
    } else {
        0.0
    }
}

/// Start following GeoClue on a background thread.
///
/// Failures (no system bus, GeoClue not installed, access denied) are logged;
/// the daemon keeps running on whatever source it already has.
pub fn start_geoclue(sender: Sender<SchedulerEvent>, cache: LocationCache) -> Result<()> {
    thread::Builder::new()
        .name("darkman-geoclue".into())
        .spawn(move || {
            if let Err(e) = follow_location(&sender, &cache) {
                log_warning!("GeoClue error: {e:#}");
                log_indented!("Location updates will not be available");
            }
        })
        .context("Failed to spawn GeoClue thread")?;
    Ok(())
}

/// Returns `Ok` once the event channel closes.
fn follow_location(sender: &Sender<SchedulerEvent>, cache: &LocationCache) -> Result<()> {
    let connection = Connection::system().context("Failed to connect to system D-Bus")?;
    let manager =
        ManagerProxyBlocking::new(&connection).context("Failed to create GeoClue manager proxy")?;
    let client_path = manager
        .get_client()
        .context("Failed to obtain a GeoClue client")?;

    let client = ClientProxyBlocking::builder(&connection)
        .path(client_path)?
        .build()
        .context("Failed to create GeoClue client proxy")?;
    client
        .set_desktop_id(GEOCLUE_DESKTOP_ID)
        .context("Failed to set DesktopId")?;
    client
        .set_distance_threshold(GEOCLUE_DISTANCE_THRESHOLD)
        .context("Failed to set DistanceThreshold")?;
    client
        .set_time_threshold(GEOCLUE_TIME_THRESHOLD)
        .context("Failed to set TimeThreshold")?;

    let updates = client
        .receive_location_updated()
        .context("Failed to subscribe to LocationUpdated")?;
    client.start().context("Failed to start the GeoClue client")?;
    log_debug!("GeoClue client started");

    let mut last: Option<Location> = None;
    for signal in updates {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => {
                log_warning!("Failed to parse LocationUpdated args: {e}");
                continue;
            }
        };

        let location = match read_location(&connection, args.current.clone()) {
            Ok(location) => location,
            Err(e) => {
                log_warning!("Failed to read updated location: {e:#}");
                continue;
            }
        };
        if last == Some(location) {
            continue;
        }
        last = Some(location);

        log_info!("GeoClue location: {location}");
        if let Err(e) = cache.write(&location) {
            log_warning!("Failed to cache location: {e:#}");
        }
        if sender
            .send(SchedulerEvent::SourceUpdated(ScheduleSource::Location(location)))
            .is_err()
        {
            let _ = client.stop();
            return Ok(());
        }
    }

    anyhow::bail!("D-Bus connection lost: LocationUpdated signal stream ended")
}

fn read_location(connection: &Connection, path: OwnedObjectPath) -> Result<Location> {
    let proxy = GeoclueLocationProxyBlocking::builder(connection)
        .path(path)?
        .build()
        .context("Failed to create GeoClue location proxy")?;

    Ok(Location::new(
        proxy.latitude()?,
        proxy.longitude()?,
        sanitize_altitude(proxy.altitude()?),
    ))
}

#[cfg(test)]
mod tests {
    use super::sanitize_altitude;

    #[test]
    fn test_unknown_altitude_becomes_sea_level() {
        assert_eq!(sanitize_altitude(f64::MIN), 0.0);
        assert_eq!(sanitize_altitude(f64::NAN), 0.0);
        assert_eq!(sanitize_altitude(-12.5), -12.5);
        assert_eq!(sanitize_altitude(1450.0), 1450.0);
    }
}
