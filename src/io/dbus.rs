//! The `nl.whynothugo.darkman` session-bus service and its client.
//!
//! The daemon exports one object with a read/write `Mode` property and a
//! `ModeChanged` signal. Writing the property is how `darkman set` and
//! `darkman toggle` (or any other D-Bus client) request a switch; the request
//! goes through [`Service::change_mode`] like a scheduler decision would.
//!
//! ```text
//! busctl --user get-property nl.whynothugo.darkman /nl/whynothugo/darkman \
//!     nl.whynothugo.darkman Mode
//! ```

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use zbus::blocking::Connection;
use zbus::object_server::SignalEmitter;

use crate::constants::{DBUS_OBJECT_PATH, DBUS_SERVICE_NAME};
use crate::core::Mode;
use crate::service::{ModeListener, Service};

/// The exported object.
///
/// Holds the service weakly: the service owns the listener that owns the
/// connection serving this object.
#[derive(Clone)]
pub struct DarkmanInterface {
    service: Weak<Service>,
    /// A change requested by writing `Mode`, for which zbus has already
    /// emitted `PropertiesChanged`.
    bus_request: Arc<Mutex<Option<Mode>>>,
}

impl DarkmanInterface {
    pub fn new(service: &Arc<Service>) -> Self {
        Self {
            service: Arc::downgrade(service),
            bus_request: Arc::default(),
        }
    }

    fn pending_request(&self) -> std::sync::MutexGuard<'_, Option<Mode>> {
        self.bus_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the change to `mode` came from a `Mode` write. Clears it.
    pub fn take_bus_request(&self, mode: Mode) -> bool {
        let mut pending = self.pending_request();
        if *pending == Some(mode) {
            *pending = None;
            return true;
        }
        false
    }

    fn current(&self) -> Mode {
        self.service
            .upgrade()
            .map(|service| service.current_mode())
            .unwrap_or_default()
    }
}

#[zbus::interface(name = "nl.whynothugo.darkman")]
impl DarkmanInterface {
    /// `light`, `dark`, or `null` before the first decision.
    #[zbus(property)]
    fn mode(&self) -> String {
        self.current().as_str().to_string()
    }

    #[zbus(property)]
    fn set_mode(&mut self, value: &str) -> zbus::fdo::Result<()> {
        let mode = parse_requested_mode(value)?;
        log_info!("Mode {mode} requested over D-Bus");
        if let Some(service) = self.service.upgrade() {
            // Recorded before the change is queued so the listener sees it
            *self.pending_request() = Some(mode);
            if service.change_mode(mode).is_none() {
                *self.pending_request() = None;
            }
        }
        Ok(())
    }

    #[zbus(signal, name = "ModeChanged")]
    async fn mode_changed_signal(emitter: &SignalEmitter<'_>, new_mode: &str)
    -> zbus::Result<()>;
}

/// Only `light` and `dark` may be requested.
pub fn parse_requested_mode(value: &str) -> zbus::fdo::Result<Mode> {
    value
        .parse()
        .map_err(|e: crate::core::InvalidMode| zbus::fdo::Error::InvalidArgs(e.to_string()))
}

/// Keeps the bus name and emits change notifications.
pub struct DbusServer {
    connection: Connection,
    interface: DarkmanInterface,
}

impl DbusServer {
    /// Claim the well-known name on the session bus and export the object.
    pub fn start(service: &Arc<Service>) -> Result<Self> {
        let interface = DarkmanInterface::new(service);
        let connection = zbus::blocking::connection::Builder::session()
            .context("Failed to connect to the session bus")?
            .name(DBUS_SERVICE_NAME)
            .context("Invalid D-Bus service name")?
            .serve_at(DBUS_OBJECT_PATH, interface.clone())
            .context("Failed to export the darkman object")?
            .build()
            .with_context(|| format!("Failed to claim {DBUS_SERVICE_NAME} on the session bus"))?;

        log_decorated!("Serving {DBUS_SERVICE_NAME} on the session bus");
        Ok(Self {
            connection,
            interface,
        })
    }

    fn emit(&self, mode: Mode) -> Result<()> {
        let emitter = SignalEmitter::new(self.connection.inner(), DBUS_OBJECT_PATH)
            .context("Invalid object path")?;
        // zbus already announced the property after a `Mode` write
        let property_announced = self.interface.take_bus_request(mode);
        zbus::block_on(async {
            if !property_announced {
                self.interface.mode_changed(&emitter).await?;
            }
            DarkmanInterface::mode_changed_signal(&emitter, mode.as_str()).await
        })
        .context("Failed to emit mode change signals")
    }
}

impl ModeListener for DbusServer {
    fn name(&self) -> &str {
        "dbus"
    }

    fn on_mode_changed(&self, mode: Mode) -> Result<()> {
        self.emit(mode)
    }
}

#[zbus::proxy(
    interface = "nl.whynothugo.darkman",
    default_service = "nl.whynothugo.darkman",
    default_path = "/nl/whynothugo/darkman"
)]
trait Darkman {
    #[zbus(property)]
    fn mode(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_mode(&self, value: &str) -> zbus::Result<()>;
}

fn proxy(connection: &Connection) -> Result<DarkmanProxyBlocking<'_>> {
    DarkmanProxyBlocking::new(connection).context("Failed to create darkman proxy")
}

fn session() -> Result<Connection> {
    Connection::session().context("Failed to connect to the session bus")
}

/// Ask the running daemon for its mode.
pub fn get_mode() -> Result<Mode> {
    let connection = session()?;
    let value = proxy(&connection)?
        .mode()
        .context("Failed to query the running darkman (is it running?)")?;

    // `null` before the first decision
    Ok(value.parse().unwrap_or_default())
}

/// Ask the running daemon to switch to `mode`.
pub fn set_mode(mode: Mode) -> Result<()> {
    let connection = session()?;
    proxy(&connection)?
        .set_mode(mode.as_str())
        .with_context(|| format!("Failed to set {mode} mode (is darkman running?)"))
}

/// Switch the running daemon to the opposite mode and return the new one.
pub fn toggle_mode() -> Result<Mode> {
    let target = get_mode()?.toggled();
    set_mode(target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_mode_validation() {
        assert_eq!(parse_requested_mode("dark").unwrap(), Mode::Dark);
        assert_eq!(parse_requested_mode("light").unwrap(), Mode::Light);

        for value in ["null", "Dark", "auto", ""] {
            assert!(matches!(
                parse_requested_mode(value),
                Err(zbus::fdo::Error::InvalidArgs(_))
            ));
        }
    }

    #[test]
    fn test_interface_reflects_service() {
        crate::logger::Log::set_enabled(false);
        let service = Arc::new(Service::new(Mode::Unknown));
        let mut interface = DarkmanInterface::new(&service);
        assert_eq!(interface.mode(), "null");

        interface.set_mode("dark").unwrap();
        assert_eq!(service.current_mode(), Mode::Dark);
        assert_eq!(interface.mode(), "dark");

        assert!(interface.set_mode("dim").is_err());
        assert_eq!(interface.mode(), "dark");

        drop(service);
        assert_eq!(interface.mode(), "null");
    }

    #[test]
    fn test_bus_writes_are_announced_once() {
        crate::logger::Log::set_enabled(false);
        let service = Arc::new(Service::new(Mode::Light));
        let mut interface = DarkmanInterface::new(&service);
        let served = interface.clone();

        interface.set_mode("dark").unwrap();
        assert!(served.take_bus_request(Mode::Dark));
        assert!(!served.take_bus_request(Mode::Dark));

        // No change, nothing for the listener to skip
        interface.set_mode("dark").unwrap();
        assert!(!served.take_bus_request(Mode::Dark));

        // Scheduler changes still get PropertiesChanged from the listener
        service.change_mode(Mode::Light);
        assert!(!served.take_bus_request(Mode::Light));
    }
}
