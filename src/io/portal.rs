//! Backend for the XDG desktop portal's Settings interface.
//!
//! `xdg-desktop-portal` forwards `org.freedesktop.appearance color-scheme`
//! lookups to the backend named in `portals.conf`. darkman serves that key on
//! `org.freedesktop.impl.portal.desktop.darkman` and emits `SettingChanged`
//! on every transition, so portal-aware applications follow the mode without
//! any scripts.
//!
//! | mode      | `color-scheme` |
//! |-----------|----------------|
//! | `null`    | 0 (no preference) |
//! | `dark`    | 1 (prefer dark) |
//! | `light`   | 2 (prefer light) |

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use zbus::blocking::Connection;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::{OwnedValue, Value};

use crate::constants::{
    PORTAL_APPEARANCE_NAMESPACE, PORTAL_COLOR_SCHEME_KEY, PORTAL_DARKMAN_NAMESPACE,
    PORTAL_OBJECT_PATH, PORTAL_SERVICE_NAME, PORTAL_SETTINGS_VERSION, PORTAL_STATUS_KEY,
};
use crate::core::Mode;
use crate::service::{ModeListener, Service};

/// The portal's `color-scheme` value for `mode`.
pub fn color_scheme(mode: Mode) -> u32 {
    match mode {
        Mode::Unknown => 0,
        Mode::Dark => 1,
        Mode::Light => 2,
    }
}

/// Whether a `ReadAll` namespace pattern selects `namespace`.
///
/// An empty pattern selects everything; a trailing `*` matches by prefix.
pub fn namespace_matches(pattern: &str, namespace: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => namespace.starts_with(prefix),
        None => pattern == namespace,
    }
}

#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "org.freedesktop.portal.Error")]
pub enum PortalError {
    #[zbus(error)]
    ZBus(zbus::Error),
    NotFound(String),
}

#[derive(Clone)]
pub struct PortalSettings {
    service: Weak<Service>,
}

impl PortalSettings {
    pub fn new(service: &Arc<Service>) -> Self {
        Self {
            service: Arc::downgrade(service),
        }
    }

    fn current(&self) -> Mode {
        self.service
            .upgrade()
            .map(|service| service.current_mode())
            .unwrap_or_default()
    }

    /// Every setting served, grouped by namespace.
    fn settings(&self) -> [(&'static str, &'static str, Value<'static>); 2] {
        [
            (
                PORTAL_APPEARANCE_NAMESPACE,
                PORTAL_COLOR_SCHEME_KEY,
                Value::from(color_scheme(self.current())),
            ),
            (
                PORTAL_DARKMAN_NAMESPACE,
                PORTAL_STATUS_KEY,
                Value::from("running"),
            ),
        ]
    }
}

fn to_owned(value: &Value<'_>) -> Result<OwnedValue, PortalError> {
    value
        .try_to_owned()
        .map_err(|e| PortalError::ZBus(zbus::Error::Variant(e)))
}

#[zbus::interface(name = "org.freedesktop.impl.portal.Settings")]
impl PortalSettings {
    fn read(&self, namespace: &str, key: &str) -> Result<OwnedValue, PortalError> {
        let found = self
            .settings()
            .into_iter()
            .find(|(ns, k, _)| *ns == namespace && *k == key);
        match found {
            Some((_, _, value)) => to_owned(&value),
            None => {
                log_debug!("Portal request for unknown setting {namespace} {key}");
                Err(PortalError::NotFound(
                    "Requested setting not found".to_string(),
                ))
            }
        }
    }

    fn read_all(
        &self,
        namespaces: Vec<String>,
    ) -> Result<HashMap<String, HashMap<String, OwnedValue>>, PortalError> {
        let mut values: HashMap<String, HashMap<String, OwnedValue>> = HashMap::new();
        for (namespace, key, value) in self.settings() {
            let selected = namespaces.is_empty()
                || namespaces
                    .iter()
                    .any(|pattern| namespace_matches(pattern, namespace));
            if selected {
                values
                    .entry(namespace.to_string())
                    .or_default()
                    .insert(key.to_string(), to_owned(&value)?);
            }
        }
        Ok(values)
    }

    #[zbus(property)]
    fn version(&self) -> u32 {
        PORTAL_SETTINGS_VERSION
    }

    #[zbus(signal)]
    async fn setting_changed(
        emitter: &SignalEmitter<'_>,
        namespace: &str,
        key: &str,
        value: Value<'_>,
    ) -> zbus::Result<()>;
}

/// Owns the portal backend's bus name and announces mode changes.
pub struct PortalServer {
    connection: Connection,
}

impl PortalServer {
    pub fn start(service: &Arc<Service>) -> Result<Self> {
        let connection = zbus::blocking::connection::Builder::session()
            .context("Failed to connect to the session bus")?
            .name(PORTAL_SERVICE_NAME)
            .context("Invalid portal service name")?
            .serve_at(PORTAL_OBJECT_PATH, PortalSettings::new(service))
            .context("Failed to export the portal settings object")?
            .build()
            .with_context(|| format!("Failed to claim {PORTAL_SERVICE_NAME} on the session bus"))?;

        log_decorated!("Serving {PORTAL_SERVICE_NAME} on the session bus");
        Ok(Self { connection })
    }
}

impl ModeListener for PortalServer {
    fn name(&self) -> &str {
        "portal"
    }

    fn on_mode_changed(&self, mode: Mode) -> Result<()> {
        let emitter = SignalEmitter::new(self.connection.inner(), PORTAL_OBJECT_PATH)
            .context("Invalid object path")?;
        zbus::block_on(PortalSettings::setting_changed(
            &emitter,
            PORTAL_APPEARANCE_NAMESPACE,
            PORTAL_COLOR_SCHEME_KEY,
            Value::from(color_scheme(mode)),
        ))
        .context("Failed to emit SettingChanged")
    }
}
