//! `darkman get`: print the running daemon's mode.

use anyhow::Result;

use crate::io::dbus;
use crate::logger::Log;

/// Prints `light`, `dark`, or `null` on its own line so scripts can consume it.
pub fn handle_get_command() -> Result<()> {
    Log::set_enabled(false);
    let mode = dbus::get_mode()?;
    println!("{mode}");
    Ok(())
}
