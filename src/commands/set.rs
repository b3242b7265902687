//! `darkman set` and `darkman toggle`.

use anyhow::Result;

use crate::core::Mode;
use crate::io::dbus;
use crate::logger::Log;

pub fn handle_set_command(mode: Mode) -> Result<()> {
    Log::set_enabled(false);
    dbus::set_mode(mode)
}

/// Prints the mode that was switched to.
pub fn handle_toggle_command() -> Result<()> {
    Log::set_enabled(false);
    let mode = dbus::toggle_mode()?;
    println!("{mode}");
    Ok(())
}
