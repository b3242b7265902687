//! The presentation mode and its textual form.

use std::fmt;
use std::str::FromStr;

/// The day/night presentation state.
///
/// `Unknown` is the value before the first tick has produced a decision. It
/// renders as `null`, which is also what clients see over D-Bus in that state.
#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Mode {
    #[default]
    Unknown,
    Light,
    Dark,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Unknown => "null",
            Mode::Light => "light",
            Mode::Dark => "dark",
        }
    }

    /// The mode a toggle switches to. An unknown mode toggles to dark.
    pub fn toggled(&self) -> Mode {
        match self {
            Mode::Light | Mode::Unknown => Mode::Dark,
            Mode::Dark => Mode::Light,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Mode::Unknown)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that are not `light` or `dark`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mode {0:?}, expected \"light\" or \"dark\"")]
pub struct InvalidMode(pub String);

impl FromStr for Mode {
    type Err = InvalidMode;

    /// Parse one of the two settable modes.
    ///
    /// Surrounding whitespace is ignored so cached files with a trailing
    /// newline parse. `null` is rejected: it is never a valid target state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Mode::Light),
            "dark" => Ok(Mode::Dark),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}
