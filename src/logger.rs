//! Structured logging with box-drawing output.
//!
//! Every line the daemon prints goes through the macros defined here. The
//! layout draws one continuous vertical rule down the terminal:
//!
//! ```text
//! ┏ darkman v0.1.0 ━━╸
//! ┃
//! ┣ Loading configuration
//! ┃   Source: fixed schedule (07:00 / 19:00)
//! ┃
//! ┣[INFO] Switching to dark mode
//! ╹
//! ```
//!
//! ## Conventions
//!
//! - **`log_block_start!`** opens a new conceptual block. It prints an empty
//!   `┃` spacer first, so do not precede it with `log_pipe!`.
//! - **`log_decorated!`** continues a block (`┣ message`).
//! - **`log_indented!`** lists details under the preceding line (`┃   message`).
//! - **`log_pipe!`** inserts a spacer, mostly before a semantic level macro that
//!   starts a block of its own.
//! - **`log_version!`** / **`log_end!`** bracket a daemon run.
//! - **`log_info!`**, **`log_warning!`**, **`log_error!`** carry a colored
//!   `[LEVEL]` tag. **`log_debug!`** is additionally gated by
//!   [`Log::set_debug`].
//! - **`log_error_exit!`** closes the rule with `┗` and is used right before a
//!   non-zero exit.
//!
//! Output can be switched off at runtime with [`Log::set_enabled`], which the
//! one-shot client commands and the test suites rely on.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Runtime switches for the logger.
pub struct Log;

impl Log {
    /// Enable or disable all log output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable `log_debug!` output and per-line timestamps.
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Timestamp prefix shown in debug mode, empty otherwise.
    fn prefix() -> String {
        if Self::is_debug() {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S%.3f"))
        } else {
            String::new()
        }
    }
}

/// Semantic log levels rendered as colored tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Debug,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Debug => "\x1b[36mDEBUG\x1b[0m",
        }
    }
}

/// Shape of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Version,
    BlockStart,
    Decorated,
    Indented,
    Pipe,
    End,
    Level(Level),
    ErrorExit,
}

/// Render a line according to its shape. Used by the macros.
pub fn render(line: Line, message: fmt::Arguments<'_>) -> String {
    let prefix = Log::prefix();
    match line {
        Line::Version => format!("{prefix}┏ darkman v{} ━━╸\n", env!("CARGO_PKG_VERSION")),
        Line::BlockStart => format!("{prefix}┃\n{prefix}┣ {message}\n"),
        Line::Decorated => format!("{prefix}┣ {message}\n"),
        Line::Indented => format!("{prefix}┃   {message}\n"),
        Line::Pipe => format!("{prefix}┃\n"),
        Line::End => format!("{prefix}╹\n"),
        Line::Level(level) => format!("{prefix}┣[{}] {message}\n", level.tag()),
        Line::ErrorExit => format!(
            "{prefix}┃\n{prefix}┗[{}] {message}\n",
            Level::Error.tag()
        ),
    }
}

/// Write a rendered line if logging is enabled.
pub fn emit(line: Line, message: fmt::Arguments<'_>) {
    if !Log::is_enabled() {
        return;
    }
    if line == Line::Level(Level::Debug) && !Log::is_debug() {
        return;
    }
    let text = render(line, message);
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

// # Logging Macros

/// Print the startup header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::emit($crate::logger::Line::Version, format_args!(""))
    };
}

/// Print the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::emit($crate::logger::Line::End, format_args!(""))
    };
}

/// Insert an empty `┃` spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::emit($crate::logger::Line::Pipe, format_args!(""))
    };
}

/// Start a new block of related lines.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Line::BlockStart, format_args!($($arg)*))
    };
}

/// Continue the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Line::Decorated, format_args!($($arg)*))
    };
}

/// Detail line nested under the previous message.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Line::Indented, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::emit(
            $crate::logger::Line::Level($crate::logger::Level::Info),
            format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logger::emit(
            $crate::logger::Line::Level($crate::logger::Level::Warning),
            format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::emit(
            $crate::logger::Line::Level($crate::logger::Level::Error),
            format_args!($($arg)*),
        )
    };
}

/// Debug line, only shown when debug output is switched on.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::emit(
            $crate::logger::Line::Level($crate::logger::Level::Debug),
            format_args!($($arg)*),
        )
    };
}

/// Error that ends the run, closing the vertical rule.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Line::ErrorExit, format_args!($($arg)*))
    };
}
