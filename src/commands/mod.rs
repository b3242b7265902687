//! Command handlers for the darkman CLI.
//!
//! `run` starts the daemon; `get`, `set` and `toggle` are one-shot clients of
//! a running daemon's D-Bus service.

pub mod get;
pub mod run;
pub mod set;
