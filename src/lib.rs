//! # Darkman Library
//!
//! Internal library for the darkman binary: a daemon that switches between
//! light and dark mode at sunrise and sundown, and keeps doing so correctly
//! across suspend and resume.
//!
//! This library exists to enable testing of the internals and to keep CLI
//! dispatch (main.rs) separate from application logic.
//!
//! ## Architecture
//!
//! - **Core Logic**: `core` holds [`core::ModeScheduler`], the tick state
//!   machine, and the [`core::EventLoop`] that serializes every wake-up
//! - **Alarm**: `alarm` provides the suspend-aware one-shot timer
//!   (`CLOCK_BOOTTIME` timerfd, plus a simulated one for tests)
//! - **Geographic**: `geo` computes the next sunrise and sundown for a
//!   location or a fixed daily schedule
//! - **Service**: `service` deduplicates reported modes and fans changes out
//!   to transition scripts, the mode cache and the D-Bus server
//! - **Configuration**: `config` for TOML settings with env overrides and
//!   hot reload
//! - **Infrastructure**: `io` for signals, D-Bus, GeoClue, resume/clock-change
//!   monitoring and the instance lock; `logger` for output

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod alarm;
pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod geo;
pub mod io;
pub mod service;
pub mod time_source;
