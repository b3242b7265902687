//! Geographic position and schedule sources.
//!
//! A [`ScheduleSource`] is everything the scheduler needs besides the clock:
//! either a [`Location`] whose sunrise and sundown are computed astronomically,
//! or a [`FixedSchedule`] that repeats the same wall-clock pair every day.
//!
//! The astronomical computation itself lives in [`solar`].

pub mod solar;

pub use solar::{CalculationError, SolarCalculator, SunCalculator, SunTimes};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on Earth.
///
/// Equality is bitwise on all three fields. Two fixes that differ in the last
/// bit are different locations; no proximity clustering happens here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(rename = "alt", default)]
    pub elevation: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
            && self.elevation.to_bits() == other.elevation.to_bits()
    }
}

impl Eq for Location {}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.4}°{ns}, {:.4}°{ew}, {:.0}m",
            self.latitude.abs(),
            self.longitude.abs(),
            self.elevation
        )
    }
}

/// A daily repeating sunrise/sundown pair in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSchedule {
    pub sunrise: NaiveTime,
    pub sundown: NaiveTime,
}

/// The scheduler's input: a location or a fixed daily schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSource {
    Location(Location),
    Fixed(FixedSchedule),
}

impl ScheduleSource {
    pub fn fixed(sunrise: NaiveTime, sundown: NaiveTime) -> Self {
        ScheduleSource::Fixed(FixedSchedule { sunrise, sundown })
    }
}

impl From<Location> for ScheduleSource {
    fn from(location: Location) -> Self {
        ScheduleSource::Location(location)
    }
}

impl fmt::Display for ScheduleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleSource::Location(location) => write!(f, "location ({location})"),
            ScheduleSource::Fixed(fixed) => write!(
                f,
                "fixed schedule (sunrise {}, sundown {})",
                fixed.sunrise.format("%H:%M"),
                fixed.sundown.format("%H:%M")
            ),
        }
    }
}

#[cfg(test)]
mod tests;
