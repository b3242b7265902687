//! Sunrise and sundown calculation for schedule sources.
//!
//! [`SunCalculator`] is the seam the scheduler consumes. It answers one
//! question: given a source and a reference instant, when are the *next*
//! sunrise and the *next* sundown at or after that instant?
//!
//! ## Rollover
//!
//! Both boundaries start from the calendar day of the reference instant. A
//! boundary that has already passed is replaced by the following day's
//! occurrence, and sunrise and sundown roll over independently. At 22:00 the
//! answer is "tomorrow's sunrise, tomorrow's sundown"; at 12:00 it is
//! "tomorrow's sunrise, today's sundown".
//!
//! ## Calendar day
//!
//! For a [`Location`], the calendar day is the observer's mean solar day
//! (UTC shifted by four minutes per degree of longitude), which keeps each
//! day's sunrise and sundown on the same side of midnight regardless of the
//! machine's time zone. For a [`FixedSchedule`] the day is the wall-clock date
//! in the calculator's time zone.
//!
//! ## Degenerate geometry
//!
//! Inside the polar circles the sun may not rise or set at all. Those days
//! are reported as [`CalculationError::NoSunEvent`] rather than substituted.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::{FixedSchedule, Location, ScheduleSource};

/// Mean solar time offset per degree of longitude, in seconds.
const SECONDS_PER_DEGREE: f64 = 240.0;

/// Solar altitude at sunrise/sundown including refraction, in degrees.
const HORIZON_ALTITUDE_DEG: f64 = -0.833;

/// Maximum distance between a solar event and its day's solar noon, in hours.
const SOLAR_EVENT_WINDOW_HOURS: i64 = 12;

/// The next sunrise and sundown relative to some reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sundown: DateTime<Utc>,
}

impl SunTimes {
    /// The earlier of the two boundaries.
    pub fn earliest(&self) -> DateTime<Utc> {
        self.sunrise.min(self.sundown)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculationError {
    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("the sun does not rise and set on {date} at this location")]
    NoSunEvent { date: NaiveDate },

    #[error("local time {time} does not exist on {date}")]
    NonexistentLocalTime { date: NaiveDate, time: NaiveTime },
}

/// Computes the next sunrise and sundown for a schedule source.
#[cfg_attr(test, mockall::automock)]
pub trait SunCalculator: Send {
    fn next_sunrise_and_sundown(
        &self,
        source: &ScheduleSource,
        reference: DateTime<Utc>,
    ) -> Result<SunTimes, CalculationError>;
}

/// Astronomical calculator for locations, wall-clock calculator for fixed
/// schedules.
///
/// The time zone only matters for fixed schedules; it defaults to the
/// machine's local zone.
#[derive(Debug, Clone)]
pub struct SolarCalculator<Tz: TimeZone = Local> {
    timezone: Tz,
}

impl SolarCalculator<Local> {
    pub fn new() -> Self {
        Self { timezone: Local }
    }
}

impl Default for SolarCalculator<Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tz: TimeZone> SolarCalculator<Tz> {
    pub fn with_timezone(timezone: Tz) -> Self {
        Self { timezone }
    }

    fn next_for_location(
        &self,
        location: &Location,
        reference: DateTime<Utc>,
    ) -> Result<SunTimes, CalculationError> {
        let date = observer_date(location, reference);
        let today = solar_events(location, date)?;
        roll_over(today, reference, || {
            solar_events(location, next_day(date)?)
        })
    }

    fn next_for_fixed(
        &self,
        fixed: &FixedSchedule,
        reference: DateTime<Utc>,
    ) -> Result<SunTimes, CalculationError> {
        let date = reference.with_timezone(&self.timezone).date_naive();
        let on = |date: NaiveDate| -> Result<SunTimes, CalculationError> {
            Ok(SunTimes {
                sunrise: wall_clock_instant(&self.timezone, date, fixed.sunrise)?,
                sundown: wall_clock_instant(&self.timezone, date, fixed.sundown)?,
            })
        };
        roll_over(on(date)?, reference, || on(next_day(date)?))
    }
}

impl<Tz> SunCalculator for SolarCalculator<Tz>
where
    Tz: TimeZone + Send,
{
    fn next_sunrise_and_sundown(
        &self,
        source: &ScheduleSource,
        reference: DateTime<Utc>,
    ) -> Result<SunTimes, CalculationError> {
        match source {
            ScheduleSource::Location(location) => self.next_for_location(location, reference),
            ScheduleSource::Fixed(fixed) => self.next_for_fixed(fixed, reference),
        }
    }
}

/// Replace each boundary that lies before `reference` with tomorrow's.
///
/// Tomorrow is only computed when needed.
fn roll_over<F>(
    today: SunTimes,
    reference: DateTime<Utc>,
    tomorrow: F,
) -> Result<SunTimes, CalculationError>
where
    F: FnOnce() -> Result<SunTimes, CalculationError>,
{
    if today.sunrise >= reference && today.sundown >= reference {
        return Ok(today);
    }
    let tomorrow = tomorrow()?;
    Ok(SunTimes {
        sunrise: if today.sunrise < reference {
            tomorrow.sunrise
        } else {
            today.sunrise
        },
        sundown: if today.sundown < reference {
            tomorrow.sundown
        } else {
            today.sundown
        },
    })
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, CalculationError> {
    date.succ_opt().ok_or(CalculationError::NoSunEvent { date })
}

/// The observer's mean solar date at `instant`.
fn observer_date(location: &Location, instant: DateTime<Utc>) -> NaiveDate {
    let offset = TimeDelta::seconds((location.longitude * SECONDS_PER_DEGREE) as i64);
    (instant + offset).date_naive()
}

/// Mean solar noon of `date` at the observer's longitude.
fn observer_noon(location: &Location, date: NaiveDate) -> DateTime<Utc> {
    let offset = TimeDelta::seconds((location.longitude * SECONDS_PER_DEGREE) as i64);
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + TimeDelta::hours(12) - offset
}

/// Whether the sun crosses the horizon at all on `date`.
///
/// Uses the cosine of the sunrise hour angle with an approximate declination.
/// Values outside [-1, 1] mean polar night or midnight sun.
fn sun_crosses_horizon(latitude: f64, date: NaiveDate) -> bool {
    let day_of_year = date.ordinal() as f64;
    let declination =
        (-23.44_f64).to_radians() * ((360.0 / 365.0) * (day_of_year + 10.0)).to_radians().cos();
    let phi = latitude.to_radians();
    let cos_hour_angle = (HORIZON_ALTITUDE_DEG.to_radians().sin() - phi.sin() * declination.sin())
        / (phi.cos() * declination.cos());
    cos_hour_angle.is_finite() && (-1.0..=1.0).contains(&cos_hour_angle)
}

/// Sunrise and sundown on the observer's `date`.
fn solar_events(location: &Location, date: NaiveDate) -> Result<SunTimes, CalculationError> {
    let coordinates = Coordinates::new(location.latitude, location.longitude).ok_or(
        CalculationError::InvalidCoordinates {
            latitude: location.latitude,
            longitude: location.longitude,
        },
    )?;

    if !sun_crosses_horizon(location.latitude, date) {
        return Err(CalculationError::NoSunEvent { date });
    }

    // Negative or unknown elevations are clamped to sea level.
    let day = SolarDay::new(coordinates, date).with_altitude(location.elevation.max(0.0));
    let times = SunTimes {
        sunrise: day.event_time(SolarEvent::Sunrise),
        sundown: day.event_time(SolarEvent::Sunset),
    };

    let noon = observer_noon(location, date);
    let window = TimeDelta::hours(SOLAR_EVENT_WINDOW_HOURS);
    let plausible = times.sunrise < times.sundown
        && (times.sunrise - noon).abs() <= window
        && (times.sundown - noon).abs() <= window;
    if !plausible {
        return Err(CalculationError::NoSunEvent { date });
    }

    Ok(times)
}

/// Map a wall-clock time on `date` to an instant.
///
/// An ambiguous time (clocks going back) resolves to its first occurrence. A
/// time skipped by a forward jump resolves to one hour later.
fn wall_clock_instant<Tz: TimeZone>(
    timezone: &Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Utc>, CalculationError> {
    let naive = date.and_time(time);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or(CalculationError::NonexistentLocalTime { date, time })
}
