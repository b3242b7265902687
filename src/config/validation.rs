//! Configuration validation.

use anyhow::{Result, bail};
use chrono::NaiveTime;

use super::Config;
use crate::constants::*;

/// Reject configurations that cannot produce a sensible schedule.
pub fn validate_config(config: &Config) -> Result<()> {
    match (config.lat, config.lng) {
        (Some(_), None) => bail!("lat is set but lng is missing"),
        (None, Some(_)) => bail!("lng is set but lat is missing"),
        _ => {}
    }

    if let Some(lat) = config.lat
        && !(MINIMUM_LATITUDE..=MAXIMUM_LATITUDE).contains(&lat)
    {
        bail!(
            "lat must be between {} and {} degrees (got {})",
            MINIMUM_LATITUDE,
            MAXIMUM_LATITUDE,
            lat
        );
    }

    if let Some(lng) = config.lng
        && !(MINIMUM_LONGITUDE..=MAXIMUM_LONGITUDE).contains(&lng)
    {
        bail!(
            "lng must be between {} and {} degrees (got {})",
            MINIMUM_LONGITUDE,
            MAXIMUM_LONGITUDE,
            lng
        );
    }

    if let Some(alt) = config.alt
        && !alt.is_finite()
    {
        bail!("alt must be a finite number of metres (got {})", alt);
    }

    match (&config.sunrise, &config.sunset) {
        (Some(sunrise), Some(sunset)) => {
            let sunrise = parse_time_of_day(sunrise, "sunrise")?;
            let sunset = parse_time_of_day(sunset, "sunset")?;
            if sunrise == sunset {
                bail!("sunrise and sunset must differ (both are {})", sunrise.format("%H:%M:%S"));
            }
        }
        (Some(_), None) => bail!("sunrise is set but sunset is missing"),
        (None, Some(_)) => bail!("sunset is set but sunrise is missing"),
        (None, None) => {}
    }

    Ok(())
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str, field: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| anyhow::anyhow!("{field} must be HH:MM or HH:MM:SS (got {value:?})"))
}
