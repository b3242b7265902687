#[cfg(test)]
mod location_tests {
    use crate::geo::{Location, ScheduleSource};
    use chrono::NaiveTime;

    #[test]
    fn test_location_equality_is_bitwise() {
        let a = Location::new(52.37, 4.89, 0.0);
        assert_eq!(a, Location::new(52.37, 4.89, 0.0));

        // Numerically equal but not bit-identical
        assert_ne!(Location::new(0.0, 0.0, 0.0), Location::new(-0.0, 0.0, 0.0));

        // NaN is equal to itself bitwise
        let nan = Location::new(f64::NAN, 0.0, 0.0);
        assert_eq!(nan, nan);

        // One ulp of difference is a different location
        let nudged = Location::new(f64::from_bits(52.37_f64.to_bits() + 1), 4.89, 0.0);
        assert_ne!(a, nudged);
    }

    #[test]
    fn test_location_cache_format() {
        let location = Location::new(52.5, 13.4, 34.0);
        let json = serde_json::to_string(&location).unwrap();
        assert_eq!(json, r#"{"lat":52.5,"lng":13.4,"alt":34.0}"#);

        // Altitude is optional in cached files
        let parsed: Location = serde_json::from_str(r#"{"lat":52.5,"lng":13.4}"#).unwrap();
        assert_eq!(parsed, Location::new(52.5, 13.4, 0.0));
    }

    #[test]
    fn test_schedule_source_equality() {
        let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let nineteen = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        assert_eq!(
            ScheduleSource::fixed(seven, nineteen),
            ScheduleSource::fixed(seven, nineteen)
        );
        assert_ne!(
            ScheduleSource::fixed(seven, nineteen),
            ScheduleSource::fixed(nineteen, seven)
        );
        assert_ne!(
            ScheduleSource::from(Location::new(0.0, 0.0, 0.0)),
            ScheduleSource::fixed(seven, nineteen)
        );
    }
}

#[cfg(test)]
mod solar_tests {
    use crate::geo::{CalculationError, Location, ScheduleSource, SolarCalculator, SunCalculator};
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn seven_to_nineteen() -> ScheduleSource {
        ScheduleSource::fixed(
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_fixed_schedule_at_noon() {
        let calculator = SolarCalculator::with_timezone(Utc);
        let times = calculator
            .next_sunrise_and_sundown(&seven_to_nineteen(), utc(2024, 3, 20, 12, 0))
            .unwrap();
        assert_eq!(times.sunrise, utc(2024, 3, 21, 7, 0));
        assert_eq!(times.sundown, utc(2024, 3, 20, 19, 0));
    }

    #[test]
    fn test_fixed_schedule_late_evening_rolls_both() {
        let calculator = SolarCalculator::with_timezone(Utc);
        let times = calculator
            .next_sunrise_and_sundown(&seven_to_nineteen(), utc(2024, 3, 20, 22, 0))
            .unwrap();
        assert_eq!(times.sunrise, utc(2024, 3, 21, 7, 0));
        assert_eq!(times.sundown, utc(2024, 3, 21, 19, 0));
    }

    #[test]
    fn test_fixed_schedule_before_sunrise_keeps_today() {
        let calculator = SolarCalculator::with_timezone(Utc);
        let times = calculator
            .next_sunrise_and_sundown(&seven_to_nineteen(), utc(2024, 3, 20, 6, 0))
            .unwrap();
        assert_eq!(times.sunrise, utc(2024, 3, 20, 7, 0));
        assert_eq!(times.sundown, utc(2024, 3, 20, 19, 0));
    }

    #[test]
    fn test_fixed_schedule_boundary_instant_is_not_passed() {
        let calculator = SolarCalculator::with_timezone(Utc);
        let times = calculator
            .next_sunrise_and_sundown(&seven_to_nineteen(), utc(2024, 3, 20, 19, 0))
            .unwrap();
        assert_eq!(times.sundown, utc(2024, 3, 20, 19, 0));
    }

    #[test]
    fn test_fixed_schedule_uses_calculator_timezone() {
        let plus_two = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let calculator = SolarCalculator::with_timezone(plus_two);
        // 12:00 UTC is 14:00 local
        let times = calculator
            .next_sunrise_and_sundown(&seven_to_nineteen(), utc(2024, 3, 20, 12, 0))
            .unwrap();
        assert_eq!(times.sundown, utc(2024, 3, 20, 17, 0));
        assert_eq!(times.sunrise, utc(2024, 3, 21, 5, 0));
    }

    #[test]
    fn test_equator_at_equinox() {
        let calculator = SolarCalculator::new();
        let equator = ScheduleSource::from(Location::new(0.0, 0.0, 0.0));

        let noon = calculator
            .next_sunrise_and_sundown(&equator, utc(2024, 3, 20, 12, 0))
            .unwrap();
        assert_eq!(noon.sundown.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        assert_eq!(noon.sunrise.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 21).unwrap());
        assert!((17..=18).contains(&noon.sundown.hour()));
        assert!((5..=6).contains(&noon.sunrise.hour()));

        let early = calculator
            .next_sunrise_and_sundown(&equator, utc(2024, 3, 20, 3, 0))
            .unwrap();
        assert_eq!(early.sunrise.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        assert!(early.sunrise < early.sundown);
    }

    #[test]
    fn test_polar_night_is_an_error() {
        let calculator = SolarCalculator::new();
        let svalbard = ScheduleSource::from(Location::new(80.0, 15.0, 0.0));
        let result = calculator.next_sunrise_and_sundown(&svalbard, utc(2024, 12, 21, 12, 0));
        assert!(matches!(result, Err(CalculationError::NoSunEvent { .. })));
    }

    #[test]
    fn test_midnight_sun_is_an_error() {
        let calculator = SolarCalculator::new();
        let svalbard = ScheduleSource::from(Location::new(80.0, 15.0, 0.0));
        let result = calculator.next_sunrise_and_sundown(&svalbard, utc(2024, 6, 21, 12, 0));
        assert!(matches!(result, Err(CalculationError::NoSunEvent { .. })));
    }

    #[test]
    fn test_invalid_coordinates_are_an_error() {
        let calculator = SolarCalculator::new();
        let nowhere = ScheduleSource::from(Location::new(95.0, 0.0, 0.0));
        let result = calculator.next_sunrise_and_sundown(&nowhere, utc(2024, 3, 20, 12, 0));
        assert!(matches!(
            result,
            Err(CalculationError::InvalidCoordinates { .. })
        ));
    }

    /// Property-based tests
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Both boundaries are at or after the reference and less than two days away.
            #[test]
            fn prop_boundaries_are_upcoming(
                lat in -60.0f64..60.0,
                lon in -180.0f64..180.0,
                offset_minutes in 0i64..(366 * 24 * 60),
            ) {
                let calculator = SolarCalculator::new();
                let source = ScheduleSource::from(Location::new(lat, lon, 0.0));
                let reference = utc(2024, 1, 1, 0, 0) + chrono::TimeDelta::minutes(offset_minutes);

                let times = calculator.next_sunrise_and_sundown(&source, reference).unwrap();
                prop_assert!(times.sunrise >= reference);
                prop_assert!(times.sundown >= reference);
                prop_assert!(times.sunrise - reference < chrono::TimeDelta::hours(48));
                prop_assert!(times.sundown - reference < chrono::TimeDelta::hours(48));
            }
        }
    }
}
