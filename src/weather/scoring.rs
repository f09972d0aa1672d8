//! Severity and train-impact scoring.
//!
//! The band constants here are load-bearing: recommendation thresholds
//! downstream are tuned against them, so they stay as literals.

use super::{WeatherCondition, WeatherReading};

/// Composite weather harshness on a 0-10 scale.
///
/// Additive point system:
///
/// | Signal                            | Points |
/// |-----------------------------------|--------|
/// | Thunderstorm                      | +5     |
/// | Snow                              | +4     |
/// | Rain / Drizzle                    | +3     |
/// | Fog / Mist / Haze                 | +2     |
/// | Clouds                            | +1     |
/// | Temp > 40 or < -10 °C             | +2     |
/// | Temp > 35 or < -5 °C              | +1     |
/// | Wind > 20 / > 10 / > 5 m/s        | +3/2/1 |
/// | Rain > 10 / > 5 / > 1 mm/h        | +3/2/1 |
/// | Snow > 5 / > 2 / > 0.5 mm/h       | (same) |
/// | Visibility < 1 / < 5 / < 10 km    | +3/2/1 |
pub fn severity(r: &WeatherReading) -> u8 {
    let mut severity: u8 = 0;

    severity += match r.condition {
        WeatherCondition::Thunderstorm => 5,
        WeatherCondition::Snow => 4,
        WeatherCondition::Rain | WeatherCondition::Drizzle => 3,
        WeatherCondition::Fog | WeatherCondition::Mist | WeatherCondition::Haze => 2,
        WeatherCondition::Clouds => 1,
        WeatherCondition::Clear | WeatherCondition::Unknown => 0,
    };

    if r.temperature > 40.0 || r.temperature < -10.0 {
        severity += 2;
    } else if r.temperature > 35.0 || r.temperature < -5.0 {
        severity += 1;
    }

    if r.wind_speed > 20.0 {
        severity += 3;
    } else if r.wind_speed > 10.0 {
        severity += 2;
    } else if r.wind_speed > 5.0 {
        severity += 1;
    }

    if r.rain_1h > 10.0 || r.snow_1h > 5.0 {
        severity += 3;
    } else if r.rain_1h > 5.0 || r.snow_1h > 2.0 {
        severity += 2;
    } else if r.rain_1h > 1.0 || r.snow_1h > 0.5 {
        severity += 1;
    }

    let visibility_m = r.visibility_km * 1000.0;
    if visibility_m < 1000.0 {
        severity += 3;
    } else if visibility_m < 5000.0 {
        severity += 2;
    } else if visibility_m < 10_000.0 {
        severity += 1;
    }

    severity.min(10)
}

/// Operational impact on trains, 0-5. Derived from severity bands, then
/// raised (never lowered) by condition-specific overrides.
pub fn train_impact(r: &WeatherReading, severity: u8) -> u8 {
    let mut impact = match severity {
        s if s >= 8 => 5,
        s if s >= 6 => 4,
        s if s >= 4 => 3,
        s if s >= 2 => 2,
        s if s >= 1 => 1,
        _ => 0,
    };

    // Heavy snow is particularly problematic for trains.
    if r.condition == WeatherCondition::Snow && r.snow_1h > 3.0 {
        impact = impact.max(4);
    }

    // Heavy rain can flood tracks.
    if matches!(
        r.condition,
        WeatherCondition::Rain | WeatherCondition::Thunderstorm
    ) && r.rain_1h > 8.0
    {
        impact = impact.max(4);
    }

    // Very strong wind affects train stability.
    if r.wind_speed > 25.0 {
        impact = impact.max(4);
    }

    if r.visibility_km * 1000.0 < 500.0 {
        impact = impact.max(3);
    }

    impact
}

pub fn impact_description(level: u8) -> &'static str {
    match level {
        0 => "No impact on train operations expected.",
        1 => "Minor impact. Slight delays possible.",
        2 => "Moderate impact. Delays likely. Reduced speeds may be necessary.",
        3 => "Significant impact. Delays certain. Some cancellations possible. Speed restrictions in effect.",
        4 => "Severe impact. Significant delays and cancellations likely. Major speed restrictions.",
        _ => "Extreme impact. Service suspension possible. Safety checks required before operation.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> WeatherReading {
        WeatherReading::fallback()
    }

    #[test]
    fn test_calm_clear_weather_scores_zero() {
        let mut r = reading();
        r.condition = WeatherCondition::Clear;
        assert_eq!(severity(&r), 0);
        assert_eq!(train_impact(&r, 0), 0);
    }

    #[test]
    fn test_severity_capped_at_ten() {
        let mut r = reading();
        r.condition = WeatherCondition::Thunderstorm;
        r.temperature = 45.0;
        r.wind_speed = 30.0;
        r.rain_1h = 20.0;
        r.visibility_km = 0.3;
        assert_eq!(severity(&r), 10);
    }

    #[test]
    fn test_severity_monotonic_in_wind() {
        let mut prev = 0;
        for wind in [0.0, 6.0, 11.0, 21.0] {
            let mut r = reading();
            r.wind_speed = wind;
            let s = severity(&r);
            assert!(s >= prev, "severity dropped as wind rose to {wind}");
            prev = s;
        }
    }

    #[test]
    fn test_severity_monotonic_in_rain() {
        let mut prev = 0;
        for rain in [0.0, 2.0, 6.0, 12.0] {
            let mut r = reading();
            r.rain_1h = rain;
            let s = severity(&r);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn test_severity_monotonic_in_inverse_visibility() {
        let mut prev = 0;
        for vis_km in [12.0, 8.0, 3.0, 0.5] {
            let mut r = reading();
            r.visibility_km = vis_km;
            let s = severity(&r);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn test_impact_bands() {
        let r = reading();
        assert_eq!(train_impact(&r, 0), 0);
        assert_eq!(train_impact(&r, 1), 1);
        assert_eq!(train_impact(&r, 2), 2);
        assert_eq!(train_impact(&r, 4), 3);
        assert_eq!(train_impact(&r, 6), 4);
        assert_eq!(train_impact(&r, 8), 5);
        assert_eq!(train_impact(&r, 10), 5);
    }

    #[test]
    fn test_heavy_snow_forces_impact_four() {
        let mut r = reading();
        r.condition = WeatherCondition::Snow;
        r.snow_1h = 4.0;
        // Band alone would give less at low severity.
        assert!(train_impact(&r, 1) >= 4);
    }

    #[test]
    fn test_heavy_rain_forces_impact_four() {
        let mut r = reading();
        r.condition = WeatherCondition::Thunderstorm;
        r.rain_1h = 9.0;
        assert!(train_impact(&r, 0) >= 4);
    }

    #[test]
    fn test_gale_forces_impact_four() {
        let mut r = reading();
        r.wind_speed = 26.0;
        assert!(train_impact(&r, 0) >= 4);
    }

    #[test]
    fn test_low_visibility_forces_impact_three() {
        let mut r = reading();
        r.visibility_km = 0.4;
        assert!(train_impact(&r, 0) >= 3);
    }

    #[test]
    fn test_impact_in_range() {
        for s in 0..=10u8 {
            let r = reading();
            let impact = train_impact(&r, s);
            assert!(impact <= 5);
        }
    }

    #[test]
    fn test_with_scores_fills_derived_fields() {
        let mut r = reading();
        r.condition = WeatherCondition::Rain;
        r.rain_1h = 12.0;
        let scored = r.with_scores();
        assert!(scored.severity >= 6);
        assert!(scored.train_impact >= 4);
        assert!(!scored.train_impact_description.is_empty());
    }
}
