//! Deterministic optimal-speed recommendation.
//!
//! Not a learned model: exposed through the same service boundary as the
//! regressors for interface symmetry, but computed from fixed factors.

use crate::types::TrainType;
use crate::weather::WeatherCondition;

/// Base speed limit (km/h) by train type.
pub fn base_speed(train_type: TrainType) -> f64 {
    match train_type {
        TrainType::Express => 110.0,
        TrainType::Superfast => 130.0,
        TrainType::Passenger => 90.0,
        TrainType::Freight => 70.0,
        TrainType::Local => 80.0,
        TrainType::Unknown => 90.0,
    }
}

/// Speed multiplier by weather condition. Unknown conditions do not slow
/// trains down.
pub fn weather_factor(condition: WeatherCondition) -> f64 {
    match condition {
        WeatherCondition::Clear => 1.0,
        WeatherCondition::Clouds => 0.95,
        WeatherCondition::Rain => 0.8,
        WeatherCondition::Drizzle => 0.9,
        WeatherCondition::Fog => 0.6,
        WeatherCondition::Mist => 0.7,
        WeatherCondition::Snow => 0.5,
        WeatherCondition::Thunderstorm => 0.4,
        WeatherCondition::Haze => 0.85,
        WeatherCondition::Unknown => 1.0,
    }
}

/// Recommended operating speed in km/h, rounded to one decimal.
///
/// base × weather × congestion × delay-recovery, where congestion reduces
/// speed by up to 50% and delay recovery raises it by up to 10% — but the
/// result is hard-capped at base × weather: recovery never exceeds the
/// weather-safe ceiling.
pub fn optimal_speed(
    train_type: TrainType,
    condition: WeatherCondition,
    congestion: f64,
    delay_minutes: f64,
) -> f64 {
    let base = base_speed(train_type);
    let weather = weather_factor(condition);

    let congestion_factor = (1.0 - congestion / 200.0).max(0.5);
    let delay_factor = (1.0 + delay_minutes / 600.0).min(1.1);

    let recommended = base * weather * congestion_factor * delay_factor;
    let max_safe = base * weather;

    (recommended.min(max_safe) * 10.0).round() / 10.0
}
