//! Feature assembly: converts raw train/station/timetable state into the
//! fixed schemas consumed by each model.
//!
//! Builders are synchronous and pure over their inputs: weather is
//! pre-fetched per station into a read-only map before any row is built,
//! and every skip decision is a function of the row alone.

pub mod section;
pub mod train;

use crate::learn::FeatureRow;
use crate::types::{NetworkSnapshot, SectionKey, Timetable, Train, TrainType};
use crate::weather::WeatherCondition;
use tracing::debug;

/// Assumed average running speed (km/h); the upstream feed carries no speed
/// telemetry.
pub const ASSUMED_AVERAGE_SPEED_KMH: f64 = 60.0;

/// Priority by train type. Unknown types sit in the middle of the scale.
pub fn priority_level(train_type: TrainType) -> u8 {
    match train_type {
        TrainType::Express => 5,
        TrainType::Superfast => 4,
        TrainType::Passenger => 3,
        TrainType::Freight => 2,
        TrainType::Local => 1,
        TrainType::Unknown => 3,
    }
}

/// A train that passed every qualification check: it has a station and a
/// status, the station exists, and its timetable has a next stop.
#[derive(Debug, Clone)]
pub struct QualifiedTrain {
    pub current_station: String,
    pub next_station: String,
    pub distance_to_next_km: f64,
}

/// Applies the shared skip policy. Returns `None` (and touches nothing)
/// when the train must be excluded from prediction.
pub fn qualify_train(
    id: &str,
    train: &Train,
    snapshot: &NetworkSnapshot,
    timetable: &Timetable,
) -> Option<QualifiedTrain> {
    let station = match &train.station {
        Some(s) if !s.is_empty() => s,
        _ => {
            debug!(train = id, "skipping train without station");
            return None;
        }
    };
    if train.status.is_none() {
        debug!(train = id, "skipping train without status");
        return None;
    }
    if snapshot.station(station).is_none() {
        debug!(train = id, station, "skipping train at unknown station");
        return None;
    }
    let schedule = match timetable.schedule(id) {
        Some(s) if !s.stops.is_empty() => s,
        _ => {
            debug!(train = id, "skipping train without timetable entry");
            return None;
        }
    };
    let (current, next) = match schedule.next_stop(station) {
        Some(pair) => pair,
        None => {
            debug!(train = id, station, "skipping train with no next stop");
            return None;
        }
    };

    Some(QualifiedTrain {
        current_station: station.to_ascii_lowercase(),
        next_station: next.station_name.to_ascii_lowercase(),
        distance_to_next_km: next.distance_km - current.distance_km,
    })
}

/// Feature row for the delay model.
#[derive(Debug, Clone)]
pub struct TrainFeatures {
    pub train_id: String,
    pub train_type: TrainType,
    pub distance_km: f64,
    pub current_speed: f64,
    pub congestion_level: f64,
    pub priority_level: u8,
    pub weather: WeatherCondition,
    pub time_of_day: u32,
    pub day_of_week: u32,
    pub current_station: String,
    pub next_station: String,
    pub delay_minutes: f64,
}

impl FeatureRow for TrainFeatures {
    fn numeric(&self) -> Vec<f64> {
        vec![
            self.distance_km,
            self.current_speed,
            self.congestion_level,
            f64::from(self.priority_level),
        ]
    }

    fn categorical(&self) -> Vec<String> {
        vec![
            self.train_type.to_string(),
            self.weather.to_string(),
            self.time_of_day.to_string(),
            self.day_of_week.to_string(),
        ]
    }
}

/// Feature row for the congestion model.
#[derive(Debug, Clone)]
pub struct SectionFeatures {
    pub key: SectionKey,
    pub num_trains: usize,
    pub avg_speed: f64,
    pub section_length: f64,
    pub time_to_next_station: f64,
    pub section_type: String,
    pub weather: WeatherCondition,
    pub time_of_day: u32,
}

impl FeatureRow for SectionFeatures {
    fn numeric(&self) -> Vec<f64> {
        vec![
            self.num_trains as f64,
            self.avg_speed,
            self.section_length,
            self.time_to_next_station,
        ]
    }

    fn categorical(&self) -> Vec<String> {
        vec![
            self.section_type.clone(),
            self.weather.to_string(),
            self.time_of_day.to_string(),
        ]
    }
}
