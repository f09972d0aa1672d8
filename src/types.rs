//! Domain data model: stations, live trains, timetables, sections,
//! recommendations, and model accuracy records.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fallback coordinates used when a station record has none (locale center).
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 20.5937,
    lon: 78.9629,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(deserialize_with = "f64_lenient")]
    pub lat: f64,
    #[serde(deserialize_with = "f64_lenient")]
    pub lon: f64,
}

/// Static station reference data, loaded once per process and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "station")]
    pub name: String,
    #[serde(default)]
    pub station_code: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub platforms: u32,
}

impl Station {
    /// Coordinates of the station, falling back to [`DEFAULT_COORDINATES`].
    pub fn coordinates_or_default(&self) -> Coordinates {
        self.coordinates.unwrap_or(DEFAULT_COORDINATES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrainType {
    Express,
    Superfast,
    Passenger,
    Freight,
    Local,
    #[serde(other)]
    #[default]
    Unknown,
}

impl fmt::Display for TrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainType::Express => "Express",
            TrainType::Superfast => "Superfast",
            TrainType::Passenger => "Passenger",
            TrainType::Freight => "Freight",
            TrainType::Local => "Local",
            TrainType::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    Running,
    Stopped,
    Delayed,
    Maintenance,
    #[serde(other)]
    Unknown,
}

/// Accumulated delay as reported by the upstream feed. Hours and minutes
/// arrive as strings; anything unparseable counts as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayedTime {
    #[serde(default)]
    pub hours: String,
    #[serde(default)]
    pub minutes: String,
}

impl DelayedTime {
    pub fn total_minutes(&self) -> u32 {
        let hours: u32 = self.hours.trim().parse().unwrap_or(0);
        let minutes: u32 = self.minutes.trim().parse().unwrap_or(0);
        hours * 60 + minutes
    }
}

/// Live train state from the upstream position feed. Read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub id: String,
    #[serde(rename = "type", default)]
    pub train_type: TrainType,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub status: Option<TrainStatus>,
    #[serde(rename = "delayedTime", default)]
    pub delayed_time: Option<DelayedTime>,
}

impl Train {
    /// Accumulated delay in minutes; missing delay data counts as zero.
    pub fn delay_minutes(&self) -> u32 {
        self.delayed_time
            .as_ref()
            .map(DelayedTime::total_minutes)
            .unwrap_or(0)
    }
}

/// A timetabled stop with cumulative distance from the train's origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub station_name: String,
    pub distance_km: f64,
}

/// Ordered stop sequence for one train.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSchedule {
    #[serde(rename = "intermediate_stops", default)]
    pub stops: Vec<Stop>,
}

impl TrainSchedule {
    /// Index of `station` in the stop sequence (case-insensitive).
    pub fn position_of(&self, station: &str) -> Option<usize> {
        self.stops
            .iter()
            .position(|s| s.station_name.eq_ignore_ascii_case(station))
    }

    /// Current and next stop for a train at `station`. `None` when the
    /// station is not in the sequence or is the terminal stop.
    pub fn next_stop(&self, station: &str) -> Option<(&Stop, &Stop)> {
        let idx = self.position_of(station)?;
        let next = self.stops.get(idx + 1)?;
        Some((&self.stops[idx], next))
    }

    /// Distances must strictly increase along the stop sequence.
    pub fn distances_strictly_increasing(&self) -> bool {
        self.stops
            .windows(2)
            .all(|w| w[1].distance_km > w[0].distance_km)
    }
}

/// Static timetable keyed by train identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timetable {
    #[serde(default)]
    pub trains: HashMap<String, TrainSchedule>,
}

impl Timetable {
    pub fn schedule(&self, train_id: &str) -> Option<&TrainSchedule> {
        self.trains.get(train_id)
    }
}

/// Canonical unordered pair of adjacent station names. `A-B` and `B-A`
/// identify the same section, so lookups never branch on direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SectionKey {
    a: String,
    b: String,
}

impl SectionKey {
    pub fn new(x: &str, y: &str) -> Self {
        let x = x.to_ascii_lowercase();
        let y = y.to_ascii_lowercase();
        if x <= y {
            SectionKey { a: x, b: y }
        } else {
            SectionKey { a: y, b: x }
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// A consistent snapshot of live network state, passed in per call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    #[serde(default)]
    pub trains: HashMap<String, Train>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

impl NetworkSnapshot {
    /// Case-insensitive station lookup by name.
    pub fn station(&self, name: &str) -> Option<&Station> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Scheduling,
    Routing,
    Safety,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Scheduling => "scheduling",
            Category::Routing => "routing",
            Category::Safety => "safety",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

impl Impact {
    /// Sort rank: Critical 4 > High 3 > Medium 2 > Low 1.
    pub fn rank(&self) -> u8 {
        match self {
            Impact::Critical => 4,
            Impact::High => 3,
            Impact::Medium => 2,
            Impact::Low => 1,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::Low => "Low",
            Impact::Medium => "Medium",
            Impact::High => "High",
            Impact::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Advisory record proposing an operational action, never an executed
/// command. Created fresh per synthesis call.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub confidence: u32,
    pub impact: Impact,
    pub time_saving: String,
    pub affected_trains: Vec<String>,
    pub implementation: Vec<String>,
    pub reasoning: String,
    pub status: String,
}

/// Evaluation metrics for one trained model, overwritten per training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAccuracy {
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Derived scalar: `max(0, 100 - mae)`.
    pub accuracy: f64,
}

/// Accuracy records for the whole model set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub delay: Option<ModelAccuracy>,
    pub congestion: Option<ModelAccuracy>,
    pub last_trained: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
}

/// Accepts a float either as a JSON number or as a string, which is how the
/// upstream station feed encodes coordinates.
fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => s.trim().parse().map_err(D::Error::custom),
    }
}
