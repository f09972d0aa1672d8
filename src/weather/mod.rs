//! Weather signal provider: normalized per-location readings with a TTL
//! cache, severity/impact scoring, and a never-failing fallback policy.

mod client;
mod openweather;
pub mod scoring;

pub use client::WeatherApi;
pub use openweather::OpenWeatherClient;

use crate::types::Station;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default cache lifetime for a per-location reading.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Fog,
    Mist,
    Snow,
    Thunderstorm,
    Haze,
    #[serde(other)]
    Unknown,
}

impl WeatherCondition {
    /// Maps the `main` field of an upstream report onto the condition enum.
    /// Anything unrecognized becomes [`WeatherCondition::Unknown`].
    pub fn parse(s: &str) -> Self {
        match s {
            "Clear" => WeatherCondition::Clear,
            "Clouds" => WeatherCondition::Clouds,
            "Rain" => WeatherCondition::Rain,
            "Drizzle" => WeatherCondition::Drizzle,
            "Fog" => WeatherCondition::Fog,
            "Mist" => WeatherCondition::Mist,
            "Snow" => WeatherCondition::Snow,
            "Thunderstorm" => WeatherCondition::Thunderstorm,
            "Haze" => WeatherCondition::Haze,
            _ => WeatherCondition::Unknown,
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Clouds",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Haze => "Haze",
            WeatherCondition::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Normalized per-location weather reading. Always structurally valid:
/// every consumer can rely on every field being present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReading {
    pub condition: WeatherCondition,
    pub description: String,
    /// Celsius.
    pub temperature: f64,
    pub feels_like: f64,
    /// Percentage.
    pub humidity: f64,
    /// hPa.
    pub pressure: f64,
    /// m/s.
    pub wind_speed: f64,
    /// Degrees.
    pub wind_direction: f64,
    pub wind_gust: f64,
    /// Cloud cover percentage.
    pub clouds: f64,
    /// Kilometers.
    pub visibility_km: f64,
    /// mm over the last hour / three hours.
    pub rain_1h: f64,
    pub rain_3h: f64,
    pub snow_1h: f64,
    pub snow_3h: f64,
    pub timestamp: chrono::DateTime<Utc>,
    /// Composite harshness score, 0-10.
    pub severity: u8,
    /// Operational effect on trains, 0-5.
    pub train_impact: u8,
    pub train_impact_description: String,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub station_code: Option<String>,
}

impl WeatherReading {
    /// The documented default reading returned when no upstream data is
    /// available. Severity 0, impact 0; never substitutes hazard for silence.
    pub fn fallback() -> Self {
        WeatherReading {
            condition: WeatherCondition::Unknown,
            description: "Weather data unavailable".to_string(),
            temperature: 20.0,
            feels_like: 20.0,
            humidity: 50.0,
            pressure: 1013.0,
            wind_speed: 0.0,
            wind_direction: 0.0,
            wind_gust: 0.0,
            clouds: 0.0,
            visibility_km: 10.0,
            rain_1h: 0.0,
            rain_3h: 0.0,
            snow_1h: 0.0,
            snow_3h: 0.0,
            timestamp: Utc::now(),
            severity: 0,
            train_impact: 0,
            train_impact_description: scoring::impact_description(0).to_string(),
            station: None,
            station_code: None,
        }
    }

    /// Recomputes severity, impact, and the impact description from the
    /// raw fields of the reading.
    pub fn with_scores(mut self) -> Self {
        let severity = scoring::severity(&self);
        let impact = scoring::train_impact(&self, severity);
        self.severity = severity;
        self.train_impact = impact;
        self.train_impact_description = scoring::impact_description(impact).to_string();
        self
    }

    fn tagged(mut self, station: &Station) -> Self {
        self.station = Some(station.name.clone());
        self.station_code = station.station_code.clone();
        self
    }
}

struct CacheEntry {
    reading: WeatherReading,
    fetched_at: Instant,
}

/// TTL-cached weather lookups with stale-or-default fallback. None of the
/// public methods can fail; the worst outcome is [`WeatherReading::fallback`].
pub struct WeatherService {
    api: Box<dyn WeatherApi>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl WeatherService {
    pub fn new(api: Box<dyn WeatherApi>, ttl: Duration) -> Self {
        WeatherService {
            api,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_key(lat: f64, lon: f64) -> String {
        format!("{lat:.4},{lon:.4}")
    }

    /// Returns the reading for a coordinate pair: cached if fresh, freshly
    /// fetched on miss/expiry, stale on upstream failure, default otherwise.
    pub async fn by_coordinates(&self, lat: f64, lon: f64) -> WeatherReading {
        let key = Self::cache_key(lat, lon);

        // Lock scopes are kept short and never span the upstream call.
        {
            let cache = self.cache.read().expect("weather cache poisoned");
            if let Some(entry) = cache.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!(%key, "weather cache hit");
                    return entry.reading.clone();
                }
            }
        }

        match self.api.fetch(lat, lon).await {
            Ok(reading) => {
                let reading = reading.with_scores();
                let mut cache = self.cache.write().expect("weather cache poisoned");
                cache.insert(
                    key,
                    CacheEntry {
                        reading: reading.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                reading
            }
            Err(e) => {
                warn!(%key, error = %e, "weather fetch failed");
                let cache = self.cache.read().expect("weather cache poisoned");
                if let Some(entry) = cache.get(&key) {
                    warn!(
                        %key,
                        age_secs = entry.fetched_at.elapsed().as_secs(),
                        "serving stale weather reading"
                    );
                    entry.reading.clone()
                } else {
                    WeatherReading::fallback()
                }
            }
        }
    }

    /// Reading for a station; missing or invalid coordinates map straight to
    /// the default reading. Station identity is attached either way.
    pub async fn for_station(&self, station: &Station) -> WeatherReading {
        match station.coordinates {
            Some(c) if c.lat.is_finite() && c.lon.is_finite() => {
                self.by_coordinates(c.lat, c.lon).await.tagged(station)
            }
            _ => {
                warn!(station = %station.name, "station has no usable coordinates");
                WeatherReading::fallback().tagged(station)
            }
        }
    }

    /// Readings for every station, keyed by station code (name if no code).
    pub async fn for_all_stations(&self, stations: &[Station]) -> HashMap<String, WeatherReading> {
        let mut out = HashMap::with_capacity(stations.len());
        for station in stations {
            let key = station
                .station_code
                .clone()
                .unwrap_or_else(|| station.name.clone());
            out.insert(key, self.for_station(station).await);
        }
        out
    }
}
