use super::client::WeatherApi;
use super::{WeatherCondition, WeatherReading};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// OpenWeatherMap-backed [`WeatherApi`]. Requests carry a bounded timeout so
/// a slow provider can never stall a calling request; the caller's fallback
/// policy handles the resulting error.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(OpenWeatherClient {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReading> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send weather request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Weather API returned status {}: {}", status, body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse weather response: {}", e))?;

        Ok(reading_from_json(&json))
    }
}

/// Extracts the normalized reading from a raw OpenWeatherMap report.
/// Absent fields take the same defaults as [`WeatherReading::fallback`].
fn reading_from_json(json: &serde_json::Value) -> WeatherReading {
    let weather = &json["weather"][0];
    let main = &json["main"];
    let wind = &json["wind"];

    WeatherReading {
        condition: WeatherCondition::parse(weather["main"].as_str().unwrap_or("Unknown")),
        description: weather["description"]
            .as_str()
            .unwrap_or("Unknown weather condition")
            .to_string(),
        temperature: main["temp"].as_f64().unwrap_or(20.0),
        feels_like: main["feels_like"].as_f64().unwrap_or(20.0),
        humidity: main["humidity"].as_f64().unwrap_or(50.0),
        pressure: main["pressure"].as_f64().unwrap_or(1013.0),
        wind_speed: wind["speed"].as_f64().unwrap_or(0.0),
        wind_direction: wind["deg"].as_f64().unwrap_or(0.0),
        wind_gust: wind["gust"].as_f64().unwrap_or(0.0),
        clouds: json["clouds"]["all"].as_f64().unwrap_or(0.0),
        // API reports meters; 10 km when absent.
        visibility_km: json["visibility"].as_f64().unwrap_or(10_000.0) / 1000.0,
        rain_1h: json["rain"]["1h"].as_f64().unwrap_or(0.0),
        rain_3h: json["rain"]["3h"].as_f64().unwrap_or(0.0),
        snow_1h: json["snow"]["1h"].as_f64().unwrap_or(0.0),
        snow_3h: json["snow"]["3h"].as_f64().unwrap_or(0.0),
        timestamp: Utc::now(),
        severity: 0,
        train_impact: 0,
        train_impact_description: String::new(),
        station: None,
        station_code: None,
    }
}
