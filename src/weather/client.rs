use super::WeatherReading;
use anyhow::Result;
use async_trait::async_trait;

/// Boundary to the upstream weather provider. Implementations absorb all
/// provider-specific protocol detail; callers only ever see a normalized
/// reading or an error to be handled by the fallback policy.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReading>;
}
