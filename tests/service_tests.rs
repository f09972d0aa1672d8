//! End-to-end tests for the advisory service: training, prediction
//! defaults, recommendation synthesis, and model persistence.

use anyhow::Result;
use async_trait::async_trait;
use rail_advisor::features::section::section_features;
use rail_advisor::service::{AdvisoryService, DEFAULT_CONGESTION, spawn_retraining};
use rail_advisor::store::{MemoryStore, ModelStore};
use rail_advisor::types::{
    Coordinates, NetworkSnapshot, SectionKey, Station, Stop, Timetable, Train, TrainSchedule,
    TrainStatus, TrainType,
};
use rail_advisor::weather::{
    DEFAULT_CACHE_TTL, WeatherApi, WeatherCondition, WeatherReading, WeatherService,
};
use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;

/// Upstream weather stub reporting steady moderate rain everywhere.
struct RainyApi;

#[async_trait]
impl WeatherApi for RainyApi {
    async fn fetch(&self, _lat: f64, _lon: f64) -> Result<WeatherReading> {
        let mut reading = WeatherReading::fallback();
        reading.condition = WeatherCondition::Rain;
        reading.description = "moderate rain".to_string();
        reading.rain_1h = 4.0;
        Ok(reading)
    }
}

/// Store shim so a test can keep a handle to the entries the service writes.
struct SharedStore(Arc<MemoryStore>);

impl ModelStore for SharedStore {
    fn save(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        self.0.save(name, value)
    }

    fn load(&self, name: &str) -> Result<Option<serde_json::Value>> {
        self.0.load(name)
    }
}

fn station(name: &str, platforms: u32, lat: f64) -> Station {
    Station {
        name: name.to_string(),
        station_code: None,
        coordinates: Some(Coordinates { lat, lon: 77.0 }),
        platforms,
    }
}

/// Linear network of `n + 1` stations with one train per section, every
/// train 20 minutes delayed and 15 km short of its next stop.
fn network(n: usize) -> (NetworkSnapshot, Timetable) {
    let stations: Vec<Station> = (0..=n)
        .map(|i| station(&format!("s{i}"), 2 + (i as u32 % 3), 20.0 + i as f64))
        .collect();

    let route: Vec<Stop> = (0..=n)
        .map(|i| Stop {
            station_name: format!("s{i}"),
            distance_km: i as f64 * 15.0,
        })
        .collect();

    let mut trains = HashMap::new();
    let mut schedules = HashMap::new();
    for i in 0..n {
        let id = format!("t{i}");
        trains.insert(
            id.clone(),
            Train {
                id: id.clone(),
                train_type: TrainType::Express,
                station: Some(format!("s{i}")),
                status: Some(TrainStatus::Running),
                delayed_time: Some(rail_advisor::types::DelayedTime {
                    hours: "0".to_string(),
                    minutes: "20".to_string(),
                }),
            },
        );
        schedules.insert(
            id,
            TrainSchedule {
                stops: route.clone(),
            },
        );
    }

    (
        NetworkSnapshot { trains, stations },
        Timetable { trains: schedules },
    )
}

fn service(timetable: Timetable) -> AdvisoryService {
    let weather = WeatherService::new(Box::new(RainyApi), DEFAULT_CACHE_TTL);
    AdvisoryService::new(timetable, weather, Box::new(MemoryStore::default()))
}

#[tokio::test]
async fn untrained_service_uses_documented_defaults() {
    let (_, timetable) = network(10);
    let service = service(timetable);

    let health = service.health();
    assert_eq!(health.status, "healthy");
    assert!(!health.model_loaded);

    let metrics = service.metrics();
    assert!(metrics.delay.is_none());
    assert!(metrics.congestion.is_none());
    assert!(metrics.last_trained.is_none());

    let row = section_features(
        SectionKey::new("s0", "s1"),
        1,
        15.0,
        WeatherCondition::Rain,
        Local::now(),
    );
    assert_eq!(service.predict_section_congestion(&row), DEFAULT_CONGESTION);
}

#[tokio::test]
async fn training_fails_cleanly_on_small_network() {
    // Three trains: below the delay-model minimum.
    let (snapshot, timetable) = network(3);
    let service = service(timetable);

    let outcome = service.train_models(&snapshot).await;
    assert!(!outcome.success);
    assert!(outcome.metrics.delay.is_none());
    assert!(!service.health().model_loaded);
}

#[tokio::test]
async fn training_succeeds_on_full_network() {
    let (snapshot, timetable) = network(12);
    let service = service(timetable);

    let outcome = service.train_models(&snapshot).await;
    assert!(outcome.success);

    let delay = outcome.metrics.delay.expect("delay metrics");
    assert!(delay.mse.is_finite());
    assert!(delay.accuracy >= 0.0);
    assert!(outcome.metrics.congestion.is_some());
    assert!(outcome.metrics.last_trained.is_some());
    assert!(service.health().model_loaded);
}

#[tokio::test]
async fn failed_retraining_preserves_trained_state() {
    let (snapshot, timetable) = network(12);
    let service = service(timetable);
    assert!(service.train_models(&snapshot).await.success);

    let before = serde_json::to_value(service.metrics()).unwrap();

    // Too few trains for the delay model: fails before any fit.
    let (small, _) = network(3);
    let outcome = service.train_models(&small).await;
    assert!(!outcome.success);
    assert!(service.health().model_loaded);
    assert_eq!(serde_json::to_value(service.metrics()).unwrap(), before);

    // Enough trains for the delay model, but everyone bunched onto three
    // sections: the delay fit succeeds and the congestion fit fails, which
    // must still leave the stored models and metrics untouched.
    let mut bunched = snapshot.clone();
    for (i, train) in bunched.trains.values_mut().enumerate() {
        train.station = Some(format!("s{}", i % 3));
    }
    let outcome = service.train_models(&bunched).await;
    assert!(!outcome.success);
    assert!(service.health().model_loaded);
    assert_eq!(serde_json::to_value(service.metrics()).unwrap(), before);
}

#[tokio::test]
async fn recommendations_fire_without_trained_models() {
    // Every train carries 20 min of accumulated delay, which exceeds the
    // scheduling threshold on its own.
    let (snapshot, timetable) = network(6);
    let service = service(timetable);

    let (recommendations, metrics) = service.generate_recommendations(&snapshot).await;
    assert!(metrics.delay.is_none());
    assert!(!recommendations.is_empty());
    assert!(
        recommendations
            .iter()
            .any(|r| r.title.starts_with("Delay Recovery"))
    );

    // 15 km to the next stop in rain also trips the weather protocol.
    assert!(
        recommendations
            .iter()
            .any(|r| r.title.starts_with("Weather Protocol"))
    );
}

#[tokio::test]
async fn recommendations_are_ranked_after_training() {
    let (snapshot, timetable) = network(12);
    let service = service(timetable);

    let outcome = service.train_models(&snapshot).await;
    assert!(outcome.success);

    let (recommendations, metrics) = service.generate_recommendations(&snapshot).await;
    assert!(metrics.delay.is_some());
    assert!(!recommendations.is_empty());

    for pair in recommendations.windows(2) {
        assert!(
            (pair[0].impact.rank(), pair[0].confidence)
                >= (pair[1].impact.rank(), pair[1].confidence)
        );
    }

    for rec in &recommendations {
        assert!((0..=100).contains(&rec.confidence));
        assert!(!rec.affected_trains.is_empty());
        assert_eq!(rec.status, "pending");
    }
}

#[tokio::test]
async fn trained_state_survives_a_restart() {
    let (snapshot, timetable) = network(12);
    let entries = Arc::new(MemoryStore::default());

    let weather = WeatherService::new(Box::new(RainyApi), DEFAULT_CACHE_TTL);
    let first = AdvisoryService::new(
        timetable.clone(),
        weather,
        Box::new(SharedStore(entries.clone())),
    );
    let outcome = first.train_models(&snapshot).await;
    assert!(outcome.success);
    drop(first);

    let weather = WeatherService::new(Box::new(RainyApi), DEFAULT_CACHE_TTL);
    let second = AdvisoryService::new(timetable, weather, Box::new(SharedStore(entries)));
    assert!(second.health().model_loaded);
    assert!(second.metrics().last_trained.is_some());
}

#[tokio::test(start_paused = true)]
async fn retraining_task_trains_immediately_on_spawn() {
    let (snapshot, timetable) = network(12);
    let service = Arc::new(service(timetable));

    let handle = spawn_retraining(
        service.clone(),
        std::time::Duration::from_secs(1800),
        move || Ok(snapshot.clone()),
    );

    // Yielding is enough: the task's first tick fires at spawn, well
    // before the first full period elapses.
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    assert!(service.health().model_loaded);
    handle.abort();
}

#[tokio::test]
async fn single_train_assessment() {
    let (snapshot, timetable) = network(6);
    let service = service(timetable);

    let assessment = service
        .assess_train(&snapshot, "t2")
        .await
        .expect("t2 qualifies");
    assert_eq!(assessment.train_id, "t2");
    assert_eq!(assessment.current_station, "s2");
    assert_eq!(assessment.next_station, "s3");
    assert!((assessment.distance_to_next_km - 15.0).abs() < 1e-9);
    assert_eq!(assessment.delay_minutes, 20.0);
    assert_eq!(assessment.condition, WeatherCondition::Rain);
    assert!(assessment.optimal_speed > 0.0);

    assert!(service.assess_train(&snapshot, "ghost").await.is_none());
}

#[tokio::test]
async fn weather_lookup_by_station_name() {
    let (snapshot, timetable) = network(4);
    let service = service(timetable);

    let reading = service
        .weather_for_station(&snapshot.stations, "S2")
        .await
        .expect("station exists");
    assert_eq!(reading.condition, WeatherCondition::Rain);
    assert_eq!(reading.station.as_deref(), Some("s2"));

    assert!(
        service
            .weather_for_station(&snapshot.stations, "nowhere")
            .await
            .is_none()
    );

    let all = service.weather_for_all_stations(&snapshot.stations).await;
    assert_eq!(all.len(), snapshot.stations.len());
}
