//! The advisory service: owns the trained models and the weather signal,
//! and exposes every operation a request-serving wrapper needs.

use crate::features::section::{Section, build_congestion_dataset, build_sections, section_features};
use crate::features::train::build_delay_dataset;
use crate::features::{
    ASSUMED_AVERAGE_SPEED_KMH, SectionFeatures, TrainFeatures, priority_level, qualify_train,
};
use crate::learn::{CONGESTION_MIN_SAMPLES, DELAY_MIN_SAMPLES, RegressionPipeline};
use crate::recommend::speed::optimal_speed;
use crate::recommend::{TrainAssessment, rank, recommendations_for};
use crate::store::ModelStore;
use crate::types::{
    HealthStatus, ModelMetrics, NetworkSnapshot, Recommendation, SectionKey, Station, Timetable,
    Train, TrainStatus,
};
use crate::weather::{WeatherCondition, WeatherReading, WeatherService};
use anyhow::Result;
use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Congestion returned when no trained model answer is trustworthy.
pub const DEFAULT_CONGESTION: f64 = 50.0;

const DELAY_MODEL: &str = "delay";
const CONGESTION_MODEL: &str = "congestion";
const METRICS_KEY: &str = "metrics";

#[derive(Default)]
struct ModelState {
    delay: Option<RegressionPipeline>,
    congestion: Option<RegressionPipeline>,
    metrics: ModelMetrics,
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub success: bool,
    pub metrics: ModelMetrics,
}

pub struct AdvisoryService {
    timetable: Arc<Timetable>,
    weather: WeatherService,
    state: RwLock<ModelState>,
    training: AtomicBool,
    store: Box<dyn ModelStore>,
}

/// Releases the training-in-flight flag on every exit path.
struct TrainingGuard<'a>(&'a AtomicBool);

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AdvisoryService {
    /// Builds the service, loading any previously trained model state from
    /// the store. Missing or unreadable entries just mean "untrained".
    pub fn new(timetable: Timetable, weather: WeatherService, store: Box<dyn ModelStore>) -> Self {
        let mut state = ModelState::default();

        match store.load(DELAY_MODEL) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(pipeline) => {
                    info!(model = DELAY_MODEL, "loaded trained model");
                    state.delay = Some(pipeline);
                }
                Err(e) => warn!(model = DELAY_MODEL, error = %e, "stored model unreadable"),
            },
            Ok(None) => {}
            Err(e) => warn!(model = DELAY_MODEL, error = %e, "could not read model store"),
        }
        match store.load(CONGESTION_MODEL) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(pipeline) => {
                    info!(model = CONGESTION_MODEL, "loaded trained model");
                    state.congestion = Some(pipeline);
                }
                Err(e) => warn!(model = CONGESTION_MODEL, error = %e, "stored model unreadable"),
            },
            Ok(None) => {}
            Err(e) => warn!(model = CONGESTION_MODEL, error = %e, "could not read model store"),
        }
        if let Ok(Some(value)) = store.load(METRICS_KEY) {
            match serde_json::from_value(value) {
                Ok(metrics) => state.metrics = metrics,
                Err(e) => warn!(error = %e, "stored metrics unreadable"),
            }
        }

        AdvisoryService {
            timetable: Arc::new(timetable),
            weather,
            state: RwLock::new(state),
            training: AtomicBool::new(false),
            store,
        }
    }

    pub fn health(&self) -> HealthStatus {
        let state = self.state.read().expect("model state poisoned");
        HealthStatus {
            status: "healthy",
            model_loaded: state.delay.is_some() && state.congestion.is_some(),
        }
    }

    pub fn metrics(&self) -> ModelMetrics {
        self.state
            .read()
            .expect("model state poisoned")
            .metrics
            .clone()
    }

    /// Predicted additional delay in minutes, never negative. Untrained
    /// model yields the neutral default of 0.
    pub fn predict_train_delay(&self, row: &TrainFeatures) -> f64 {
        let state = self.state.read().expect("model state poisoned");
        match &state.delay {
            Some(pipeline) => pipeline.predict(row).max(0.0),
            None => {
                debug!(train = %row.train_id, "delay model not trained, returning 0");
                0.0
            }
        }
    }

    /// Predicted congestion percentage, clamped to 0..=100. Untrained
    /// model yields [`DEFAULT_CONGESTION`].
    pub fn predict_section_congestion(&self, row: &SectionFeatures) -> f64 {
        let state = self.state.read().expect("model state poisoned");
        match &state.congestion {
            Some(pipeline) => pipeline.predict(row).clamp(0.0, 100.0),
            None => {
                debug!(section = %row.key, "congestion model not trained, returning default");
                DEFAULT_CONGESTION
            }
        }
    }

    /// Deterministic optimal-speed recommendation, exposed alongside the
    /// learned models for interface symmetry.
    pub fn recommend_optimal_speed(&self, row: &TrainFeatures, congestion: f64) -> f64 {
        optimal_speed(row.train_type, row.weather, congestion, row.delay_minutes)
    }

    /// Runs the full synthesis pass over a snapshot and returns the ranked
    /// recommendations together with the current model metrics.
    #[tracing::instrument(skip(self, snapshot), fields(trains = snapshot.trains.len()))]
    pub async fn generate_recommendations(
        &self,
        snapshot: &NetworkSnapshot,
    ) -> (Vec<Recommendation>, ModelMetrics) {
        let now = Local::now();
        let weather_map = self.station_weather(&snapshot.stations).await;
        let sections = build_sections(snapshot, &self.timetable);

        let mut recommendations = Vec::new();

        for (id, train) in &snapshot.trains {
            if let Some(assessment) = self.assess(id, train, snapshot, &sections, &weather_map, now)
            {
                recommendations.extend(recommendations_for(&assessment, now));
            }
        }

        rank(&mut recommendations);
        info!(count = recommendations.len(), "recommendations generated");
        (recommendations, self.metrics())
    }

    /// Full model assessment of one train. `None` when the train fails a
    /// qualification check or is not in the snapshot.
    pub async fn assess_train(
        &self,
        snapshot: &NetworkSnapshot,
        train_id: &str,
    ) -> Option<TrainAssessment> {
        let train = snapshot.trains.get(train_id)?;
        let now = Local::now();
        let weather_map = self.station_weather(&snapshot.stations).await;
        let sections = build_sections(snapshot, &self.timetable);
        self.assess(train_id, train, snapshot, &sections, &weather_map, now)
    }

    fn assess(
        &self,
        id: &str,
        train: &Train,
        snapshot: &NetworkSnapshot,
        sections: &HashMap<SectionKey, Section>,
        weather_map: &HashMap<String, WeatherReading>,
        now: DateTime<Local>,
    ) -> Option<TrainAssessment> {
        let q = qualify_train(id, train, snapshot, &self.timetable)?;

        let condition = weather_map
            .get(&q.current_station)
            .map_or(WeatherCondition::Unknown, |r| r.condition);

        let key = SectionKey::new(&q.current_station, &q.next_station);
        let (num_trains, length_km) = sections
            .get(&key)
            .map(|s| {
                let length = if s.length_km > 0.0 {
                    s.length_km
                } else {
                    q.distance_to_next_km
                };
                (s.trains.len().max(1), length)
            })
            .unwrap_or((1, q.distance_to_next_km));

        let section_row = section_features(key, num_trains, length_km, condition, now);
        let congestion = self.predict_section_congestion(&section_row);

        let delay_minutes = f64::from(train.delay_minutes());
        let features = TrainFeatures {
            train_id: id.to_string(),
            train_type: train.train_type,
            distance_km: q.distance_to_next_km,
            current_speed: ASSUMED_AVERAGE_SPEED_KMH,
            congestion_level: congestion,
            priority_level: priority_level(train.train_type),
            weather: condition,
            time_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
            current_station: q.current_station.clone(),
            next_station: q.next_station.clone(),
            delay_minutes,
        };

        let predicted_delay = self.predict_train_delay(&features);
        let speed = self.recommend_optimal_speed(&features, congestion);
        let platforms = snapshot
            .station(&q.next_station)
            .map_or(0, |s| s.platforms);

        Some(TrainAssessment {
            train_id: id.to_string(),
            train_type: train.train_type,
            status: train.status.unwrap_or(TrainStatus::Unknown),
            current_station: q.current_station,
            next_station: q.next_station,
            distance_to_next_km: q.distance_to_next_km,
            delay_minutes,
            predicted_delay,
            congestion,
            condition,
            optimal_speed: speed,
            next_station_platforms: platforms,
        })
    }

    /// Trains both models on the snapshot. At most one training run is in
    /// flight at a time; a second caller is skipped, not queued. Failure at
    /// any stage leaves previously trained state untouched.
    #[tracing::instrument(skip(self, snapshot), fields(trains = snapshot.trains.len()))]
    pub async fn train_models(&self, snapshot: &NetworkSnapshot) -> TrainOutcome {
        if self
            .training
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("training already in progress, skipping this run");
            return TrainOutcome {
                success: false,
                metrics: self.metrics(),
            };
        }
        let _guard = TrainingGuard(&self.training);

        info!("starting model training");
        let now = Local::now();
        let weather_map = self.station_weather(&snapshot.stations).await;
        let mut rng = StdRng::from_entropy();

        let delay_dataset =
            build_delay_dataset(snapshot, &self.timetable, &weather_map, now, &mut rng);
        let sections = build_sections(snapshot, &self.timetable);
        let congestion_dataset =
            build_congestion_dataset(&sections, &weather_map, now, &mut rng);

        let delay_fit = RegressionPipeline::fit(
            DELAY_MODEL,
            &delay_dataset.rows,
            &delay_dataset.labels,
            DELAY_MIN_SAMPLES,
        );
        let (delay_pipeline, delay_accuracy) = match delay_fit {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "delay model training failed");
                return TrainOutcome {
                    success: false,
                    metrics: self.metrics(),
                };
            }
        };

        let congestion_fit = RegressionPipeline::fit(
            CONGESTION_MODEL,
            &congestion_dataset.rows,
            &congestion_dataset.labels,
            CONGESTION_MIN_SAMPLES,
        );
        let (congestion_pipeline, congestion_accuracy) = match congestion_fit {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "congestion model training failed");
                return TrainOutcome {
                    success: false,
                    metrics: self.metrics(),
                };
            }
        };

        let metrics = ModelMetrics {
            delay: Some(delay_accuracy),
            congestion: Some(congestion_accuracy),
            last_trained: Some(Utc::now()),
        };

        {
            let mut state = self.state.write().expect("model state poisoned");
            state.delay = Some(delay_pipeline.clone());
            state.congestion = Some(congestion_pipeline.clone());
            state.metrics = metrics.clone();
        }

        self.persist(&delay_pipeline, &congestion_pipeline, &metrics);
        info!("model training complete");

        TrainOutcome {
            success: true,
            metrics,
        }
    }

    /// Weather for one station, looked up by code or name.
    pub async fn weather_for_station(
        &self,
        stations: &[Station],
        key: &str,
    ) -> Option<WeatherReading> {
        let station = stations.iter().find(|s| {
            s.name.eq_ignore_ascii_case(key)
                || s.station_code
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(key))
        })?;
        Some(self.weather.for_station(station).await)
    }

    /// Weather for every station, keyed by station code (name if no code).
    pub async fn weather_for_all_stations(
        &self,
        stations: &[Station],
    ) -> HashMap<String, WeatherReading> {
        self.weather.for_all_stations(stations).await
    }

    /// Pre-fetches weather per station into a map keyed by lowercased
    /// station name, so the synchronous feature builders stay pure.
    async fn station_weather(&self, stations: &[Station]) -> HashMap<String, WeatherReading> {
        let mut map = HashMap::with_capacity(stations.len());
        for station in stations {
            map.insert(
                station.name.to_ascii_lowercase(),
                self.weather.for_station(station).await,
            );
        }
        map
    }

    fn persist(
        &self,
        delay: &RegressionPipeline,
        congestion: &RegressionPipeline,
        metrics: &ModelMetrics,
    ) {
        let entries = [
            (DELAY_MODEL, serde_json::to_value(delay)),
            (CONGESTION_MODEL, serde_json::to_value(congestion)),
            (METRICS_KEY, serde_json::to_value(metrics)),
        ];
        for (name, value) in entries {
            match value {
                Ok(value) => {
                    if let Err(e) = self.store.save(name, &value) {
                        error!(model = name, error = %e, "failed to persist model state");
                    }
                }
                Err(e) => error!(model = name, error = %e, "failed to serialize model state"),
            }
        }
    }
}

/// Periodic retraining: reloads data through `load` and trains once
/// immediately, then at each tick. A run still executing when the next tick
/// fires makes that tick a no-op (skip-if-busy). Abort the returned handle
/// to cancel the schedule.
pub fn spawn_retraining<F>(
    service: Arc<AdvisoryService>,
    period: Duration,
    load: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Result<NetworkSnapshot> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The first tick completes immediately, so a fresh process does
        // not serve untrained defaults for a whole period.
        loop {
            interval.tick().await;
            match load() {
                Ok(snapshot) => {
                    let outcome = service.train_models(&snapshot).await;
                    info!(success = outcome.success, "scheduled training finished");
                }
                Err(e) => warn!(error = %e, "could not load data for scheduled training"),
            }
        }
    })
}
