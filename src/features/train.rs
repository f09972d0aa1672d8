//! Delay-model feature building.

use super::{ASSUMED_AVERAGE_SPEED_KMH, TrainFeatures, priority_level, qualify_train};
use crate::types::{NetworkSnapshot, Timetable};
use crate::weather::{WeatherCondition, WeatherReading};
use chrono::{DateTime, Datelike, Local, Timelike};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Training rows plus labels (accumulated delay minutes).
#[derive(Debug, Default)]
pub struct DelayDataset {
    pub rows: Vec<TrainFeatures>,
    pub labels: Vec<f64>,
}

/// Builds the delay training set from a snapshot. Trains failing any
/// qualification check are excluded; nothing else about them is touched.
///
/// `weather` maps lowercased station names to pre-fetched readings. The
/// congestion signal has no ground-truth source upstream, so the training
/// path draws a placeholder level in 10..90 from `rng`.
pub fn build_delay_dataset<R: Rng>(
    snapshot: &NetworkSnapshot,
    timetable: &Timetable,
    weather: &HashMap<String, WeatherReading>,
    now: DateTime<Local>,
    rng: &mut R,
) -> DelayDataset {
    let mut dataset = DelayDataset::default();

    for (id, train) in &snapshot.trains {
        let Some(q) = qualify_train(id, train, snapshot, timetable) else {
            continue;
        };

        let condition = weather
            .get(&q.current_station)
            .map_or(WeatherCondition::Unknown, |r| r.condition);
        let delay_minutes = f64::from(train.delay_minutes());

        dataset.rows.push(TrainFeatures {
            train_id: id.clone(),
            train_type: train.train_type,
            distance_km: q.distance_to_next_km,
            current_speed: ASSUMED_AVERAGE_SPEED_KMH,
            congestion_level: f64::from(rng.gen_range(10..90)),
            priority_level: priority_level(train.train_type),
            weather: condition,
            time_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
            current_station: q.current_station,
            next_station: q.next_station,
            delay_minutes,
        });
        dataset.labels.push(delay_minutes);
    }

    debug!(rows = dataset.rows.len(), "delay dataset built");
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::fixtures::small_network;
    use crate::types::{TrainType, Train};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_dataset_excludes_unqualified_trains() {
        let (mut snapshot, timetable) = small_network();
        // One train with no station, one with no status.
        snapshot.trains.insert(
            "broken1".to_string(),
            Train {
                id: "broken1".to_string(),
                train_type: TrainType::Local,
                station: None,
                status: None,
                delayed_time: None,
            },
        );
        snapshot
            .trains
            .get_mut("t0")
            .unwrap()
            .status = None;

        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let dataset =
            build_delay_dataset(&snapshot, &timetable, &weather, Local::now(), &mut rng);

        // 4 qualifying trains in the fixture, minus the one whose status
        // was cleared.
        assert_eq!(dataset.rows.len(), 3);
        assert_eq!(dataset.labels.len(), 3);
        assert!(dataset.rows.iter().all(|r| r.train_id != "t0"));
        assert!(dataset.rows.iter().all(|r| r.train_id != "broken1"));
    }

    #[test]
    fn test_label_is_delay_minutes() {
        let (mut snapshot, timetable) = small_network();
        snapshot.trains.get_mut("t1").unwrap().delayed_time = Some(crate::types::DelayedTime {
            hours: "0".to_string(),
            minutes: "20".to_string(),
        });

        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let dataset =
            build_delay_dataset(&snapshot, &timetable, &weather, Local::now(), &mut rng);

        let row_idx = dataset
            .rows
            .iter()
            .position(|r| r.train_id == "t1")
            .unwrap();
        assert_eq!(dataset.labels[row_idx], 20.0);
        assert_eq!(dataset.rows[row_idx].delay_minutes, 20.0);
    }

    #[test]
    fn test_missing_weather_is_unknown_not_error() {
        let (snapshot, timetable) = small_network();
        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let dataset =
            build_delay_dataset(&snapshot, &timetable, &weather, Local::now(), &mut rng);
        assert!(
            dataset
                .rows
                .iter()
                .all(|r| r.weather == WeatherCondition::Unknown)
        );
    }

    #[test]
    fn test_congestion_placeholder_in_range() {
        let (snapshot, timetable) = small_network();
        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let dataset =
            build_delay_dataset(&snapshot, &timetable, &weather, Local::now(), &mut rng);
        assert!(
            dataset
                .rows
                .iter()
                .all(|r| (10.0..90.0).contains(&r.congestion_level))
        );
    }
}
