//! Section graph derivation and congestion-model feature building.

use super::{ASSUMED_AVERAGE_SPEED_KMH, SectionFeatures, qualify_train};
use crate::types::{NetworkSnapshot, SectionKey, Timetable};
use crate::weather::{WeatherCondition, WeatherReading};
use chrono::{DateTime, Local, Timelike};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_SECTION_TYPE: &str = "normal";

/// Track segment between two adjacent timetabled stations. Occupancy is
/// recomputed per call, never persisted.
#[derive(Debug, Clone)]
pub struct Section {
    pub key: SectionKey,
    pub length_km: f64,
    pub section_type: String,
    pub trains: Vec<String>,
}

/// Derives the section graph from adjacent timetable stops of every train.
/// Length comes from the first timetable pair observed for a station pair;
/// occupancy comes from the live snapshot via the shared skip policy.
pub fn build_sections(
    snapshot: &NetworkSnapshot,
    timetable: &Timetable,
) -> HashMap<SectionKey, Section> {
    let mut sections: HashMap<SectionKey, Section> = HashMap::new();

    for schedule in timetable.trains.values() {
        for pair in schedule.stops.windows(2) {
            let key = SectionKey::new(&pair[0].station_name, &pair[1].station_name);
            sections.entry(key.clone()).or_insert_with(|| Section {
                key,
                length_km: pair[1].distance_km - pair[0].distance_km,
                section_type: DEFAULT_SECTION_TYPE.to_string(),
                trains: Vec::new(),
            });
        }
    }

    for (id, train) in &snapshot.trains {
        if let Some(q) = qualify_train(id, train, snapshot, timetable) {
            let key = SectionKey::new(&q.current_station, &q.next_station);
            if let Some(section) = sections.get_mut(&key) {
                section.trains.push(id.clone());
            }
        }
    }

    sections
}

/// Builds the inference-time feature row for one section.
pub fn section_features(
    key: SectionKey,
    num_trains: usize,
    length_km: f64,
    condition: WeatherCondition,
    now: DateTime<Local>,
) -> SectionFeatures {
    SectionFeatures {
        key,
        num_trains,
        avg_speed: ASSUMED_AVERAGE_SPEED_KMH,
        section_length: length_km,
        time_to_next_station: length_km / ASSUMED_AVERAGE_SPEED_KMH * 60.0,
        section_type: DEFAULT_SECTION_TYPE.to_string(),
        weather: condition,
        time_of_day: now.hour(),
    }
}

/// Training rows plus simulated congestion labels.
#[derive(Debug, Default)]
pub struct CongestionDataset {
    pub rows: Vec<SectionFeatures>,
    pub labels: Vec<f64>,
}

/// Builds the congestion training set. Sections with zero length or zero
/// assigned trains are excluded from training only; inference still
/// handles them via the documented default.
///
/// There is no ground-truth congestion label upstream: the label is
/// simulated as `min(100, trains * 20 + noise)`, a known simplification.
pub fn build_congestion_dataset<R: Rng>(
    sections: &HashMap<SectionKey, Section>,
    weather: &HashMap<String, WeatherReading>,
    now: DateTime<Local>,
    rng: &mut R,
) -> CongestionDataset {
    let mut dataset = CongestionDataset::default();

    for section in sections.values() {
        if section.length_km <= 0.0 {
            debug!(section = %section.key, "skipping zero-length section");
            continue;
        }
        let num_trains = section.trains.len();
        if num_trains == 0 {
            debug!(section = %section.key, "skipping empty section");
            continue;
        }

        // Canonical keys lose traversal direction, so the lexicographically
        // smaller endpoint stands in for the section's start station.
        let (start, _) = section.key.endpoints();
        let condition = weather
            .get(start)
            .map_or(WeatherCondition::Unknown, |r| r.condition);

        dataset.rows.push(section_features(
            section.key.clone(),
            num_trains,
            section.length_km,
            condition,
            now,
        ));

        let congestion = (num_trains as f64 * 20.0 + f64::from(rng.gen_range(-10..10))).min(100.0);
        dataset.labels.push(congestion.max(0.0));
    }

    debug!(rows = dataset.rows.len(), "congestion dataset built");
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::fixtures::small_network;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_sections_derived_from_timetable_pairs() {
        let (snapshot, timetable) = small_network();
        let sections = build_sections(&snapshot, &timetable);
        // a-b, b-c, c-d, d-e.
        assert_eq!(sections.len(), 4);

        let ab = sections.get(&SectionKey::new("a", "b")).unwrap();
        assert!((ab.length_km - 20.0).abs() < 1e-9);
        assert_eq!(ab.section_type, DEFAULT_SECTION_TYPE);
    }

    #[test]
    fn test_reverse_direction_maps_to_same_section() {
        let (snapshot, timetable) = small_network();
        let sections = build_sections(&snapshot, &timetable);
        assert!(sections.contains_key(&SectionKey::new("b", "a")));
        assert!(sections.contains_key(&SectionKey::new("a", "b")));
        assert_eq!(
            sections.get(&SectionKey::new("b", "a")).unwrap().key,
            sections.get(&SectionKey::new("a", "b")).unwrap().key
        );
    }

    #[test]
    fn test_occupancy_assignment() {
        let (snapshot, timetable) = small_network();
        let sections = build_sections(&snapshot, &timetable);
        // t0 sits at "a" heading to "b".
        let ab = sections.get(&SectionKey::new("a", "b")).unwrap();
        assert!(ab.trains.contains(&"t0".to_string()));
    }

    #[test]
    fn test_empty_sections_excluded_from_training() {
        let (mut snapshot, timetable) = small_network();
        // Remove all trains: every section becomes empty.
        snapshot.trains.clear();
        let sections = build_sections(&snapshot, &timetable);
        assert_eq!(sections.len(), 4);

        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(1);
        let dataset =
            build_congestion_dataset(&sections, &weather, Local::now(), &mut rng);
        assert!(dataset.rows.is_empty());
    }

    #[test]
    fn test_labels_in_range() {
        let (snapshot, timetable) = small_network();
        let sections = build_sections(&snapshot, &timetable);
        let weather = HashMap::new();
        let mut rng = StdRng::seed_from_u64(1);
        let dataset =
            build_congestion_dataset(&sections, &weather, Local::now(), &mut rng);

        assert!(!dataset.rows.is_empty());
        assert!(dataset.labels.iter().all(|l| (0.0..=100.0).contains(l)));
    }

    #[test]
    fn test_training_weather_keyed_by_smaller_endpoint() {
        use crate::features::fixtures::{schedule, station, train};
        use crate::types::{NetworkSnapshot, Timetable, TrainType};
        use crate::weather::WeatherReading;

        // Traversal runs z -> a; the canonical key is a-z, so the reading
        // for "a" supplies the row's weather even though "z" is the start.
        let stations = vec![station("z", 2), station("a", 2)];
        let mut trains = HashMap::new();
        trains.insert("t0".to_string(), train("t0", TrainType::Passenger, Some("z")));
        let mut schedules = HashMap::new();
        schedules.insert("t0".to_string(), schedule(&[("z", 0.0), ("a", 20.0)]));
        let snapshot = NetworkSnapshot { trains, stations };
        let timetable = Timetable { trains: schedules };

        let sections = build_sections(&snapshot, &timetable);
        let mut rain = WeatherReading::fallback();
        rain.condition = WeatherCondition::Rain;
        let mut weather = HashMap::new();
        weather.insert("a".to_string(), rain);

        let mut rng = StdRng::seed_from_u64(1);
        let dataset = build_congestion_dataset(&sections, &weather, Local::now(), &mut rng);
        assert_eq!(dataset.rows.len(), 1);
        assert_eq!(dataset.rows[0].weather, WeatherCondition::Rain);
    }

    #[test]
    fn test_time_to_next_station_from_length() {
        let f = section_features(
            SectionKey::new("a", "b"),
            2,
            30.0,
            WeatherCondition::Clear,
            Local::now(),
        );
        // 30 km at 60 km/h is 30 minutes.
        assert!((f.time_to_next_station - 30.0).abs() < 1e-9);
    }
}
