//! Thin JSON loaders for the inbound static and live data files.

use crate::types::{NetworkSnapshot, Station, Timetable, Train};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

pub fn load_stations(path: impl AsRef<Path>) -> Result<Vec<Station>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading stations file {}", path.display()))?;
    let stations: Vec<Station> =
        serde_json::from_str(&content).context("parsing stations file")?;
    Ok(stations)
}

/// Loads the timetable, dropping any schedule whose distances are not
/// strictly increasing; a malformed schedule degrades that one train, never
/// the whole file.
pub fn load_timetable(path: impl AsRef<Path>) -> Result<Timetable> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading timetable file {}", path.display()))?;
    let mut timetable: Timetable =
        serde_json::from_str(&content).context("parsing timetable file")?;

    timetable.trains.retain(|id, schedule| {
        let ok = schedule.distances_strictly_increasing();
        if !ok {
            warn!(train = %id, "dropping schedule with non-increasing distances");
        }
        ok
    });

    Ok(timetable)
}

pub fn load_trains(path: impl AsRef<Path>) -> Result<HashMap<String, Train>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading train feed file {}", path.display()))?;
    let trains: HashMap<String, Train> =
        serde_json::from_str(&content).context("parsing train feed file")?;
    Ok(trains)
}

pub fn load_snapshot(
    trains_path: impl AsRef<Path>,
    stations_path: impl AsRef<Path>,
) -> Result<NetworkSnapshot> {
    Ok(NetworkSnapshot {
        trains: load_trains(trains_path)?,
        stations: load_stations(stations_path)?,
    })
}
