//! CSV persistence for recommendation summaries.

use crate::types::Recommendation;
use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

/// Flattened one-row summary of a recommendation, suitable for CSV.
#[derive(Debug, Serialize)]
pub struct RecommendationRecord {
    pub generated_at: DateTime<Utc>,
    pub id: String,
    pub category: String,
    pub impact: String,
    pub confidence: u32,
    pub title: String,
    pub affected_trains: String,
    pub time_saving: String,
}

impl RecommendationRecord {
    pub fn from_recommendation(rec: &Recommendation) -> Self {
        RecommendationRecord {
            generated_at: Utc::now(),
            id: rec.id.clone(),
            category: rec.category.to_string(),
            impact: rec.impact.to_string(),
            confidence: rec.confidence,
            title: rec.title.clone(),
            affected_trains: rec.affected_trains.join(";"),
            time_saving: rec.time_saving.clone(),
        }
    }
}

/// Appends a record as a row to a CSV file, creating it with headers if it
/// does not already exist.
pub fn append_record(path: &str, record: &RecommendationRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}
