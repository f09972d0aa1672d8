//! Prediction models: a uniform fit/predict/evaluate pipeline over
//! standardized numeric features and one-hot encoded categoricals.

pub mod encode;
pub mod linear;
pub mod metrics;
pub mod split;

use crate::types::ModelAccuracy;
use anyhow::{Result, bail};
use encode::{OneHotEncoder, StandardScaler};
use linear::LinearRegressor;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minimum training samples for the delay model.
pub const DELAY_MIN_SAMPLES: usize = 10;
/// Minimum training samples for the congestion model.
pub const CONGESTION_MIN_SAMPLES: usize = 5;
/// Fixed seed so evaluation metrics are reproducible.
pub const SPLIT_SEED: u64 = 42;

const TEST_FRACTION: f64 = 0.2;
const LEARNING_RATE: f64 = 0.01;
const EPOCHS: usize = 500;

/// A typed feature row the pipeline can encode. One implementation per
/// model; the numeric/categorical column order is fixed by the impl.
pub trait FeatureRow {
    fn numeric(&self) -> Vec<f64>;
    fn categorical(&self) -> Vec<String>;
}

/// Scaler + encoder + regressor, fitted together and applied together so
/// training and inference can never disagree on the feature schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionPipeline {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    model: LinearRegressor,
}

impl RegressionPipeline {
    /// Fits on an 80/20 split and evaluates on the held-out side. Fails
    /// cleanly below `min_samples` without producing a partial pipeline.
    pub fn fit<R: FeatureRow>(
        name: &str,
        rows: &[R],
        labels: &[f64],
        min_samples: usize,
    ) -> Result<(Self, ModelAccuracy)> {
        if rows.len() < min_samples {
            bail!(
                "not enough samples to train {} model: {} < {}",
                name,
                rows.len(),
                min_samples
            );
        }

        let (train_idx, test_idx) = split::train_test_split(rows.len(), TEST_FRACTION, SPLIT_SEED);

        let numeric: Vec<Vec<f64>> = rows.iter().map(FeatureRow::numeric).collect();
        let categorical: Vec<Vec<String>> = rows.iter().map(FeatureRow::categorical).collect();

        let train_numeric: Vec<Vec<f64>> =
            train_idx.iter().map(|&i| numeric[i].clone()).collect();
        let train_categorical: Vec<Vec<String>> =
            train_idx.iter().map(|&i| categorical[i].clone()).collect();

        let scaler = StandardScaler::fit(&train_numeric);
        let encoder = OneHotEncoder::fit(&train_categorical);

        let encode = |num: &[f64], cat: &[String]| -> Vec<f64> {
            let mut row = scaler.transform(num);
            row.extend(encoder.transform(cat));
            row
        };

        let train_features: Vec<Vec<f64>> = train_idx
            .iter()
            .map(|&i| encode(&numeric[i], &categorical[i]))
            .collect();
        let train_labels: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();

        let dim = train_features.first().map_or(0, Vec::len);
        let mut model = LinearRegressor::new(dim);
        model.fit(&train_features, &train_labels, LEARNING_RATE, EPOCHS);

        let test_predictions: Vec<f64> = test_idx
            .iter()
            .map(|&i| model.predict(&encode(&numeric[i], &categorical[i])))
            .collect();
        let test_labels: Vec<f64> = test_idx.iter().map(|&i| labels[i]).collect();

        let accuracy = metrics::evaluate(&test_predictions, &test_labels);
        info!(
            model = name,
            samples = rows.len(),
            mse = accuracy.mse,
            mae = accuracy.mae,
            r2 = accuracy.r2,
            "model trained"
        );

        let pipeline = RegressionPipeline {
            scaler,
            encoder,
            model,
        };
        Ok((pipeline, accuracy))
    }

    pub fn predict<R: FeatureRow>(&self, row: &R) -> f64 {
        let mut encoded = self.scaler.transform(&row.numeric());
        encoded.extend(self.encoder.transform(&row.categorical()));
        self.model.predict(&encoded)
    }
}
