use serde::{Deserialize, Serialize};

/// Linear regression with bias, trained by batch gradient descent over
/// standardized inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearRegressor {
    pub fn new(feature_dim: usize) -> Self {
        LinearRegressor {
            weights: vec![0.0; feature_dim],
            bias: 0.0,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        row.iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bias
    }

    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[f64], lr: f64, epochs: usize) {
        if features.is_empty() {
            return;
        }
        let n = features.len() as f64;

        for _ in 0..epochs {
            let errors: Vec<f64> = features
                .iter()
                .zip(labels)
                .map(|(row, label)| self.predict(row) - label)
                .collect();

            for (idx, weight) in self.weights.iter_mut().enumerate() {
                let grad = errors
                    .iter()
                    .zip(features)
                    .map(|(err, row)| err * row[idx])
                    .sum::<f64>()
                    / n;
                *weight -= lr * grad;
            }

            let bias_grad = errors.iter().sum::<f64>() / n;
            self.bias -= lr * bias_grad;
        }
    }
}
