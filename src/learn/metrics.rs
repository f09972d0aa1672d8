//! Evaluation metrics shared by all regression models.

use crate::types::ModelAccuracy;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn mean_squared_error(predictions: &[f64], actuals: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / predictions.len() as f64
}

pub fn mean_absolute_error(predictions: &[f64], actuals: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).abs())
        .sum::<f64>()
        / predictions.len() as f64
}

/// Coefficient of determination. Zero-variance actuals yield 0.0 rather
/// than a division by zero.
pub fn r2_score(predictions: &[f64], actuals: &[f64]) -> f64 {
    let actual_mean = mean(actuals);
    let ss_tot: f64 = actuals.iter().map(|a| (a - actual_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (a - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

/// Builds the full accuracy record for a set of held-out predictions.
pub fn evaluate(predictions: &[f64], actuals: &[f64]) -> ModelAccuracy {
    let mse = mean_squared_error(predictions, actuals);
    let mae = mean_absolute_error(predictions, actuals);
    ModelAccuracy {
        mse,
        mae,
        r2: r2_score(predictions, actuals),
        accuracy: (100.0 - mae).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = [1.0, 2.0, 3.0];
        let acc = evaluate(&y, &y);
        assert_eq!(acc.mse, 0.0);
        assert_eq!(acc.mae, 0.0);
        assert_eq!(acc.r2, 1.0);
        assert_eq!(acc.accuracy, 100.0);
    }

    #[test]
    fn test_known_errors() {
        let predictions = [2.0, 4.0];
        let actuals = [1.0, 2.0];
        assert_eq!(mean_squared_error(&predictions, &actuals), 2.5);
        assert_eq!(mean_absolute_error(&predictions, &actuals), 1.5);
    }

    #[test]
    fn test_accuracy_floor_at_zero() {
        let predictions = [200.0];
        let actuals = [0.0];
        let acc = evaluate(&predictions, &actuals);
        assert_eq!(acc.accuracy, 0.0);
    }

    #[test]
    fn test_r2_zero_variance_actuals() {
        assert_eq!(r2_score(&[1.0, 2.0], &[5.0, 5.0]), 0.0);
    }
}
