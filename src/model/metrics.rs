//! Held-out evaluation metrics and feature importance ranking.

use serde::{Deserialize, Serialize};

/// Regression quality on a held-out set, in the model's target space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub samples: usize,
}

impl EvaluationMetrics {
    /// Compare predictions to observed targets.
    ///
    /// With zero target variance, R² is 1 for a perfect fit and 0 otherwise.
    pub fn compute(predictions: &[f64], targets: &[f64]) -> Self {
        let samples = predictions.len().min(targets.len());
        if samples == 0 {
            return Self {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
                samples: 0,
            };
        }
        let n = samples as f64;
        let pairs = || predictions.iter().zip(targets).take(samples);

        let mae = pairs().map(|(p, t)| (p - t).abs()).sum::<f64>() / n;
        let sse = pairs().map(|(p, t)| (p - t) * (p - t)).sum::<f64>();
        let mean = targets[..samples].iter().sum::<f64>() / n;
        let sst = targets[..samples]
            .iter()
            .map(|t| (t - mean) * (t - mean))
            .sum::<f64>();

        let r2 = if sst > 0.0 {
            1.0 - sse / sst
        } else if sse == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mae,
            rmse: (sse / n).sqrt(),
            r2,
            samples,
        }
    }

    /// Confidence attached to learned estimates, `1 / (1 + MAE)`.
    pub fn confidence(&self) -> f64 {
        (1.0 / (1.0 + self.mae)).max(0.01)
    }
}

/// Share of total split gain attributed to one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pair names with importances and sort descending, ties in schema order.
pub fn rank_importance(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let metrics = EvaluationMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
        assert_eq!(metrics.samples, 3);
        assert_eq!(metrics.confidence(), 1.0);
    }

    #[test]
    fn test_metric_values() {
        let metrics = EvaluationMetrics::compute(&[2.0, 2.0, 2.0, 2.0], &[1.0, 2.0, 3.0, 2.0]);
        assert_eq!(metrics.mae, 0.5);
        assert!((metrics.rmse - 0.5f64.sqrt()).abs() < 1e-12);
        assert!(metrics.r2.abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_targets() {
        assert_eq!(EvaluationMetrics::compute(&[5.0], &[5.0]).r2, 1.0);
        assert_eq!(EvaluationMetrics::compute(&[4.0, 6.0], &[5.0, 5.0]).r2, 0.0);
    }

    #[test]
    fn test_confidence_floor() {
        let metrics = EvaluationMetrics {
            mae: 1000.0,
            rmse: 1000.0,
            r2: 0.0,
            samples: 1,
        };
        assert_eq!(metrics.confidence(), 0.01);
    }

    #[test]
    fn test_rank_importance_ties_keep_schema_order() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let ranked = rank_importance(&names, &[0.2, 0.4, 0.2, 0.2]);
        let order: Vec<&str> = ranked.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }
}
