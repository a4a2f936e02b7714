//! Prediction targets.
//!
//! A model predicts either result cardinality or filter selectivity. The
//! target decides which record fields are required, how the regression
//! target is transformed before fitting, and how a raw model score is mapped
//! back into the estimate domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;

/// Smallest cardinality ever reported.
pub const MIN_CARDINALITY: f64 = 1.0;

/// Largest cardinality ever reported.
pub const MAX_CARDINALITY: f64 = 10_000_000.0;

/// Floor applied to every selectivity, learned or heuristic.
pub const MIN_SELECTIVITY: f64 = 0.001;

/// What a model is trained to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Number of rows a query returns. Fitted in `ln(1 + y)` space.
    Cardinality,
    /// Fraction of the corpus surviving a filter. Fitted directly.
    Selectivity,
}

impl TargetKind {
    /// Top-level record fields that must be present for this target.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Cardinality => &[
                "filters",
                "joins",
                "aggregations",
                "table_stats",
                "actual_cardinality",
            ],
            Self::Selectivity => &["features", "actual_selectivity"],
        }
    }

    /// Name of the record field holding the observed outcome.
    pub fn outcome_field(&self) -> &'static str {
        match self {
            Self::Cardinality => "actual_cardinality",
            Self::Selectivity => "actual_selectivity",
        }
    }

    /// Map an observed outcome into the space the regressor is fitted in.
    pub fn transform_target(&self, observed: f64) -> f64 {
        match self {
            Self::Cardinality => observed.ln_1p(),
            Self::Selectivity => observed,
        }
    }

    /// Map a raw regressor score back into the clamped estimate domain.
    ///
    /// Returns `None` when the score is NaN.
    pub fn finish(&self, raw: f64) -> Option<f64> {
        if raw.is_nan() {
            return None;
        }
        Some(match self {
            Self::Cardinality => raw.exp_m1().clamp(MIN_CARDINALITY, MAX_CARDINALITY),
            Self::Selectivity => raw.clamp(MIN_SELECTIVITY, 1.0),
        })
    }

    /// Check that an observed outcome lies in the target's domain.
    pub fn validate_outcome(&self, observed: f64) -> Result<(), String> {
        if !observed.is_finite() {
            return Err(format!("{} must be finite", self.outcome_field()));
        }
        if observed < 0.0 {
            return Err(format!(
                "{} must be non-negative, got {observed}",
                self.outcome_field()
            ));
        }
        if *self == Self::Selectivity && observed > 1.0 {
            return Err(format!(
                "actual_selectivity must be within [0, 1], got {observed}"
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cardinality => write!(f, "cardinality"),
            Self::Selectivity => write!(f, "selectivity"),
        }
    }
}

impl FromStr for TargetKind {
    type Err = EstimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cardinality" => Ok(Self::Cardinality),
            "selectivity" => Ok(Self::Selectivity),
            other => Err(EstimatorError::invalid_argument(format!(
                "unknown target '{other}', expected 'cardinality' or 'selectivity'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_round_trip_through_log_space() {
        let kind = TargetKind::Cardinality;
        let raw = kind.transform_target(2499.0);
        assert!((kind.finish(raw).unwrap() - 2499.0).abs() < 1e-6);
    }

    #[test]
    fn test_cardinality_clamped() {
        let kind = TargetKind::Cardinality;
        assert_eq!(kind.finish(-5.0), Some(MIN_CARDINALITY));
        assert_eq!(kind.finish(100.0), Some(MAX_CARDINALITY));
        assert_eq!(kind.finish(f64::INFINITY), Some(MAX_CARDINALITY));
        assert_eq!(kind.finish(f64::NAN), None);
    }

    #[test]
    fn test_selectivity_clamped_to_unit_interval() {
        let kind = TargetKind::Selectivity;
        assert_eq!(kind.finish(-0.2), Some(MIN_SELECTIVITY));
        assert_eq!(kind.finish(0.0), Some(MIN_SELECTIVITY));
        assert_eq!(kind.finish(1.7), Some(1.0));
        assert_eq!(kind.finish(0.25), Some(0.25));
        assert_eq!(kind.transform_target(0.25), 0.25);
    }

    #[test]
    fn test_validate_outcome() {
        assert!(TargetKind::Cardinality.validate_outcome(0.0).is_ok());
        assert!(TargetKind::Cardinality.validate_outcome(-1.0).is_err());
        assert!(TargetKind::Cardinality.validate_outcome(f64::NAN).is_err());
        assert!(TargetKind::Selectivity.validate_outcome(1.0).is_ok());
        assert!(TargetKind::Selectivity.validate_outcome(1.5).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Cardinality".parse::<TargetKind>().unwrap(), TargetKind::Cardinality);
        assert_eq!(TargetKind::Selectivity.to_string(), "selectivity");
        assert!("rows".parse::<TargetKind>().is_err());
    }
}
