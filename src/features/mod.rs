//! Feature Engineering
//!
//! Turns queries into the fixed-length numeric rows the regressor consumes.
//!
//! - **Vectors and schemas**: named features aligned to the training schema
//! - **Heuristics**: closed-form selectivity and cardinality estimates
//! - **Cardinality extraction**: structural, statistical and temporal features
//! - **Selectivity extraction**: precomputed filter features with one-hot categories

mod extractor;
mod heuristics;
mod selectivity;
mod vector;

pub use extractor::{
    CardinalityFeatureExtractor, CorrelationStats, QueryFeatureExtractor, CARDINALITY_FEATURES,
};
pub use heuristics::{
    complexity_score, estimate_filter_selectivity, fallback_cardinality, fallback_selectivity,
    operator_selectivity, DEFAULT_FILTER_SELECTIVITY, DEFAULT_ROW_COUNT, EQUALITY_SELECTIVITY,
    FALLBACK_FILTER_SELECTIVITY, PATTERN_SELECTIVITY, RANGE_SELECTIVITY,
};
pub use selectivity::{
    features_for_filter, percentile, vector_norm, FilterClause, PropertyHistory, PropertyStats,
    SelectivityFeatureExtractor, MAX_SELECTIVITY_SAMPLES, OPERATOR_PREFIX, PROPERTY_PREFIX,
    SELECTIVITY_FEATURES,
};
pub use vector::{FeatureSchema, FeatureVector, SchemaBuilder};

use crate::target::TargetKind;

/// The extractor that produces features for `target`.
pub fn extractor_for(target: TargetKind) -> Box<dyn QueryFeatureExtractor> {
    match target {
        TargetKind::Cardinality => Box::new(CardinalityFeatureExtractor::new()),
        TargetKind::Selectivity => Box::new(SelectivityFeatureExtractor::new()),
    }
}
