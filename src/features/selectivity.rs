//! Feature extraction for filter-selectivity prediction.
//!
//! Vector-search filters arrive with features the execution engine already
//! computed (`FilterQueryFeatures`). This module turns them into a feature
//! vector, one-hot encoding the property and operator, and provides the
//! helpers used to compute those features at query time.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::workload::{FilterQueryFeatures, Query};

use super::extractor::QueryFeatureExtractor;
use super::vector::FeatureVector;

/// Numeric features for selectivity prediction, in schema order.
pub const SELECTIVITY_FEATURES: [&str; 11] = [
    "property_cardinality",
    "corpus_size",
    "historical_selectivity_p50",
    "historical_selectivity_p95",
    "time_of_day_hour",
    "day_of_week",
    "query_vector_norm",
    "vector_dimensions",
    "filter_complexity",
    "cache_hit_rate_recent",
    "average_query_latency_p95",
];

/// Prefix of one-hot property columns. A property whose column would shadow a
/// numeric feature (`cardinality` gives `property_cardinality`) gets no column.
pub const PROPERTY_PREFIX: &str = "property_";

/// Prefix of one-hot operator columns.
pub const OPERATOR_PREFIX: &str = "operator_";

/// Samples retained per property.
pub const MAX_SELECTIVITY_SAMPLES: usize = 100;

/// Turns precomputed filter features into a feature vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectivityFeatureExtractor;

impl SelectivityFeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_features(&self, features: &FilterQueryFeatures) -> FeatureVector {
        let mut vector = FeatureVector::with_capacity(SELECTIVITY_FEATURES.len() + 2);
        vector.insert("property_cardinality", features.property_cardinality as f64);
        vector.insert("corpus_size", features.corpus_size as f64);
        vector.insert("historical_selectivity_p50", features.historical_selectivity_p50);
        vector.insert("historical_selectivity_p95", features.historical_selectivity_p95);
        vector.insert("time_of_day_hour", features.time_of_day_hour as f64);
        vector.insert("day_of_week", features.day_of_week as f64);
        vector.insert("query_vector_norm", features.query_vector_norm);
        vector.insert("vector_dimensions", features.vector_dimensions as f64);
        vector.insert("filter_complexity", features.filter_complexity as f64);
        vector.insert("cache_hit_rate_recent", features.cache_hit_rate_recent);
        vector.insert("average_query_latency_p95", features.average_query_latency_p95);
        one_hot(&mut vector, PROPERTY_PREFIX, &features.property_name);
        one_hot(&mut vector, OPERATOR_PREFIX, &features.operator);
        vector
    }
}

fn one_hot(vector: &mut FeatureVector, prefix: &str, value: &str) {
    let name = format!("{prefix}{value}");
    if SELECTIVITY_FEATURES.contains(&name.as_str()) {
        tracing::debug!("Category column {} shadows a numeric feature, skipping", name);
        return;
    }
    vector.insert(name, 1.0);
}

impl QueryFeatureExtractor for SelectivityFeatureExtractor {
    fn base_features(&self) -> &'static [&'static str] {
        &SELECTIVITY_FEATURES
    }

    fn extract(&self, query: &Query) -> FeatureVector {
        match &query.features {
            Some(features) => self.extract_features(features),
            None => self.extract_features(&FilterQueryFeatures::default()),
        }
    }
}

/// A filter tree as seen by the execution engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// Comparison on a single property
    Leaf { property: String, operator: String },
    And(Vec<FilterClause>),
    Or(Vec<FilterClause>),
    Not(Box<FilterClause>),
}

impl FilterClause {
    pub fn leaf(property: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::Leaf {
            property: property.into(),
            operator: operator.into(),
        }
    }

    /// Number of clauses in the tree; every node counts once.
    pub fn complexity(&self) -> u32 {
        match self {
            Self::Leaf { .. } => 1,
            Self::And(operands) | Self::Or(operands) => {
                1 + operands.iter().map(FilterClause::complexity).sum::<u32>()
            }
            Self::Not(operand) => 1 + operand.complexity(),
        }
    }

    /// Property of a top-level comparison; compound clauses have none.
    pub fn property_name(&self) -> &str {
        match self {
            Self::Leaf { property, .. } => property,
            _ => "",
        }
    }

    pub fn operator_name(&self) -> &str {
        match self {
            Self::Leaf { operator, .. } => operator,
            Self::And(_) => "And",
            Self::Or(_) => "Or",
            Self::Not(_) => "Not",
        }
    }
}

/// L2 norm of a query vector.
pub fn vector_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}

/// Value at `fraction` of the sorted samples, `sorted[floor((n - 1) × p)]`.
pub fn percentile(samples: &[f64], fraction: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let index = ((sorted.len() - 1) as f64 * fraction.clamp(0.0, 1.0)) as usize;
    sorted[index]
}

/// Build features for a filter issued at `issued_at`.
///
/// Historical fields are left at zero; [`PropertyHistory::fill`] supplies them.
pub fn features_for_filter(
    filter: Option<&FilterClause>,
    query_vector: &[f32],
    corpus_size: u64,
    issued_at: DateTime<Utc>,
) -> FilterQueryFeatures {
    let mut features = FilterQueryFeatures {
        corpus_size,
        vector_dimensions: u32::try_from(query_vector.len()).unwrap_or(u32::MAX),
        query_vector_norm: vector_norm(query_vector),
        time_of_day_hour: issued_at.hour(),
        day_of_week: issued_at.weekday().num_days_from_sunday(),
        ..Default::default()
    };
    if let Some(filter) = filter {
        features.property_name = filter.property_name().to_string();
        features.operator = filter.operator_name().to_string();
        features.filter_complexity = filter.complexity();
    }
    features
}

/// Observed selectivity history of one property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyStats {
    /// Largest cardinality reported for the property
    pub cardinality: u64,
    /// Most recent selectivity samples, oldest first
    pub samples: VecDeque<f64>,
    pub total_queries: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PropertyStats {
    pub fn p50(&self) -> f64 {
        percentile(&self.sample_vec(), 0.50)
    }

    pub fn p95(&self) -> f64 {
        percentile(&self.sample_vec(), 0.95)
    }

    fn sample_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

/// Per-property selectivity history, used to populate historical features.
#[derive(Debug, Clone, Default)]
pub struct PropertyHistory {
    properties: HashMap<String, PropertyStats>,
}

impl PropertyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a filter on `property`.
    pub fn observe(&mut self, property: &str, actual_selectivity: f64, cardinality: u64) {
        let stats = self.properties.entry(property.to_string()).or_default();
        stats.samples.push_back(actual_selectivity);
        while stats.samples.len() > MAX_SELECTIVITY_SAMPLES {
            stats.samples.pop_front();
        }
        stats.cardinality = stats.cardinality.max(cardinality);
        stats.total_queries += 1;
        stats.last_updated = Some(Utc::now());
    }

    pub fn get(&self, property: &str) -> Option<&PropertyStats> {
        self.properties.get(property)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Fill historical fields of `features` that the caller left at zero.
    pub fn fill(&self, features: &mut FilterQueryFeatures) {
        let Some(stats) = self.properties.get(&features.property_name) else {
            return;
        };
        if features.property_cardinality == 0 {
            features.property_cardinality = stats.cardinality;
        }
        if features.historical_selectivity_p50 == 0.0 {
            features.historical_selectivity_p50 = stats.p50();
        }
        if features.historical_selectivity_p95 == 0.0 {
            features.historical_selectivity_p95 = stats.p95();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extract_one_hot_encodes_categories() {
        let mut features = FilterQueryFeatures::new("color", "Equal");
        features.corpus_size = 5000;
        features.historical_selectivity_p50 = 0.2;
        let vector = SelectivityFeatureExtractor::new().extract_features(&features);

        assert_eq!(vector.len(), SELECTIVITY_FEATURES.len() + 2);
        assert_eq!(vector.get("property_color"), Some(1.0));
        assert_eq!(vector.get("operator_Equal"), Some(1.0));
        assert_eq!(vector.get("corpus_size"), Some(5000.0));
        assert_eq!(vector.get("historical_selectivity_p50"), Some(0.2));
        assert_eq!(vector.get("filter_complexity"), Some(1.0));
    }

    #[test]
    fn test_category_never_overwrites_numeric_feature() {
        let mut features = FilterQueryFeatures::new("cardinality", "Equal");
        features.property_cardinality = 40;
        let vector = SelectivityFeatureExtractor::new().extract_features(&features);

        assert_eq!(vector.get("property_cardinality"), Some(40.0));
        assert_eq!(vector.get("operator_Equal"), Some(1.0));
        assert_eq!(vector.len(), SELECTIVITY_FEATURES.len() + 1);
    }

    #[test]
    fn test_extract_without_features_uses_unknown_categories() {
        let vector = SelectivityFeatureExtractor::new().extract(&Query::new());
        assert_eq!(vector.get("property_unknown"), Some(1.0));
        assert_eq!(vector.get("operator_unknown"), Some(1.0));
        assert_eq!(vector.get("corpus_size"), Some(0.0));
    }

    #[test]
    fn test_clause_complexity() {
        let leaf = FilterClause::leaf("color", "Equal");
        assert_eq!(leaf.complexity(), 1);

        let tree = FilterClause::And(vec![
            FilterClause::leaf("color", "Equal"),
            FilterClause::Not(Box::new(FilterClause::leaf("size", "GreaterThan"))),
        ]);
        assert_eq!(tree.complexity(), 4);
        assert_eq!(tree.property_name(), "");
        assert_eq!(tree.operator_name(), "And");
    }

    #[test]
    fn test_vector_norm() {
        assert_eq!(vector_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(vector_norm(&[]), 0.0);
    }

    #[test]
    fn test_percentile_indexing() {
        let samples = [0.5, 0.1, 0.3, 0.2, 0.4];
        assert_eq!(percentile(&samples, 0.5), 0.3);
        assert_eq!(percentile(&samples, 0.95), 0.4);
        assert_eq!(percentile(&samples, 1.0), 0.5);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_features_for_filter() {
        // Sunday
        let issued_at = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let filter = FilterClause::leaf("color", "Equal");
        let features = features_for_filter(Some(&filter), &[0.6, 0.8], 10_000, issued_at);

        assert_eq!(features.property_name, "color");
        assert_eq!(features.operator, "Equal");
        assert_eq!(features.vector_dimensions, 2);
        assert!((features.query_vector_norm - 1.0).abs() < 1e-6);
        assert_eq!(features.time_of_day_hour, 9);
        assert_eq!(features.day_of_week, 0);
        assert_eq!(features.corpus_size, 10_000);
    }

    #[test]
    fn test_history_keeps_recent_samples() {
        let mut history = PropertyHistory::new();
        for i in 0..150 {
            history.observe("color", i as f64 / 1000.0, i);
        }
        let stats = history.get("color").unwrap();
        assert_eq!(stats.samples.len(), MAX_SELECTIVITY_SAMPLES);
        assert_eq!(stats.samples.front().copied(), Some(0.05));
        assert_eq!(stats.cardinality, 149);
        assert_eq!(stats.total_queries, 150);
    }

    #[test]
    fn test_history_fill_only_touches_missing_fields() {
        let mut history = PropertyHistory::new();
        for s in [0.1, 0.2, 0.3] {
            history.observe("color", s, 12);
        }

        let mut features = FilterQueryFeatures::new("color", "Equal");
        features.historical_selectivity_p95 = 0.9;
        history.fill(&mut features);
        assert_eq!(features.property_cardinality, 12);
        assert_eq!(features.historical_selectivity_p50, 0.2);
        assert_eq!(features.historical_selectivity_p95, 0.9);

        let mut other = FilterQueryFeatures::new("size", "Equal");
        history.fill(&mut other);
        assert_eq!(other.property_cardinality, 0);
    }
}
