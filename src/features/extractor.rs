//! Feature extraction for cardinality prediction.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Datelike, Timelike};

use crate::workload::Query;

use super::heuristics::{complexity_score, estimate_filter_selectivity};
use super::vector::FeatureVector;

/// Maps a query to the named features a model consumes.
///
/// Extraction is a pure function of the query and whatever read-only state
/// the extractor was built with.
pub trait QueryFeatureExtractor: Send + Sync {
    /// Fixed features, in schema order. Extracted vectors may add more.
    fn base_features(&self) -> &'static [&'static str];

    /// Extract features from `query`, defaulting anything it lacks.
    fn extract(&self, query: &Query) -> FeatureVector;
}

/// Features derived for cardinality prediction, in schema order.
pub const CARDINALITY_FEATURES: [&str; 12] = [
    "num_filters",
    "num_joins",
    "num_aggregations",
    "num_sort_keys",
    "filter_selectivity",
    "table_size",
    "table_ndv",
    "hour_of_day",
    "day_of_week",
    "correlated_columns",
    "complexity_score",
    "has_indexes",
];

/// Pairwise column correlation coefficients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationStats {
    pairs: HashMap<(String, String), f64>,
}

impl CorrelationStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    /// Record the correlation between two columns. Order does not matter.
    pub fn insert(&mut self, a: &str, b: &str, coefficient: f64) {
        self.pairs.insert(Self::key(a, b), coefficient);
    }

    pub fn with_pair(mut self, a: &str, b: &str, coefficient: f64) -> Self {
        self.insert(a, b, coefficient);
        self
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.pairs.get(&Self::key(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Strongest absolute correlation among distinct pairs of `columns`.
    pub fn max_abs_correlation(&self, columns: &[&str]) -> f64 {
        let mut strongest: f64 = 0.0;
        for (i, a) in columns.iter().enumerate() {
            for b in &columns[i + 1..] {
                if a == b {
                    continue;
                }
                if let Some(coefficient) = self.get(a, b) {
                    if coefficient.is_finite() {
                        strongest = strongest.max(coefficient.abs());
                    }
                }
            }
        }
        strongest
    }
}

/// Extracts structural, statistical and temporal query features.
#[derive(Debug, Default)]
pub struct CardinalityFeatureExtractor {
    correlations: OnceLock<CorrelationStats>,
}

impl CardinalityFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor whose correlation cache is already populated.
    pub fn with_correlations(stats: CorrelationStats) -> Self {
        let extractor = Self::new();
        let _ = extractor.correlations.set(stats);
        extractor
    }

    /// Populate the correlation cache.
    ///
    /// The cache can be set once; later attempts are rejected and return
    /// `false` so concurrent extractions always see the same statistics.
    pub fn populate_correlations(&self, stats: CorrelationStats) -> bool {
        self.correlations.set(stats).is_ok()
    }

    pub fn correlations(&self) -> Option<&CorrelationStats> {
        self.correlations.get()
    }

    fn correlated_columns(&self, query: &Query) -> f64 {
        let Some(stats) = self.correlations.get() else {
            return 0.0;
        };
        let columns: Vec<&str> = query.filters.iter().map(|f| f.column.as_str()).collect();
        stats.max_abs_correlation(&columns)
    }

    fn has_indexes(query: &Query) -> f64 {
        if let Some(explicit) = query.has_indexes {
            return if explicit { 1.0 } else { 0.0 };
        }
        let indexed = query.table_stats.as_ref().is_some_and(|stats| {
            query
                .filters
                .iter()
                .any(|f| stats.indexed_columns.iter().any(|c| *c == f.column))
        });
        if indexed {
            1.0
        } else {
            0.0
        }
    }
}

impl QueryFeatureExtractor for CardinalityFeatureExtractor {
    fn base_features(&self) -> &'static [&'static str] {
        &CARDINALITY_FEATURES
    }

    fn extract(&self, query: &Query) -> FeatureVector {
        let (row_count, distinct_count) = query
            .table_stats
            .as_ref()
            .map(|stats| (stats.row_count, stats.distinct_count))
            .unwrap_or((0, 0));
        let (hour, weekday) = query
            .timestamp
            .map(|ts| (ts.hour(), ts.weekday().num_days_from_monday()))
            .unwrap_or((0, 0));

        let mut features = FeatureVector::with_capacity(CARDINALITY_FEATURES.len());
        features.insert("num_filters", query.filters.len() as f64);
        features.insert("num_joins", query.joins.len() as f64);
        features.insert("num_aggregations", query.aggregations.len() as f64);
        features.insert("num_sort_keys", query.sort.len() as f64);
        features.insert("filter_selectivity", estimate_filter_selectivity(&query.filters));
        features.insert("table_size", row_count as f64);
        features.insert("table_ndv", distinct_count as f64);
        features.insert("hour_of_day", hour as f64);
        features.insert("day_of_week", weekday as f64);
        features.insert("correlated_columns", self.correlated_columns(query));
        features.insert("complexity_score", complexity_score(query));
        features.insert("has_indexes", Self::has_indexes(query));
        features
    }
}
