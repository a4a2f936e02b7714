//! Closed-form estimates.
//!
//! Used as inputs to the learned model and as the fallback whenever no
//! trained model is available. Planners are calibrated against the operator
//! multipliers, so the table must not change.

use crate::target::MIN_SELECTIVITY;
use crate::workload::{Filter, FilterQueryFeatures, Query};

/// Selectivity multiplier for equality predicates.
pub const EQUALITY_SELECTIVITY: f64 = 0.1;

/// Selectivity multiplier for range predicates.
pub const RANGE_SELECTIVITY: f64 = 0.5;

/// Selectivity multiplier for LIKE predicates.
pub const PATTERN_SELECTIVITY: f64 = 0.3;

/// Per-filter reduction applied by the fallback cardinality estimate.
pub const FALLBACK_FILTER_SELECTIVITY: f64 = 0.5;

/// Row count assumed when a query carries no table statistics.
pub const DEFAULT_ROW_COUNT: u64 = 1000;

/// Selectivity assumed by the filter fallback when nothing is known.
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.5;

/// Multiplier for a single operator; unrecognised operators do not filter.
pub fn operator_selectivity(operator: &str) -> f64 {
    match operator {
        "=" => EQUALITY_SELECTIVITY,
        "<" | ">" | "<=" | ">=" => RANGE_SELECTIVITY,
        "LIKE" => PATTERN_SELECTIVITY,
        _ => 1.0,
    }
}

/// Combined selectivity of a conjunction of filters, floored at 0.001.
pub fn estimate_filter_selectivity(filters: &[Filter]) -> f64 {
    let selectivity: f64 = filters
        .iter()
        .map(|filter| operator_selectivity(&filter.operator))
        .product();
    selectivity.max(MIN_SELECTIVITY)
}

/// Weighted count of the query's structural elements.
pub fn complexity_score(query: &Query) -> f64 {
    1.0 * query.filters.len() as f64
        + 2.0 * query.joins.len() as f64
        + 1.5 * query.aggregations.len() as f64
        + 0.5 * query.sort.len() as f64
}

/// Fallback cardinality: `row_count × 0.5^filters`, truncated, at least 1.
pub fn fallback_cardinality(query: &Query) -> u64 {
    let row_count = query.row_count().unwrap_or(DEFAULT_ROW_COUNT);
    let exponent = i32::try_from(query.filters.len()).unwrap_or(i32::MAX);
    let estimate = row_count as f64 * FALLBACK_FILTER_SELECTIVITY.powi(exponent);
    (estimate as u64).max(1)
}

/// Fallback selectivity for a vector-search filter.
///
/// Prefers the historical median, then the property's cardinality relative
/// to the corpus, then a conservative constant.
pub fn fallback_selectivity(features: &FilterQueryFeatures) -> f64 {
    let selectivity = if features.historical_selectivity_p50 != 0.0 {
        features.historical_selectivity_p50
    } else if features.property_cardinality > 0 && features.corpus_size > 0 {
        features.property_cardinality as f64 / features.corpus_size as f64
    } else {
        DEFAULT_FILTER_SELECTIVITY
    };
    selectivity.clamp(MIN_SELECTIVITY, 1.0)
}
