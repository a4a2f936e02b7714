//! Query descriptions and historical execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::estimator::FilterStrategy;
use crate::target::TargetKind;

use super::lenient;

/// Operator assumed when a filter does not name one.
pub const DEFAULT_OPERATOR: &str = "=";

/// Name used for categorical fields that were not reported.
pub const UNKNOWN_CATEGORY: &str = "unknown";

fn default_operator() -> String {
    DEFAULT_OPERATOR.to_string()
}

/// A single predicate of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Filtered column
    #[serde(default)]
    pub column: String,
    /// Comparison operator (`=`, `<`, `LIKE`, ...)
    #[serde(default = "default_operator", deserialize_with = "lenient::operator")]
    pub operator: String,
    /// Compared value, opaque to the estimator
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    /// Create a filter.
    pub fn new(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Statistics of the scanned table at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    /// Total rows in the table
    #[serde(default, deserialize_with = "lenient::count")]
    pub row_count: u64,
    /// Distinct values of the filtered key
    #[serde(default, deserialize_with = "lenient::count")]
    pub distinct_count: u64,
    /// Columns that have an index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexed_columns: Vec<String>,
}

impl TableStats {
    pub fn new(row_count: u64, distinct_count: u64) -> Self {
        Self {
            row_count,
            distinct_count,
            indexed_columns: Vec::new(),
        }
    }

    /// Mark a column as indexed.
    pub fn with_index(mut self, column: impl Into<String>) -> Self {
        self.indexed_columns.push(column.into());
        self
    }
}

/// Features the execution engine precomputes for a vector-search filter.
///
/// Field names follow the engine's log format (`PropertyCardinality`,
/// `CorpusSize`, ...). Every field is optional on the wire. Counts may be
/// written as floats, and `null` decodes like a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilterQueryFeatures {
    /// Filtered property
    #[serde(deserialize_with = "lenient::category")]
    pub property_name: String,
    /// Operator of the top-level filter clause
    #[serde(deserialize_with = "lenient::category")]
    pub operator: String,
    /// Number of clauses in the filter tree
    #[serde(deserialize_with = "lenient::complexity")]
    pub filter_complexity: u32,
    /// Estimated distinct values of the property
    #[serde(deserialize_with = "lenient::count")]
    pub property_cardinality: u64,
    /// Total documents in the index
    #[serde(deserialize_with = "lenient::count")]
    pub corpus_size: u64,
    /// Median selectivity of past filters on this property
    #[serde(deserialize_with = "lenient::number")]
    pub historical_selectivity_p50: f64,
    /// 95th percentile selectivity of past filters on this property
    #[serde(deserialize_with = "lenient::number")]
    pub historical_selectivity_p95: f64,
    /// Hour of day, 0-23
    #[serde(deserialize_with = "lenient::count")]
    pub time_of_day_hour: u32,
    /// Day of week, 0-6 with Sunday = 0
    #[serde(deserialize_with = "lenient::count")]
    pub day_of_week: u32,
    /// L2 norm of the query vector
    #[serde(deserialize_with = "lenient::number")]
    pub query_vector_norm: f64,
    /// Dimensionality of the query vector
    #[serde(deserialize_with = "lenient::count")]
    pub vector_dimensions: u32,
    /// Recent cache hit rate
    #[serde(deserialize_with = "lenient::number")]
    pub cache_hit_rate_recent: f64,
    /// Recent p95 query latency in nanoseconds
    #[serde(deserialize_with = "lenient::number")]
    pub average_query_latency_p95: f64,
}

impl Default for FilterQueryFeatures {
    fn default() -> Self {
        Self {
            property_name: UNKNOWN_CATEGORY.to_string(),
            operator: UNKNOWN_CATEGORY.to_string(),
            filter_complexity: 1,
            property_cardinality: 0,
            corpus_size: 0,
            historical_selectivity_p50: 0.0,
            historical_selectivity_p95: 0.0,
            time_of_day_hour: 0,
            day_of_week: 0,
            query_vector_norm: 0.0,
            vector_dimensions: 0,
            cache_hit_rate_recent: 0.0,
            average_query_latency_p95: 0.0,
        }
    }
}

impl FilterQueryFeatures {
    /// Features for a filter on `property` using `operator`, everything else defaulted.
    pub fn new(property: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            property_name: property.into(),
            operator: operator.into(),
            ..Default::default()
        }
    }
}

/// A query awaiting an estimate.
///
/// Joins, aggregations and sort keys are opaque to the estimator: only their
/// number participates in feature extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub joins: Vec<Value>,
    #[serde(default)]
    pub aggregations: Vec<Value>,
    #[serde(default)]
    pub sort: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_stats: Option<TableStats>,
    /// Explicit index availability, overriding `table_stats.indexed_columns`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_indexes: Option<bool>,
    /// When the query was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Precomputed features for selectivity prediction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FilterQueryFeatures>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// A query carrying only precomputed selectivity features.
    pub fn from_features(features: FilterQueryFeatures) -> Self {
        Self {
            features: Some(features),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_join(mut self, join: impl Into<Value>) -> Self {
        self.joins.push(join.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: impl Into<Value>) -> Self {
        self.aggregations.push(aggregation.into());
        self
    }

    pub fn with_sort_key(mut self, key: impl Into<Value>) -> Self {
        self.sort.push(key.into());
        self
    }

    pub fn with_table_stats(mut self, stats: TableStats) -> Self {
        self.table_stats = Some(stats);
        self
    }

    pub fn with_indexes(mut self, has_indexes: bool) -> Self {
        self.has_indexes = Some(has_indexes);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Row count of the scanned table, if reported.
    pub fn row_count(&self) -> Option<u64> {
        self.table_stats.as_ref().map(|stats| stats.row_count)
    }
}

/// A historical query execution with its observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExecutionRecord {
    #[serde(flatten)]
    pub query: Query,
    /// Rows actually returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_cardinality: Option<f64>,
    /// Fraction of the corpus that actually passed the filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_selectivity: Option<f64>,
    /// Execution latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Filter strategy that would have been fastest, for vector-search filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_strategy: Option<FilterStrategy>,
}

impl QueryExecutionRecord {
    /// A record of a query that returned `actual_cardinality` rows.
    pub fn with_cardinality(query: Query, actual_cardinality: f64) -> Self {
        Self {
            query,
            actual_cardinality: Some(actual_cardinality),
            actual_selectivity: None,
            execution_time_ms: None,
            optimal_strategy: None,
        }
    }

    /// A record of a filter whose observed selectivity was `actual_selectivity`.
    pub fn with_selectivity(features: FilterQueryFeatures, actual_selectivity: f64) -> Self {
        Self {
            query: Query::from_features(features),
            actual_cardinality: None,
            actual_selectivity: Some(actual_selectivity),
            execution_time_ms: None,
            optimal_strategy: None,
        }
    }

    pub fn with_execution_time(mut self, millis: f64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }

    pub fn with_optimal_strategy(mut self, strategy: FilterStrategy) -> Self {
        self.optimal_strategy = Some(strategy);
        self
    }

    /// When the query was executed.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.query.timestamp
    }

    /// Observed outcome for `target`, validated against its domain.
    pub fn outcome(&self, target: TargetKind) -> Result<f64, String> {
        let value = match target {
            TargetKind::Cardinality => self.actual_cardinality,
            TargetKind::Selectivity => self.actual_selectivity,
        }
        .ok_or_else(|| format!("missing field `{}`", target.outcome_field()))?;
        target.validate_outcome(value)?;
        Ok(value)
    }
}
