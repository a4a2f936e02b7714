//! Online estimation.
//!
//! The [`Estimator`] serves cardinality and selectivity estimates to the
//! planner. It holds at most one active model behind a lock; swapping models
//! replaces an `Arc`, so predictions already running keep the model they
//! started with. Whenever no usable model is loaded, or prediction fails,
//! estimates come from closed-form heuristics instead. Estimation never fails.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EstimatorError, Result};
use crate::features::{
    fallback_cardinality, fallback_selectivity, features_for_filter, CardinalityFeatureExtractor,
    FilterClause, PropertyHistory, PropertyStats, QueryFeatureExtractor,
    SelectivityFeatureExtractor,
};
use crate::model::TrainedModel;
use crate::target::TargetKind;
use crate::workload::{
    FilterQueryFeatures, ObservationBuffer, Query, QueryExecutionRecord,
    DEFAULT_OBSERVATION_CAPACITY,
};

/// Predicted selectivity below which pre-filtering is chosen.
pub const DEFAULT_PREFILTER_THRESHOLD: f64 = 0.08;

/// Observed selectivity below which pre-filtering is labelled optimal when
/// latencies were not measured.
pub const PREFILTER_LABEL_THRESHOLD: f64 = 0.1;

/// Confidence reported for heuristic estimates.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Whether learned filter-strategy selection is active
    pub enabled: bool,
    /// Predicted selectivity below which pre-filtering is chosen
    pub prefilter_threshold: f64,
    /// Stamp the current time on queries without a timestamp
    pub stamp_missing_time: bool,
    /// Observations retained for retraining
    pub observation_capacity: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefilter_threshold: DEFAULT_PREFILTER_THRESHOLD,
            stamp_missing_time: true,
            observation_capacity: DEFAULT_OBSERVATION_CAPACITY,
        }
    }
}

impl EstimatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_prefilter_threshold(mut self, threshold: f64) -> Self {
        self.prefilter_threshold = threshold;
        self
    }

    pub fn with_stamp_missing_time(mut self, stamp: bool) -> Self {
        self.stamp_missing_time = stamp;
        self
    }

    pub fn with_observation_capacity(mut self, capacity: usize) -> Self {
        self.observation_capacity = capacity;
        self
    }
}

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    Model,
    Fallback,
}

/// How a vector search applies its filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    /// Filter first, then search the surviving documents
    PreFilter,
    /// Search first, then drop results that fail the filter
    PostFilter,
}

impl FilterStrategy {
    /// The strategy that should have been used, given what was observed.
    ///
    /// Measured latencies decide when both are known, ties going to
    /// post-filtering. Otherwise very selective filters favour pre-filtering.
    pub fn optimal(
        actual_selectivity: f64,
        prefilter_latency: Option<Duration>,
        postfilter_latency: Option<Duration>,
    ) -> Self {
        match (prefilter_latency, postfilter_latency) {
            (Some(pre), Some(post)) if pre < post => Self::PreFilter,
            (Some(_), Some(_)) => Self::PostFilter,
            _ if actual_selectivity < PREFILTER_LABEL_THRESHOLD => Self::PreFilter,
            _ => Self::PostFilter,
        }
    }
}

impl fmt::Display for FilterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreFilter => write!(f, "pre_filter"),
            Self::PostFilter => write!(f, "post_filter"),
        }
    }
}

/// A cardinality estimate and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityEstimate {
    pub cardinality: u64,
    pub source: EstimateSource,
}

/// A selectivity estimate with the strategy it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectivityPrediction {
    /// Fraction of the corpus expected to pass, in `(0, 1]`
    pub selectivity: f64,
    pub confidence: f64,
    pub source: EstimateSource,
    pub strategy: FilterStrategy,
}

/// Serves estimates from the active model, falling back to heuristics.
pub struct Estimator {
    config: EstimatorConfig,
    model: RwLock<Option<Arc<TrainedModel>>>,
    cardinality_features: CardinalityFeatureExtractor,
    selectivity_features: SelectivityFeatureExtractor,
    history: RwLock<PropertyHistory>,
    observations: ObservationBuffer,
}

impl fmt::Debug for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Estimator")
            .field("config", &self.config)
            .field("has_model", &self.has_model())
            .field("observations", &self.observations.len())
            .finish()
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl Estimator {
    /// An estimator with no model; every estimate uses the fallback.
    pub fn new(config: EstimatorConfig) -> Self {
        let observations = ObservationBuffer::new(config.observation_capacity);
        Self {
            config,
            model: RwLock::new(None),
            cardinality_features: CardinalityFeatureExtractor::new(),
            selectivity_features: SelectivityFeatureExtractor::new(),
            history: RwLock::new(PropertyHistory::new()),
            observations,
        }
    }

    /// An estimator serving `model`.
    pub fn with_model(config: EstimatorConfig, model: TrainedModel) -> Result<Self> {
        let estimator = Self::new(config);
        estimator.swap_model(model)?;
        Ok(estimator)
    }

    /// An estimator serving the model persisted at `path`.
    pub fn open(config: EstimatorConfig, path: &Path) -> Result<Self> {
        let estimator = Self::new(config);
        estimator.load_model(path)?;
        Ok(estimator)
    }

    /// Like [`open`](Self::open), but start in fallback mode if the model
    /// cannot be loaded.
    pub fn open_or_fallback(config: EstimatorConfig, path: &Path) -> Self {
        let estimator = Self::new(config);
        if let Err(e) = estimator.load_model(path) {
            warn!(error = %e, "No usable model, serving heuristic estimates");
        }
        estimator
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Load a model from `path` and make it active.
    ///
    /// The active model is untouched if loading fails.
    pub fn load_model(&self, path: &Path) -> Result<()> {
        let model = TrainedModel::load(path)?;
        info!(
            path = %path.display(),
            target = %model.target(),
            samples = model.training_samples(),
            "Loaded model"
        );
        self.swap_model(model)?;
        Ok(())
    }

    /// Make `model` active, returning the one it replaced.
    pub fn swap_model(&self, model: TrainedModel) -> Result<Option<Arc<TrainedModel>>> {
        if !model.is_trained() {
            return Err(EstimatorError::ModelNotTrained);
        }
        let model = Arc::new(model);
        Ok(self.model.write().replace(model))
    }

    /// Drop the active model, reverting to heuristic estimates.
    pub fn unload_model(&self) -> Option<Arc<TrainedModel>> {
        self.model.write().take()
    }

    pub fn active_model(&self) -> Option<Arc<TrainedModel>> {
        self.model.read().clone()
    }

    pub fn has_model(&self) -> bool {
        self.model.read().is_some()
    }

    fn model_for(&self, target: TargetKind) -> Option<Arc<TrainedModel>> {
        self.active_model().filter(|model| model.target() == target)
    }

    /// The cardinality extractor, e.g. to populate its correlation cache.
    pub fn cardinality_features(&self) -> &CardinalityFeatureExtractor {
        &self.cardinality_features
    }

    /// Estimated result cardinality of `query`, always at least 1.
    pub fn estimate(&self, query: &Query) -> u64 {
        self.estimate_cardinality(query).cardinality
    }

    /// Estimated result cardinality with its provenance.
    pub fn estimate_cardinality(&self, query: &Query) -> CardinalityEstimate {
        if let Some(model) = self.model_for(TargetKind::Cardinality) {
            let features = if self.config.stamp_missing_time && query.timestamp.is_none() {
                let stamped = query.clone().with_timestamp(Utc::now());
                self.cardinality_features.extract(&stamped)
            } else {
                self.cardinality_features.extract(query)
            };
            match model.predict(&features) {
                Ok(estimate) => {
                    let cardinality = (estimate as u64).max(1);
                    debug!(cardinality, "Model estimate");
                    return CardinalityEstimate {
                        cardinality,
                        source: EstimateSource::Model,
                    };
                }
                Err(e) => warn!(error = %e, "Model prediction failed, using fallback"),
            }
        }
        CardinalityEstimate {
            cardinality: fallback_cardinality(query),
            source: EstimateSource::Fallback,
        }
    }

    /// Features for a vector-search filter about to run now.
    ///
    /// Historical fields come from recorded executions on the same property.
    pub fn filter_features(
        &self,
        filter: Option<&FilterClause>,
        query_vector: &[f32],
        corpus_size: u64,
    ) -> FilterQueryFeatures {
        let mut features = features_for_filter(filter, query_vector, corpus_size, Utc::now());
        self.history.read().fill(&mut features);
        features
    }

    /// Estimated selectivity of a vector-search filter.
    ///
    /// Historical fields left at zero are filled from observed history first.
    pub fn estimate_selectivity(&self, features: &FilterQueryFeatures) -> SelectivityPrediction {
        let mut features = features.clone();
        self.history.read().fill(&mut features);

        let (selectivity, confidence, source) = match self.predict_selectivity(&features) {
            Some(prediction) => prediction,
            None => (
                fallback_selectivity(&features),
                FALLBACK_CONFIDENCE,
                EstimateSource::Fallback,
            ),
        };
        let strategy = if selectivity < self.config.prefilter_threshold {
            FilterStrategy::PreFilter
        } else {
            FilterStrategy::PostFilter
        };
        debug!(
            property = %features.property_name,
            selectivity,
            %strategy,
            "Selectivity estimate"
        );
        SelectivityPrediction {
            selectivity,
            confidence,
            source,
            strategy,
        }
    }

    fn predict_selectivity(
        &self,
        features: &FilterQueryFeatures,
    ) -> Option<(f64, f64, EstimateSource)> {
        let model = self.model_for(TargetKind::Selectivity)?;
        let vector = self.selectivity_features.extract_features(features);
        match model.predict(&vector) {
            Ok(selectivity) => {
                let confidence = model
                    .metrics()
                    .map_or(FALLBACK_CONFIDENCE, |metrics| metrics.confidence());
                Some((selectivity, confidence, EstimateSource::Model))
            }
            Err(e) => {
                warn!(error = %e, "Model prediction failed, using fallback");
                None
            }
        }
    }

    /// Whether the filter should be applied before the vector search.
    ///
    /// Always `false` when learned strategy selection is disabled.
    pub fn should_use_prefilter(&self, features: &FilterQueryFeatures) -> bool {
        self.config.enabled
            && self.estimate_selectivity(features).strategy == FilterStrategy::PreFilter
    }

    /// Record the observed cardinality of an executed query for retraining.
    ///
    /// The active model is never modified.
    pub fn update_online(&self, query: &Query, actual_cardinality: f64) {
        if let Err(message) = TargetKind::Cardinality.validate_outcome(actual_cardinality) {
            warn!(%message, "Ignoring observation");
            return;
        }
        let mut query = query.clone();
        if query.timestamp.is_none() {
            query.timestamp = Some(Utc::now());
        }
        self.observations
            .push(QueryExecutionRecord::with_cardinality(query, actual_cardinality));
    }

    /// Record the observed selectivity of an executed filter.
    ///
    /// Updates the property history and buffers the observation for
    /// retraining.
    pub fn record_selectivity(
        &self,
        features: &FilterQueryFeatures,
        actual_selectivity: f64,
        cardinality: u64,
    ) {
        self.record_filter_execution(features, actual_selectivity, cardinality, None, None);
    }

    /// Like [`record_selectivity`](Self::record_selectivity), labelling the
    /// observation with the strategy the measured latencies favour.
    pub fn record_filter_execution(
        &self,
        features: &FilterQueryFeatures,
        actual_selectivity: f64,
        cardinality: u64,
        prefilter_latency: Option<Duration>,
        postfilter_latency: Option<Duration>,
    ) {
        if let Err(message) = TargetKind::Selectivity.validate_outcome(actual_selectivity) {
            warn!(%message, "Ignoring observation");
            return;
        }
        self.history
            .write()
            .observe(&features.property_name, actual_selectivity, cardinality);

        let strategy =
            FilterStrategy::optimal(actual_selectivity, prefilter_latency, postfilter_latency);
        let mut record =
            QueryExecutionRecord::with_selectivity(features.clone(), actual_selectivity)
                .with_optimal_strategy(strategy);
        record.query.timestamp = Some(Utc::now());
        self.observations.push(record);
    }

    /// History of a property, if any filter on it was recorded.
    pub fn property_stats(&self, property: &str) -> Option<PropertyStats> {
        self.history.read().get(property).cloned()
    }

    /// Observations buffered for the next training run.
    pub fn observations(&self) -> &ObservationBuffer {
        &self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureSchema, CARDINALITY_FEATURES};
    use crate::model::BoostingConfig;
    use crate::workload::{Filter, TableStats};
    use std::thread;
    use tempfile::TempDir;

    fn query(filters: usize, row_count: u64) -> Query {
        (0..filters).fold(
            Query::new().with_table_stats(TableStats::new(row_count, 100)),
            |q, i| q.with_filter(Filter::new(format!("c{i}"), "=", i)),
        )
    }

    fn cardinality_model(scale: f64) -> TrainedModel {
        let extractor = CardinalityFeatureExtractor::new();
        let schema =
            FeatureSchema::new(CARDINALITY_FEATURES.iter().map(|s| s.to_string()).collect())
                .unwrap();
        let queries: Vec<Query> = (0..80).map(|i| query(i % 4, 10_000)).collect();
        let rows: Vec<Vec<f64>> = queries
            .iter()
            .map(|q| schema.align(&extractor.extract(q)))
            .collect();
        let observed: Vec<f64> = queries
            .iter()
            .map(|q| scale * (q.filters.len() + 1) as f64)
            .collect();
        TrainedModel::fit(
            TargetKind::Cardinality,
            BoostingConfig::default().with_n_estimators(50),
            schema,
            &rows,
            &observed,
        )
        .unwrap()
    }

    fn selectivity_model() -> TrainedModel {
        let extractor = SelectivityFeatureExtractor::new();
        let schema = FeatureSchema::new(vec![
            "corpus_size".into(),
            "property_rare".into(),
            "property_common".into(),
        ])
        .unwrap();
        let mut rows = Vec::new();
        let mut observed = Vec::new();
        for i in 0..40 {
            let (property, selectivity) = if i % 2 == 0 { ("rare", 0.01) } else { ("common", 0.6) };
            let mut features = FilterQueryFeatures::new(property, "Equal");
            features.corpus_size = 10_000;
            rows.push(schema.align(&extractor.extract_features(&features)));
            observed.push(selectivity);
        }
        TrainedModel::fit(
            TargetKind::Selectivity,
            BoostingConfig::default(),
            schema,
            &rows,
            &observed,
        )
        .unwrap()
    }

    #[test]
    fn test_fallback_without_model() {
        let estimator = Estimator::default();
        let estimate = estimator.estimate_cardinality(&query(2, 10_000));
        assert_eq!(estimate.cardinality, 2500);
        assert_eq!(estimate.source, EstimateSource::Fallback);
        assert_eq!(estimator.estimate(&Query::new()), 1000);
    }

    #[test]
    fn test_estimate_never_below_one() {
        let estimator = Estimator::default();
        assert_eq!(estimator.estimate(&query(0, 0)), 1);
        assert_eq!(estimator.estimate(&query(40, 100)), 1);
    }

    #[test]
    fn test_model_estimate() {
        let estimator =
            Estimator::with_model(EstimatorConfig::default(), cardinality_model(1000.0)).unwrap();
        let estimate = estimator.estimate_cardinality(&query(2, 10_000));
        assert_eq!(estimate.source, EstimateSource::Model);
        assert!((estimate.cardinality as f64 - 3000.0).abs() < 300.0);
    }

    #[test]
    fn test_selectivity_model_not_used_for_cardinality() {
        let estimator =
            Estimator::with_model(EstimatorConfig::default(), selectivity_model()).unwrap();
        let estimate = estimator.estimate_cardinality(&query(2, 10_000));
        assert_eq!(estimate.source, EstimateSource::Fallback);
        assert_eq!(estimate.cardinality, 2500);
    }

    #[test]
    fn test_swap_rejects_untrained_model() {
        let estimator =
            Estimator::with_model(EstimatorConfig::default(), cardinality_model(1000.0)).unwrap();
        let untrained = TrainedModel::untrained(TargetKind::Cardinality, BoostingConfig::default());
        assert!(matches!(
            estimator.swap_model(untrained),
            Err(EstimatorError::ModelNotTrained)
        ));
        assert!(estimator.has_model());
    }

    #[test]
    fn test_swap_and_unload() {
        let estimator = Estimator::default();
        assert!(estimator.swap_model(cardinality_model(1000.0)).unwrap().is_none());
        let before = estimator.estimate(&query(1, 10_000));

        let previous = estimator.swap_model(cardinality_model(2000.0)).unwrap();
        assert!(previous.is_some());
        let after = estimator.estimate(&query(1, 10_000));
        assert!(after > before);

        assert!(estimator.unload_model().is_some());
        assert_eq!(estimator.estimate(&query(1, 10_000)), 5000);
    }

    #[test]
    fn test_concurrent_estimates_during_swaps() {
        let estimator = Arc::new(
            Estimator::with_model(EstimatorConfig::default(), cardinality_model(1000.0)).unwrap(),
        );
        let replacement = cardinality_model(2000.0);

        thread::scope(|scope| {
            for _ in 0..4 {
                let estimator = Arc::clone(&estimator);
                scope.spawn(move || {
                    for filters in 0..200 {
                        let estimate = estimator.estimate(&query(filters % 4, 10_000));
                        assert!(estimate >= 1);
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..20 {
                    if i % 2 == 0 {
                        estimator.swap_model(replacement.clone()).unwrap();
                    } else {
                        estimator.unload_model();
                    }
                }
            });
        });
    }

    #[test]
    fn test_load_model_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        cardinality_model(1000.0).save(&path).unwrap();

        let estimator = Estimator::open(EstimatorConfig::default(), &path).unwrap();
        assert!(estimator.has_model());

        let missing = dir.path().join("missing.json");
        assert!(Estimator::open(EstimatorConfig::default(), &missing).is_err());
        assert!(!Estimator::open_or_fallback(EstimatorConfig::default(), &missing).has_model());
        assert!(estimator.load_model(&missing).is_err());
        assert!(estimator.has_model());
    }

    #[test]
    fn test_selectivity_fallback_and_strategy() {
        let estimator = Estimator::default();
        let mut features = FilterQueryFeatures::new("color", "Equal");
        let prediction = estimator.estimate_selectivity(&features);
        assert_eq!(prediction.selectivity, 0.5);
        assert_eq!(prediction.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(prediction.strategy, FilterStrategy::PostFilter);

        features.property_cardinality = 5;
        features.corpus_size = 1000;
        assert!(estimator.should_use_prefilter(&features));

        let disabled = Estimator::new(EstimatorConfig::default().with_enabled(false));
        assert!(!disabled.should_use_prefilter(&features));
    }

    #[test]
    fn test_selectivity_model_prediction() {
        let estimator =
            Estimator::with_model(EstimatorConfig::default(), selectivity_model()).unwrap();
        let mut rare = FilterQueryFeatures::new("rare", "Equal");
        rare.corpus_size = 10_000;
        let prediction = estimator.estimate_selectivity(&rare);
        assert_eq!(prediction.source, EstimateSource::Model);
        assert!(prediction.selectivity > 0.0 && prediction.selectivity < 0.08);
        assert_eq!(prediction.strategy, FilterStrategy::PreFilter);

        let unseen = FilterQueryFeatures::new("never_seen", "Contains");
        let prediction = estimator.estimate_selectivity(&unseen);
        assert!(prediction.selectivity >= 0.001 && prediction.selectivity <= 1.0);
    }

    #[test]
    fn test_record_selectivity_feeds_history() {
        let estimator = Estimator::default();
        let features = FilterQueryFeatures::new("color", "Equal");
        for selectivity in [0.02, 0.03, 0.04] {
            estimator.record_selectivity(&features, selectivity, 12);
        }
        let stats = estimator.property_stats("color").unwrap();
        assert_eq!(stats.total_queries, 3);

        let prediction = estimator.estimate_selectivity(&features);
        assert_eq!(prediction.selectivity, 0.03);
        assert_eq!(prediction.strategy, FilterStrategy::PreFilter);
        assert_eq!(estimator.observations().len(), 3);
        let labels: Vec<_> = estimator
            .observations()
            .snapshot()
            .iter()
            .map(|record| record.optimal_strategy)
            .collect();
        assert_eq!(labels, vec![Some(FilterStrategy::PreFilter); 3]);
    }

    #[test]
    fn test_record_filter_execution_labels_with_latencies() {
        let estimator = Estimator::default();
        let features = FilterQueryFeatures::new("color", "Equal");
        estimator.record_filter_execution(
            &features,
            0.02,
            12,
            Some(Duration::from_millis(40)),
            Some(Duration::from_millis(10)),
        );
        estimator.record_filter_execution(&features, 0.6, 12, None, None);
        estimator.record_filter_execution(&features, 1.7, 12, None, None);

        let records = estimator.observations().snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].optimal_strategy, Some(FilterStrategy::PostFilter));
        assert_eq!(records[1].optimal_strategy, Some(FilterStrategy::PostFilter));
        assert_eq!(estimator.property_stats("color").unwrap().total_queries, 2);
    }

    #[test]
    fn test_filter_features_from_clause_and_history() {
        let estimator = Estimator::default();
        estimator.record_selectivity(&FilterQueryFeatures::new("color", "Equal"), 0.04, 9);

        let clause = FilterClause::leaf("color", "Equal");
        let features = estimator.filter_features(Some(&clause), &[3.0, 4.0], 2_000);
        assert_eq!(features.property_name, "color");
        assert_eq!(features.vector_dimensions, 2);
        assert_eq!(features.query_vector_norm, 5.0);
        assert_eq!(features.corpus_size, 2_000);
        assert_eq!(features.property_cardinality, 9);
        assert_eq!(features.historical_selectivity_p50, 0.04);

        let unfiltered = estimator.filter_features(None, &[], 2_000);
        assert_eq!(unfiltered.property_name, crate::workload::UNKNOWN_CATEGORY);
        assert_eq!(unfiltered.historical_selectivity_p50, 0.0);
    }

    #[test]
    fn test_update_online_buffers_without_touching_model() {
        let estimator =
            Estimator::with_model(EstimatorConfig::default(), cardinality_model(1000.0)).unwrap();
        let model = estimator.active_model().unwrap();

        estimator.update_online(&query(1, 10_000), 4200.0);
        estimator.update_online(&query(1, 10_000), -1.0);

        assert_eq!(estimator.observations().len(), 1);
        let record = &estimator.observations().snapshot()[0];
        assert_eq!(record.actual_cardinality, Some(4200.0));
        assert!(record.timestamp().is_some());
        assert!(Arc::ptr_eq(&model, &estimator.active_model().unwrap()));
    }

    #[test]
    fn test_optimal_strategy_labels() {
        let fast = Some(Duration::from_millis(5));
        let slow = Some(Duration::from_millis(50));
        assert_eq!(FilterStrategy::optimal(0.9, fast, slow), FilterStrategy::PreFilter);
        assert_eq!(FilterStrategy::optimal(0.01, slow, fast), FilterStrategy::PostFilter);
        assert_eq!(FilterStrategy::optimal(0.01, fast, fast), FilterStrategy::PostFilter);
        assert_eq!(FilterStrategy::optimal(0.05, None, slow), FilterStrategy::PreFilter);
        assert_eq!(FilterStrategy::optimal(0.5, None, None), FilterStrategy::PostFilter);
        assert_eq!(FilterStrategy::PreFilter.to_string(), "pre_filter");
    }

    #[test]
    fn test_estimator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Estimator>();
    }
}
