//! Cardinal - Learned Cardinality and Selectivity Estimation
//!
//! Cardinal estimates how many rows a query returns, or what fraction of a
//! corpus survives a vector-search filter, so a planner can pick join orders
//! and filter strategies without running the query. Estimates come from a
//! gradient-boosted regression model trained on historical execution logs,
//! with deterministic heuristics whenever no model is available.
//!
//! # Features
//!
//! - **Feature Extraction**: Structural, statistical and temporal query features
//! - **Gradient Boosting**: Deterministic regression trees fitted in log space
//! - **Schema Alignment**: Inference tolerates unseen and missing features
//! - **Safe Fallback**: Estimation never fails and never returns zero rows
//! - **Hot Swapping**: Models are replaced atomically under live traffic
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cardinal::{Estimator, EstimatorConfig, Filter, Query, TableStats};
//!
//! let estimator = Estimator::open_or_fallback(
//!     EstimatorConfig::default(),
//!     Path::new("cardinality_model.json"),
//! );
//!
//! let query = Query::new()
//!     .with_filter(Filter::new("city", "=", "NYC"))
//!     .with_filter(Filter::new("age", ">", 25))
//!     .with_table_stats(TableStats::new(10_000, 5_000));
//!
//! let rows = estimator.estimate(&query);
//! assert!(rows >= 1);
//! ```
//!
//! # Training
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cardinal::{Result, TargetKind, Trainer, TrainerConfig};
//!
//! fn main() -> Result<()> {
//!     let trainer = Trainer::new(TrainerConfig::new(TargetKind::Cardinality));
//!     let report = trainer.train_from_log(
//!         Path::new("query_log.jsonl"),
//!         Path::new("cardinality_model.json"),
//!     )?;
//!
//!     println!("held-out MAE: {:.4}", report.metrics.mae);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod estimator;
pub mod features;
pub mod model;
pub mod target;
pub mod trainer;
pub mod workload;

pub use error::{EstimatorError, Result};
pub use estimator::{
    CardinalityEstimate, EstimateSource, Estimator, EstimatorConfig, FilterStrategy,
    SelectivityPrediction,
};
pub use features::{FeatureSchema, FeatureVector};
pub use model::{BoostingConfig, EvaluationMetrics, FeatureImportance, TrainedModel};
pub use target::TargetKind;
pub use trainer::{Trainer, TrainerConfig, TrainingReport};
pub use workload::{Filter, FilterQueryFeatures, Query, QueryExecutionRecord, TableStats};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::error::{EstimatorError, Result};
    pub use crate::estimator::{Estimator, EstimatorConfig, FilterStrategy};
    pub use crate::model::{BoostingConfig, TrainedModel};
    pub use crate::target::TargetKind;
    pub use crate::trainer::{Trainer, TrainerConfig};
    pub use crate::workload::{Filter, FilterQueryFeatures, Query, TableStats};
}
