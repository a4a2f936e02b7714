//! Model Lifecycle
//!
//! A [`TrainedModel`] bundles everything needed to serve predictions: the
//! fitted ensemble, the feature schema it was fitted on, the target kind and
//! the hyperparameters and held-out metrics it was produced with. It is
//! persisted as a single self-contained JSON artifact.

mod gbdt;
mod metrics;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, Result};
use crate::features::{FeatureSchema, FeatureVector};
use crate::target::TargetKind;

pub use gbdt::{BoostingConfig, GradientBoostedTrees, RegressionTree, TreeNode};
pub use metrics::{rank_importance, EvaluationMetrics, FeatureImportance};

/// Artifact format written by this version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A regression model with the schema and metadata needed to serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    format_version: u32,
    target: TargetKind,
    schema: Option<FeatureSchema>,
    booster: Option<GradientBoostedTrees>,
    #[serde(default)]
    trained: bool,
    #[serde(default)]
    config: BoostingConfig,
    #[serde(default)]
    metrics: Option<EvaluationMetrics>,
    #[serde(default)]
    training_samples: usize,
    #[serde(default)]
    trained_at: Option<DateTime<Utc>>,
}

impl TrainedModel {
    /// A model that has not been fitted. It cannot predict or be saved.
    pub fn untrained(target: TargetKind, config: BoostingConfig) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            target,
            schema: None,
            booster: None,
            trained: false,
            config,
            metrics: None,
            training_samples: 0,
            trained_at: None,
        }
    }

    /// Fit a model on aligned `rows` and observed outcomes.
    ///
    /// Outcomes are mapped into the target's regression space before fitting.
    pub fn fit(
        target: TargetKind,
        config: BoostingConfig,
        schema: FeatureSchema,
        rows: &[Vec<f64>],
        observed: &[f64],
    ) -> Result<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != schema.len()) {
            return Err(EstimatorError::invalid_argument(format!(
                "row has {} columns, schema has {}",
                row.len(),
                schema.len()
            )));
        }
        let targets: Vec<f64> = observed
            .iter()
            .map(|&value| target.transform_target(value))
            .collect();
        let booster = GradientBoostedTrees::fit(&config, rows, &targets)?;

        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            target,
            schema: Some(schema),
            booster: Some(booster),
            trained: true,
            config,
            metrics: None,
            training_samples: rows.len(),
            trained_at: Some(Utc::now()),
        })
    }

    /// Attach held-out metrics.
    pub fn with_metrics(mut self, metrics: EvaluationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_trained(&self) -> bool {
        self.trained && self.booster.is_some() && self.schema.is_some()
    }

    pub fn target(&self) -> TargetKind {
        self.target
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&EvaluationMetrics> {
        self.metrics.as_ref()
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    fn fitted(&self) -> Result<(&FeatureSchema, &GradientBoostedTrees)> {
        match (&self.schema, &self.booster) {
            (Some(schema), Some(booster)) if self.trained => Ok((schema, booster)),
            _ => Err(EstimatorError::ModelNotTrained),
        }
    }

    /// Unclamped score in regression space for an aligned row.
    pub fn predict_raw(&self, row: &[f64]) -> Result<f64> {
        let (_, booster) = self.fitted()?;
        Ok(booster.predict(row))
    }

    /// Clamped estimate for an aligned row.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let raw = self.predict_raw(row)?;
        self.target
            .finish(raw)
            .ok_or_else(|| EstimatorError::invalid_argument("model produced a NaN score"))
    }

    /// Clamped estimate for a feature vector, aligned to the model's schema.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let (schema, _) = self.fitted()?;
        self.predict_row(&schema.align(features))
    }

    /// Metrics on aligned rows, computed in regression space.
    pub fn evaluate(&self, rows: &[Vec<f64>], observed: &[f64]) -> Result<EvaluationMetrics> {
        let (_, booster) = self.fitted()?;
        let predictions: Vec<f64> = rows.iter().map(|row| booster.predict(row)).collect();
        let targets: Vec<f64> = observed
            .iter()
            .map(|&value| self.target.transform_target(value))
            .collect();
        Ok(EvaluationMetrics::compute(&predictions, &targets))
    }

    /// Features ranked by normalised split gain.
    pub fn feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let (schema, booster) = self.fitted()?;
        Ok(rank_importance(schema.names(), &booster.feature_importances()))
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| EstimatorError::serialization(format!("Failed to serialize model: {e}")))
    }

    /// Deserialize from JSON bytes and check the artifact is servable.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(data).map_err(|e| {
            EstimatorError::serialization(format!("Failed to deserialize model: {e}"))
        })?;
        model.validate().map_err(EstimatorError::serialization)?;
        Ok(model)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {}, expected {MODEL_FORMAT_VERSION}",
                self.format_version
            ));
        }
        if !self.trained {
            return Err("model is not trained".to_string());
        }
        let schema = self.schema.as_ref().ok_or("missing feature schema")?;
        let booster = self.booster.as_ref().ok_or("missing trees")?;
        if booster.num_features() != schema.len() {
            return Err(format!(
                "trees expect {} features, schema has {}",
                booster.num_features(),
                schema.len()
            ));
        }
        booster.validate()
    }

    /// Write the artifact to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.is_trained() {
            return Err(EstimatorError::ModelNotTrained);
        }
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(path);
        fs::write(&staging, json)?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read and validate an artifact written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| EstimatorError::model_load(path, e.to_string()))?;
        Self::from_json(&data).map_err(|e| match e {
            EstimatorError::Serialization { message } => EstimatorError::model_load(path, message),
            other => other,
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
