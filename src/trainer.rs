//! Offline training pipeline.
//!
//! Reads an execution log, extracts features, holds out a deterministic test
//! split, fits a [`TrainedModel`], evaluates it and persists the artifact.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EstimatorError, Result};
use crate::features::{extractor_for, FeatureSchema, FeatureVector, SchemaBuilder};
use crate::model::{BoostingConfig, EvaluationMetrics, FeatureImportance, TrainedModel};
use crate::target::TargetKind;
use crate::workload::{QueryExecutionRecord, RecordReader};

/// Fewest samples that can be split into a train and a test set.
const MIN_SPLITTABLE_SAMPLES: usize = 2;

/// Configuration for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// What the model predicts
    pub target: TargetKind,
    /// Minimum valid records required to train
    pub min_samples: usize,
    /// Fraction of records held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test shuffle
    pub split_seed: u64,
    pub boosting: BoostingConfig,
    /// Held-out MAE a selectivity model is expected to beat
    pub selectivity_mae_target: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target: TargetKind::Selectivity,
            min_samples: 1000,
            test_fraction: 0.2,
            split_seed: 42,
            boosting: BoostingConfig::default(),
            selectivity_mae_target: 0.05,
        }
    }
}

impl TrainerConfig {
    pub fn new(target: TargetKind) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Seed both the train/test split and the booster's sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self.boosting.seed = seed;
        self
    }

    pub fn with_boosting(mut self, boosting: BoostingConfig) -> Self {
        self.boosting = boosting;
        self
    }

    pub fn with_selectivity_mae_target(mut self, mae: f64) -> Self {
        self.selectivity_mae_target = mae;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(EstimatorError::invalid_argument(format!(
                "test fraction must be within (0, 1), got {}",
                self.test_fraction
            )));
        }
        self.boosting.validate()
    }

    /// Valid records needed before training starts.
    pub fn required_samples(&self) -> usize {
        self.min_samples.max(MIN_SPLITTABLE_SAMPLES)
    }
}

/// Aligned feature matrix with its observed outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Shuffle with `seed` and hold out `ceil(n × test_fraction)` rows.
    ///
    /// Both halves keep at least one row when the dataset has two or more.
    pub fn split(&self, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
        let n = self.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let test_n = match n {
            0 | 1 => 0,
            _ => ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1),
        };
        let (test, train) = order.split_at(test_n);
        (self.subset(train), self.subset(test))
    }
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target: TargetKind,
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub metrics: EvaluationMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    /// Where the model was written, if it was persisted
    pub model_path: Option<PathBuf>,
    /// Whether the held-out MAE beat the advisory target; `None` when no
    /// target applies
    pub meets_accuracy_target: Option<bool>,
}

/// Runs the offline pipeline.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train from the JSONL log at `log_path` and write the model to `output`.
    ///
    /// Nothing is written unless training succeeds.
    pub fn train_from_log(&self, log_path: &Path, output: &Path) -> Result<TrainingReport> {
        self.config.validate()?;
        info!(path = %log_path.display(), target = %self.config.target, "Loading execution log");
        let loaded = RecordReader::new(self.config.target).read_path(log_path)?;
        info!(
            records = loaded.len(),
            skipped = loaded.skipped,
            "Loaded training records"
        );

        let (model, mut report) = self.train_records(&loaded.records)?;
        report.records_skipped += loaded.skipped;

        model.save(output)?;
        info!(path = %output.display(), "Model saved");
        report.model_path = Some(output.to_path_buf());
        Ok(report)
    }

    /// Train on in-memory records. Records without a valid outcome are skipped.
    pub fn train_records(
        &self,
        records: &[QueryExecutionRecord],
    ) -> Result<(TrainedModel, TrainingReport)> {
        self.config.validate()?;
        let target = self.config.target;

        let mut usable = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for record in records {
            match record.outcome(target) {
                Ok(outcome) => usable.push((record, outcome)),
                Err(message) => {
                    warn!(%message, "Skipping record without a usable outcome");
                    skipped += 1;
                }
            }
        }

        let required = self.config.required_samples();
        if usable.len() < required {
            return Err(EstimatorError::insufficient_data(usable.len(), required));
        }

        let dataset = self.build_dataset(&usable)?;
        let (train, test) = dataset.split(self.config.test_fraction, self.config.split_seed);
        info!(
            features = dataset.schema.len(),
            train = train.len(),
            test = test.len(),
            "Fitting model"
        );

        let model = TrainedModel::fit(
            target,
            self.config.boosting.clone(),
            dataset.schema.clone(),
            &train.rows,
            &train.targets,
        )?;
        let metrics = model.evaluate(&test.rows, &test.targets)?;
        let feature_importance = model.feature_importance()?;
        let model = model.with_metrics(metrics);
        info!(
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "Evaluated on held-out set"
        );

        let meets_accuracy_target = match target {
            TargetKind::Selectivity => {
                let met = metrics.mae < self.config.selectivity_mae_target;
                if !met {
                    warn!(
                        mae = metrics.mae,
                        target = self.config.selectivity_mae_target,
                        "Held-out MAE misses the accuracy target"
                    );
                }
                Some(met)
            }
            TargetKind::Cardinality => None,
        };

        let report = TrainingReport {
            target,
            records_loaded: usable.len(),
            records_skipped: skipped,
            train_samples: train.len(),
            test_samples: test.len(),
            metrics,
            feature_importance,
            model_path: None,
            meets_accuracy_target,
        };
        Ok((model, report))
    }

    /// Extract and align features for records paired with their outcomes.
    pub fn build_dataset(&self, records: &[(&QueryExecutionRecord, f64)]) -> Result<Dataset> {
        let extractor = extractor_for(self.config.target);
        let vectors: Vec<FeatureVector> = records
            .iter()
            .map(|(record, _)| extractor.extract(&record.query))
            .collect();

        let mut builder = SchemaBuilder::with_base(extractor.base_features());
        for vector in &vectors {
            builder.observe(vector);
        }
        let schema = builder.build()?;

        Ok(Dataset {
            rows: schema.align_all(&vectors),
            targets: records.iter().map(|(_, outcome)| *outcome).collect(),
            schema,
        })
    }
}
