//! Gradient-boosted regression trees.
//!
//! Squared-error boosting over depth-limited binary trees. Each round fits a
//! tree to the current residuals on a row and column subsample, with L2
//! regularised leaf values scaled by the learning rate. Split search runs in
//! parallel across candidate features and reduces deterministically, so the
//! same data and configuration always produce the same ensemble.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, Result};

/// Splits that improve the objective by less than this are not taken.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Hyperparameters for [`GradientBoostedTrees::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf
    pub learning_rate: f64,
    /// Fraction of rows sampled per round
    pub subsample: f64,
    /// Fraction of features sampled per round
    pub colsample: f64,
    /// L2 regularisation on leaf values
    pub lambda: f64,
    /// Minimum rows on each side of a split
    pub min_samples_leaf: usize,
    /// Seed for row and column sampling
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            n_estimators: 100,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample: 0.8,
            lambda: 1.0,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl BoostingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_colsample(mut self, colsample: f64) -> Self {
        self.colsample = colsample;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every hyperparameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(EstimatorError::invalid_argument("max_depth must be at least 1"));
        }
        if self.n_estimators == 0 {
            return Err(EstimatorError::invalid_argument(
                "n_estimators must be at least 1",
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(EstimatorError::invalid_argument(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, fraction) in [("subsample", self.subsample), ("colsample", self.colsample)] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(EstimatorError::invalid_argument(format!(
                    "{name} must be within (0, 1], got {fraction}"
                )));
            }
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(EstimatorError::invalid_argument(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(EstimatorError::invalid_argument(
                "min_samples_leaf must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A node of a regression tree. Children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `row[feature] < threshold` go left, everything else right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A binary regression tree stored as a flat node list rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    index = if value < *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }

    /// Check the tree is well-formed for rows of `num_features` columns.
    pub fn validate(&self, num_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= num_features {
                        return Err(format!(
                            "node {index} splits on feature {feature}, model has {num_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {index} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!(
                                "node {index} references invalid child {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {index} has non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Best split found for one node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl SplitCandidate {
    /// Higher gain wins; ties go to the lower feature index.
    fn better(self, other: Self) -> Self {
        if other.gain > self.gain || (other.gain == self.gain && other.feature < self.feature) {
            other
        } else {
            self
        }
    }
}

/// Grows one tree over the residuals of a row subsample.
struct TreeBuilder<'a> {
    config: &'a BoostingConfig,
    rows: &'a [Vec<f64>],
    residuals: &'a [f64],
    features: &'a [usize],
    nodes: Vec<TreeNode>,
    gains: Vec<(usize, f64)>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let sum: f64 = indices.iter().map(|&i| self.residuals[i]).sum();
        let value = self.config.learning_rate * sum / (indices.len() as f64 + self.config.lambda);
        self.nodes.push(TreeNode::Leaf { value });

        if depth >= self.config.max_depth || indices.len() < 2 * self.config.min_samples_leaf {
            return id;
        }
        let Some(split) = find_best_split(
            self.config,
            self.rows,
            self.residuals,
            self.features,
            &indices,
            sum,
        ) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] < split.threshold);
        self.gains.push((split.feature, split.gain));
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

fn find_best_split(
    config: &BoostingConfig,
    rows: &[Vec<f64>],
    residuals: &[f64],
    features: &[usize],
    indices: &[usize],
    total: f64,
) -> Option<SplitCandidate> {
    features
        .par_iter()
        .filter_map(|&feature| best_split_on(config, rows, residuals, feature, indices, total))
        .reduce_with(SplitCandidate::better)
}

fn best_split_on(
    config: &BoostingConfig,
    rows: &[Vec<f64>],
    residuals: &[f64],
    feature: usize,
    indices: &[usize],
    total: f64,
) -> Option<SplitCandidate> {
    let mut points: Vec<(f64, f64)> = indices
        .iter()
        .map(|&i| (rows[i][feature], residuals[i]))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = points.len();
    let lambda = config.lambda;
    let parent_score = total * total / (n as f64 + lambda);
    let mut left_sum = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for position in 0..n.saturating_sub(1) {
        left_sum += points[position].1;
        let (current, next) = (points[position].0, points[position + 1].0);
        if current == next {
            continue;
        }
        let left_n = position + 1;
        let right_n = n - left_n;
        if left_n < config.min_samples_leaf || right_n < config.min_samples_leaf {
            continue;
        }
        let right_sum = total - left_sum;
        let gain = left_sum * left_sum / (left_n as f64 + lambda)
            + right_sum * right_sum / (right_n as f64 + lambda)
            - parent_score;
        if gain <= MIN_SPLIT_GAIN || best.is_some_and(|b| gain <= b.gain) {
            continue;
        }
        let midpoint = current + (next - current) / 2.0;
        let threshold = if midpoint > current { midpoint } else { next };
        best = Some(SplitCandidate {
            feature,
            threshold,
            gain,
        });
    }
    best
}

/// Draw `ceil(n × fraction)` distinct indices in ascending order.
fn sample_indices(rng: &mut StdRng, n: usize, fraction: f64) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let k = ((n as f64 * fraction).ceil() as usize).clamp(1, n);
    if k == n {
        return (0..n).collect();
    }
    let mut sample = rand::seq::index::sample(rng, n, k).into_vec();
    sample.sort_unstable();
    sample
}

/// An additive ensemble of regression trees over a constant base score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    num_features: usize,
    trees: Vec<RegressionTree>,
    /// Total split gain per feature, accumulated during fitting
    feature_gain: Vec<f64>,
}

impl GradientBoostedTrees {
    /// Fit an ensemble to `rows` (row-major, equal width) and `targets`.
    pub fn fit(config: &BoostingConfig, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        config.validate()?;
        if rows.is_empty() {
            return Err(EstimatorError::insufficient_data(0, 1));
        }
        if rows.len() != targets.len() {
            return Err(EstimatorError::invalid_argument(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let num_features = rows[0].len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != num_features {
                return Err(EstimatorError::invalid_argument(format!(
                    "row {i} has {} features, expected {num_features}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(EstimatorError::invalid_argument(format!(
                    "row {i} contains a non-finite feature value"
                )));
            }
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(EstimatorError::invalid_argument("targets must be finite"));
        }

        let n = rows.len();
        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut feature_gain = vec![0.0; num_features];
        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut rng = StdRng::seed_from_u64(config.seed);

        for _ in 0..config.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(target, prediction)| target - prediction)
                .collect();
            let sampled_rows = sample_indices(&mut rng, n, config.subsample);
            let features = sample_indices(&mut rng, num_features, config.colsample);

            let mut builder = TreeBuilder {
                config,
                rows,
                residuals: &residuals,
                features: &features,
                nodes: Vec::new(),
                gains: Vec::new(),
            };
            builder.grow(sampled_rows, 0);
            for (feature, gain) in builder.gains {
                feature_gain[feature] += gain;
            }
            let tree = RegressionTree {
                nodes: builder.nodes,
            };

            predictions
                .par_iter_mut()
                .zip(rows.par_iter())
                .for_each(|(prediction, row)| *prediction += tree.predict(row));
            trees.push(tree);
        }

        Ok(Self {
            base_score,
            num_features,
            trees,
            feature_gain,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Split gain per feature normalised to sum to 1, or all zeros when no
    /// split was ever taken.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.feature_gain.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.num_features];
        }
        self.feature_gain.iter().map(|gain| gain / total).collect()
    }

    /// Check structural integrity after deserialisation.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.base_score.is_finite() {
            return Err("base score is not finite".to_string());
        }
        if self.feature_gain.len() != self.num_features {
            return Err(format!(
                "feature gain has {} entries, model has {} features",
                self.feature_gain.len(),
                self.num_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.num_features)
                .map_err(|message| format!("tree {i}: {message}"))?;
        }
        Ok(())
    }
}
