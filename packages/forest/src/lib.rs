#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Random forest learners built on flat-array decision trees.
//!
//! Both ensembles grow CART-style trees on bootstrap resamples with optional
//! feature subsampling per split. Training is sequential and fully seeded:
//! the tree at index `i` draws from `StdRng::seed_from_u64(seed + i)`, so the
//! same data and configuration always grow the same forest.

pub mod tree;

mod grow;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grow::GrowParams;
use crate::tree::DecisionTree;

/// Errors returned by forest training and prediction.
#[derive(Debug, Error)]
pub enum ForestError {
    /// Training was attempted with no rows or no feature columns.
    #[error("training set is empty")]
    EmptyTrainingSet,
    /// Row and target slices disagree in length.
    #[error("length mismatch: {rows} rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },
    /// A row's width does not match the trained feature count.
    #[error("feature width mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The class weight table does not cover every label in the data.
    #[error("class weight table covers {weights} classes but labels need {classes}")]
    ClassWeights { classes: usize, weights: usize },
    /// A configuration field is out of range.
    #[error("invalid forest configuration: {message}")]
    InvalidConfig { message: &'static str },
}

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Every feature is a candidate at every split.
    All,
    /// `floor(sqrt(n_features))` features, resampled per split.
    Sqrt,
}

impl MaxFeatures {
    #[must_use]
    pub const fn count(self, n_features: usize) -> usize {
        match self {
            Self::All => n_features,
            Self::Sqrt => {
                let count = n_features.isqrt();
                if count == 0 { 1 } else { count }
            }
        }
    }
}

/// Hyperparameters shared by both forest kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::All,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// # Errors
    ///
    /// * `ForestError::InvalidConfig` when a field is outside its valid range
    pub const fn validate(&self) -> Result<(), ForestError> {
        if self.n_trees == 0 {
            return Err(ForestError::InvalidConfig {
                message: "n_trees must be at least 1",
            });
        }
        if self.max_depth == 0 {
            return Err(ForestError::InvalidConfig {
                message: "max_depth must be at least 1",
            });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidConfig {
                message: "min_samples_split must be at least 2",
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(ForestError::InvalidConfig {
                message: "min_samples_leaf must be at least 1",
            });
        }
        Ok(())
    }
}

/// Bagged regression forest. Predictions average the per-tree leaf values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Trains a regression forest on `rows` against `targets`.
    ///
    /// # Errors
    ///
    /// * `ForestError::InvalidConfig` when `config` fails validation
    /// * `ForestError::EmptyTrainingSet` when `rows` has no rows or no columns
    /// * `ForestError::LengthMismatch` when `rows` and `targets` disagree
    /// * `ForestError::DimensionMismatch` when row widths are inconsistent
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        config.validate()?;
        let n_features = check_training_rows(rows, targets.len())?;
        let params = grow_params(config, n_features);
        let mut trees = Vec::with_capacity(config.n_trees);
        for tree_index in 0..config.n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
            let sample = bootstrap_indices(&mut rng, rows.len());
            trees.push(grow::grow_regression_tree(
                rows, targets, &sample, &params, &mut rng,
            ));
        }
        Ok(Self { trees, n_features })
    }

    /// Predicts a single row as the mean of the per-tree predictions.
    ///
    /// # Errors
    ///
    /// * `ForestError::DimensionMismatch` when `row` has the wrong width
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ForestError> {
        check_row(row, self.n_features)?;
        let sum: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// # Errors
    ///
    /// * `ForestError::DimensionMismatch` when any row has the wrong width
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    #[must_use]
    pub const fn tree_count(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.n_features
    }
}

/// Bagged classification forest. Each tree votes a class; prediction is the
/// plurality vote with ties resolved to the lowest class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Trains a classification forest on `rows` against integer `labels`.
    ///
    /// `class_weights`, when given, is indexed by label and scales each
    /// sample's contribution to impurity and leaf majorities. `None` weighs
    /// every class equally.
    ///
    /// # Errors
    ///
    /// * `ForestError::InvalidConfig` when `config` fails validation
    /// * `ForestError::EmptyTrainingSet` when `rows` has no rows or no columns
    /// * `ForestError::LengthMismatch` when `rows` and `labels` disagree
    /// * `ForestError::DimensionMismatch` when row widths are inconsistent
    /// * `ForestError::ClassWeights` when the weight table is too short
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        class_weights: Option<&[f64]>,
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        config.validate()?;
        let n_features = check_training_rows(rows, labels.len())?;
        let n_classes = labels.iter().copied().max().map_or(1, |top| top + 1);
        if let Some(weights) = class_weights
            && weights.len() < n_classes
        {
            return Err(ForestError::ClassWeights {
                classes: n_classes,
                weights: weights.len(),
            });
        }
        let weights = class_weights.map_or_else(|| vec![1.0; n_classes], <[f64]>::to_vec);
        let params = grow_params(config, n_features);
        let mut trees = Vec::with_capacity(config.n_trees);
        for tree_index in 0..config.n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
            let sample = bootstrap_indices(&mut rng, rows.len());
            trees.push(grow::grow_classification_tree(
                rows, labels, &weights, n_classes, &sample, &params, &mut rng,
            ));
        }
        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    /// Predicts the class for a single row by plurality vote.
    ///
    /// # Errors
    ///
    /// * `ForestError::DimensionMismatch` when `row` has the wrong width
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // leaves store class indices
    pub fn predict_row(&self, row: &[f64]) -> Result<usize, ForestError> {
        check_row(row, self.n_features)?;
        let mut votes = vec![0_usize; self.n_classes];
        for tree in &self.trees {
            let class = tree.predict_row(row) as usize;
            if let Some(slot) = votes.get_mut(class) {
                *slot += 1;
            }
        }
        Ok(plurality(&votes))
    }

    /// # Errors
    ///
    /// * `ForestError::DimensionMismatch` when any row has the wrong width
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    #[must_use]
    pub const fn tree_count(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub const fn class_count(&self) -> usize {
        self.n_classes
    }
}

fn check_training_rows(rows: &[Vec<f64>], targets_len: usize) -> Result<usize, ForestError> {
    if rows.is_empty() {
        return Err(ForestError::EmptyTrainingSet);
    }
    if rows.len() != targets_len {
        return Err(ForestError::LengthMismatch {
            rows: rows.len(),
            targets: targets_len,
        });
    }
    let n_features = rows[0].len();
    if n_features == 0 {
        return Err(ForestError::EmptyTrainingSet);
    }
    for row in rows {
        if row.len() != n_features {
            return Err(ForestError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
    }
    Ok(n_features)
}

const fn check_row(row: &[f64], expected: usize) -> Result<(), ForestError> {
    if row.len() == expected {
        Ok(())
    } else {
        Err(ForestError::DimensionMismatch {
            expected,
            actual: row.len(),
        })
    }
}

const fn grow_params(config: &ForestConfig, n_features: usize) -> GrowParams {
    GrowParams {
        n_features,
        feature_count: config.max_features.count(n_features),
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
    }
}

fn bootstrap_indices(rng: &mut StdRng, len: usize) -> Vec<usize> {
    (0..len).map(|_| rng.gen_range(0..len)).collect()
}

fn plurality(votes: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = class;
        }
    }
    best
}
