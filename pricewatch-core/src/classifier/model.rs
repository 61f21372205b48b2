//! Direction classifier: train on feature rows, predict the next movement.

use super::dataset::{Dataset, N_CLASSES};
use super::forest::{ForestConfig, RandomForest};
use super::tree::TreeConfig;
use crate::error::ErrorKind;
use crate::features::{FeatureRow, Movement};
use crate::rng::SeedHierarchy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("insufficient data: {rows} feature rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },
}

impl ClassifierError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InsufficientData
    }
}

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` = ceil(sqrt(feature count)).
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    /// Share of rows held out for evaluation.
    pub test_ratio: f64,
    /// Fewer feature rows than this fails with `InsufficientData`.
    pub min_rows: usize,
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            test_ratio: 0.2,
            min_rows: 20,
            seed: 42,
        }
    }
}

impl ClassifierConfig {
    fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            n_trees: self.n_trees,
            tree: TreeConfig {
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                max_features: self.max_features,
            },
            bootstrap: self.bootstrap,
            seed: SeedHierarchy::new(self.seed).sub_seed("forest", 0),
        }
    }
}

/// Precision/recall for one class on the hold-out set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: Movement,
    pub precision: f64,
    pub recall: f64,
    /// Hold-out rows whose true label is this class.
    pub support: usize,
}

/// Hold-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub per_class: Vec<ClassReport>,
}

impl Evaluation {
    fn from_predictions(pairs: &[(Movement, Movement)], train_rows: usize) -> Self {
        let correct = pairs.iter().filter(|(truth, pred)| truth == pred).count();
        let accuracy = if pairs.is_empty() {
            0.0
        } else {
            correct as f64 / pairs.len() as f64
        };

        let per_class = Movement::ALL
            .iter()
            .map(|&label| {
                let tp = pairs.iter().filter(|(t, p)| *t == label && *p == label).count();
                let predicted = pairs.iter().filter(|(_, p)| *p == label).count();
                let support = pairs.iter().filter(|(t, _)| *t == label).count();
                ClassReport {
                    label,
                    precision: ratio(tp, predicted),
                    recall: ratio(tp, support),
                    support,
                }
            })
            .collect();

        Self {
            accuracy,
            train_rows,
            test_rows: pairs.len(),
            per_class,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Order in which equal vote shares are resolved.
const TIE_ORDER: [Movement; N_CLASSES] = [Movement::Sideways, Movement::Up, Movement::Down];

/// A trained forest plus its hold-out evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionModel {
    forest: RandomForest,
    evaluation: Evaluation,
}

impl DirectionModel {
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Class shares indexed by `Movement::index`.
    pub fn probabilities(&self, row: &FeatureRow) -> [f64; N_CLASSES] {
        self.forest.predict_proba_one(&row.features())
    }

    /// Always one of the three labels, whatever the input.
    pub fn predict(&self, row: &FeatureRow) -> Movement {
        argmax(&self.probabilities(row))
    }

    /// Prediction for the most recent row.
    pub fn predict_latest(&self, rows: &[FeatureRow]) -> Result<Movement, ClassifierError> {
        rows.last()
            .map(|row| self.predict(row))
            .ok_or(ClassifierError::InsufficientData {
                rows: 0,
                required: 1,
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectionClassifier {
    config: ClassifierConfig,
}

impl DirectionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Fit on a seeded shuffled split and score the hold-out.
    ///
    /// Deterministic for a given config: the split and every tree draw from
    /// seeds derived from `config.seed`.
    pub fn train(&self, rows: &[FeatureRow]) -> Result<DirectionModel, ClassifierError> {
        let required = self.config.min_rows.max(2);
        if rows.len() < required {
            return Err(ClassifierError::InsufficientData {
                rows: rows.len(),
                required,
            });
        }

        let dataset = Dataset::from_rows(rows);
        let mut split_rng = SeedHierarchy::new(self.config.seed).rng_for("split", 0);
        let (train_idx, test_idx) = dataset.shuffled_split(self.config.test_ratio, &mut split_rng);

        let mut forest = RandomForest::new(self.config.forest_config());
        forest.fit(&dataset, &train_idx);

        let pairs: Vec<(Movement, Movement)> = test_idx
            .iter()
            .map(|&i| {
                let truth = rows[i].movement_label;
                let probs = forest.predict_proba_one(&dataset.features[i]);
                (truth, argmax(&probs))
            })
            .collect();

        let evaluation = Evaluation::from_predictions(&pairs, train_idx.len());
        debug!(
            rows = rows.len(),
            train = evaluation.train_rows,
            test = evaluation.test_rows,
            accuracy = evaluation.accuracy,
            "direction model trained"
        );

        Ok(DirectionModel { forest, evaluation })
    }
}

fn argmax(probs: &[f64; N_CLASSES]) -> Movement {
    let mut best = TIE_ORDER[0];
    for &label in &TIE_ORDER[1..] {
        if probs[label.index()] > probs[best.index()] {
            best = label;
        }
    }
    best
}
