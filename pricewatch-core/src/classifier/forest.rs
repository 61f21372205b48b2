//! Random Forest classifier: bootstrap-sampled trees, soft voting.

use super::dataset::{Dataset, N_CLASSES};
use super::tree::{DecisionTree, TreeConfig};
use crate::rng::SeedHierarchy;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    pub tree: TreeConfig,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Master seed; each tree derives its own
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: TreeConfig::default(),
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Train on the rows of `dataset` named by `indices`.
    ///
    /// Trees are built in parallel; each draws from its own derived seed so
    /// the result does not depend on thread count or scheduling.
    pub fn fit(&mut self, dataset: &Dataset, indices: &[usize]) {
        let seeds = SeedHierarchy::new(self.config.seed);
        let n_features = dataset.n_features();
        let max_features = self
            .config
            .tree
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize);

        let config = &self.config;
        self.trees = (0..config.n_trees.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = seeds.rng_for("tree", i as u64);
                let sample: Vec<usize> = if config.bootstrap && !indices.is_empty() {
                    (0..indices.len())
                        .map(|_| indices[rng.gen_range(0..indices.len())])
                        .collect()
                } else {
                    indices.to_vec()
                };

                let mut tree = DecisionTree::new(TreeConfig {
                    max_features: Some(max_features),
                    ..config.tree.clone()
                });
                tree.fit(dataset, &sample, &mut rng);
                tree
            })
            .collect();
    }

    /// Mean of per-tree leaf class frequencies.
    pub fn predict_proba_one(&self, features: &[f64]) -> [f64; N_CLASSES] {
        let mut probs = [0.0; N_CLASSES];
        if self.trees.is_empty() {
            return [1.0 / N_CLASSES as f64; N_CLASSES];
        }
        for tree in &self.trees {
            for (acc, p) in probs.iter_mut().zip(tree.predict_proba_one(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        probs
    }
}
