//! Multi-class CART decision tree (Gini impurity).

use super::dataset::{Dataset, N_CLASSES};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Class frequencies at this leaf, summing to 1.
        class_probs: [f64; N_CLASSES],
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision Tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self { config, root: None }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Train on the rows of `dataset` named by `indices` (duplicates allowed,
    /// which is how bootstrap samples arrive).
    pub fn fit(&mut self, dataset: &Dataset, indices: &[usize], rng: &mut StdRng) {
        self.root = Some(self.build_tree(dataset, indices, 0, rng));
    }

    fn build_tree(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> TreeNode {
        let counts = class_counts(dataset, indices);
        let impurity = gini(&counts, indices.len());

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || impurity <= 1e-12
        {
            return leaf(&counts, indices.len());
        }

        let Some(best) = self.find_best_split(dataset, indices, &counts, impurity, rng) else {
            return leaf(&counts, indices.len());
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| dataset.features[i][best.feature_idx] <= best.threshold);

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left: Box::new(self.build_tree(dataset, &left_idx, depth + 1, rng)),
            right: Box::new(self.build_tree(dataset, &right_idx, depth + 1, rng)),
        }
    }

    /// Sorted sweep per candidate feature: one pass moves samples from the
    /// right-hand counts to the left-hand counts and scores every boundary
    /// between distinct values.
    fn find_best_split(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        parent_counts: &[usize; N_CLASSES],
        parent_impurity: f64,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = dataset.n_features();
        let max_features = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;

        for &feature_idx in &feature_indices {
            let mut column: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (dataset.features[i][feature_idx], dataset.labels[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = [0usize; N_CLASSES];
            let mut right = *parent_counts;

            for k in 0..n.saturating_sub(1) {
                let (value, label) = column[k];
                left[label] += 1;
                right[label] -= 1;

                let next = column[k + 1].0;
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    let mut threshold = value + (next - value) / 2.0;
                    // Adjacent floats: the midpoint can round up onto `next`.
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Class frequencies of the leaf `features` lands in.
    pub fn predict_proba_one(&self, features: &[f64]) -> [f64; N_CLASSES] {
        let mut node = match &self.root {
            Some(node) => node,
            None => return [1.0 / N_CLASSES as f64; N_CLASSES],
        };
        loop {
            match node {
                TreeNode::Leaf { class_probs, .. } => return *class_probs,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    // NaN compares false and goes right; every input reaches a leaf.
                    let value = features.get(*feature_idx).copied().unwrap_or(f64::NAN);
                    node = if value <= *threshold { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }
}

fn class_counts(dataset: &Dataset, indices: &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for &i in indices {
        counts[dataset.labels[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize; N_CLASSES], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize; N_CLASSES], n: usize) -> TreeNode {
    let mut class_probs = [0.0; N_CLASSES];
    if n > 0 {
        for (p, &c) in class_probs.iter_mut().zip(counts) {
            *p = c as f64 / n as f64;
        }
    }
    TreeNode::Leaf {
        class_probs,
        n_samples: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn banded_dataset() -> Dataset {
        // label by x: < 3 → 0, 3..6 → 1, >= 6 → 2
        let mut ds = Dataset::new(1);
        for i in 0..90 {
            let x = i as f64 / 10.0;
            let label = if x < 3.0 { 0 } else if x < 6.0 { 1 } else { 2 };
            ds.push(vec![x], label);
        }
        ds
    }

    #[test]
    fn gini_of_pure_and_mixed() {
        assert_eq!(gini(&[4, 0, 0], 4), 0.0);
        let even = gini(&[1, 1, 1], 3);
        assert!((even - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn learns_three_bands() {
        let ds = banded_dataset();
        let indices: Vec<usize> = (0..ds.len()).collect();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&ds, &indices, &mut StdRng::seed_from_u64(7));

        for (x, expected) in [(0.5, 0), (4.0, 1), (8.5, 2)] {
            let probs = tree.predict_proba_one(&[x]);
            assert_eq!(probs[expected], 1.0, "x={x} probs={probs:?}");
        }
        assert_eq!(tree.root().unwrap().n_leaves(), 3);
    }

    #[test]
    fn depth_limit_is_respected() {
        let ds = banded_dataset();
        let indices: Vec<usize> = (0..ds.len()).collect();
        let mut tree = DecisionTree::new(TreeConfig {
            max_depth: 1,
            ..Default::default()
        });
        tree.fit(&ds, &indices, &mut StdRng::seed_from_u64(7));
        assert_eq!(tree.root().unwrap().depth(), 2);
    }

    #[test]
    fn constant_features_make_a_single_leaf() {
        let mut ds = Dataset::new(2);
        for i in 0..10 {
            ds.push(vec![1.0, 1.0], i % 3);
        }
        let indices: Vec<usize> = (0..ds.len()).collect();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&ds, &indices, &mut StdRng::seed_from_u64(1));
        assert_eq!(tree.root().unwrap().n_leaves(), 1);
        let probs = tree.predict_proba_one(&[f64::NAN, 5.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
