//! Feature matrix plus class labels.

use crate::features::{FeatureRow, Movement};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub const N_CLASSES: usize = Movement::ALL.len();

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    n_features: usize,
    pub features: Vec<Vec<f64>>,
    /// Class index per sample, see `Movement::index`.
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            ..Default::default()
        }
    }

    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let mut ds = Self::new(crate::features::FEATURE_NAMES.len());
        for row in rows {
            ds.push(row.features().to_vec(), row.movement_label.index());
        }
        ds
    }

    pub fn push(&mut self, features: Vec<f64>, label: usize) {
        debug_assert_eq!(features.len(), self.n_features);
        debug_assert!(label < N_CLASSES);
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Shuffled train/test index split. The test side gets
    /// `ceil(len * test_ratio)` rows, clamped so both sides are non-empty.
    ///
    /// Requires at least two rows.
    pub fn shuffled_split(&self, test_ratio: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
        let n = self.len();
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);

        let n_test = ((n as f64 * test_ratio).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
        let train = indices.split_off(n_test);
        (train, indices)
    }
}
