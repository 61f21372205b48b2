//! Direction classifier: a seeded random forest over feature rows.

pub mod cache;
pub mod dataset;
pub mod forest;
pub mod model;
pub mod tree;

pub use cache::ModelCache;
pub use dataset::{Dataset, N_CLASSES};
pub use forest::{ForestConfig, RandomForest};
pub use model::{
    ClassReport, ClassifierConfig, ClassifierError, DirectionClassifier, DirectionModel,
    Evaluation,
};
pub use tree::{DecisionTree, TreeConfig, TreeNode};
