//! Feature engineering for the direction classifier.

pub mod builder;
pub mod sma;

pub use builder::{FeatureBuilder, FeatureConfig, FeatureRow, Movement, FEATURE_NAMES};
pub use sma::Sma;
