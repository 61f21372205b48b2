//! Per-bar feature rows: daily return, two moving averages, movement label.

use super::sma::Sma;
use crate::domain::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discretized price direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Movement {
    Down,
    Sideways,
    Up,
}

impl Movement {
    /// Class order used by the classifier.
    pub const ALL: [Movement; 3] = [Movement::Down, Movement::Sideways, Movement::Up];

    /// Open boundary: a return of exactly ±threshold is `Sideways`.
    pub fn from_return(daily_return: f64, threshold: f64) -> Self {
        if daily_return > threshold {
            Movement::Up
        } else if daily_return < -threshold {
            Movement::Down
        } else {
            Movement::Sideways
        }
    }

    pub fn index(self) -> usize {
        match self {
            Movement::Down => 0,
            Movement::Sideways => 1,
            Movement::Up => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Movement::Down => "Down",
            Movement::Sideways => "Sideways",
            Movement::Up => "Up",
        };
        f.write_str(s)
    }
}

/// Feature builder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Absolute daily return above which a bar counts as a move (0.002 = 0.2%).
    pub threshold: f64,
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            threshold: 0.002,
            short_window: 5,
            long_window: 10,
        }
    }
}

/// Classifier inputs in column order.
pub const FEATURE_NAMES: [&str; 7] = ["open", "high", "low", "close", "volume", "ma_short", "ma_long"];

/// A bar plus everything derived from it. Every field is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub daily_return: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub movement_label: Movement,
}

impl FeatureRow {
    /// Values in `FEATURE_NAMES` order.
    pub fn features(&self) -> [f64; 7] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume as f64,
            self.ma_short,
            self.ma_long,
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Leading rows that can never be complete: the longer MA's lookback,
    /// or the one bar a return needs, whichever is larger.
    pub fn warmup(&self) -> usize {
        let short = Sma::new(self.config.short_window).lookback();
        let long = Sma::new(self.config.long_window).lookback();
        short.max(long).max(1)
    }

    /// Derive feature rows from a canonical bar series.
    ///
    /// Pure: no state, no I/O. Rows with an undefined or non-finite field are
    /// dropped, so a series shorter than the warmup yields an empty result.
    pub fn build(&self, bars: &[Bar]) -> Vec<FeatureRow> {
        let ma_short = Sma::new(self.config.short_window).compute(bars);
        let ma_long = Sma::new(self.config.long_window).compute(bars);

        (1..bars.len())
            .filter_map(|i| {
                let bar = &bars[i];
                let daily_return = bar.close / bars[i - 1].close - 1.0;
                let (Some(ma_short), Some(ma_long)) = (ma_short[i], ma_long[i]) else {
                    return None;
                };
                if !(daily_return.is_finite() && ma_short.is_finite() && ma_long.is_finite()) {
                    return None;
                }
                Some(FeatureRow {
                    timestamp: bar.timestamp,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    daily_return,
                    ma_short,
                    ma_long,
                    movement_label: Movement::from_return(daily_return, self.config.threshold),
                })
            })
            .collect()
    }
}
