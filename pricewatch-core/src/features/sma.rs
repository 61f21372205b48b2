//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// A zero period is treated as one.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// One value per bar; `None` until `period` bars exist.
    pub fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = bars.iter().take(self.period).map(|b| b.close).sum();
        result[self.period - 1] = Some(sum / self.period as f64);

        // Roll the window forward
        for i in self.period..n {
            sum += bars[i].close - bars[i - self.period].close;
            result[i] = Some(sum / self.period as f64);
        }

        result
    }
}
