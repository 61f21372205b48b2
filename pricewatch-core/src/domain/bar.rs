//! Bar: one OHLCV observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OHLCV bar for a single symbol over one interval (a minute or a day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Bring a raw series into canonical form.
///
/// Bars failing [`Bar::is_sane`] (void, non-positive, or with open/close
/// outside high..low) are dropped, the rest sorted by timestamp, and bars
/// sharing a timestamp collapsed so the later one in input order wins. The
/// output is strictly increasing in `timestamp`.
pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    let raw = bars.len();
    bars.retain(Bar::is_sane);
    if bars.len() < raw {
        debug!(dropped = raw - bars.len(), "dropped malformed bars");
    }
    // Stable sort keeps input order among equal timestamps.
    bars.sort_by_key(|b| b.timestamp);

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// True if timestamps are strictly increasing.
pub fn is_canonical(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 21, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(bar_at(2, 100.0).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = bar_at(2, 100.0);
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = bar_at(2, 100.0);
        bar.high = 98.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn canonicalize_sorts_and_dedups() {
        let bars = vec![
            bar_at(4, 103.0),
            bar_at(2, 101.0),
            bar_at(3, 102.0),
            bar_at(3, 102.5),
        ];
        let out = canonicalize(bars);
        assert_eq!(out.len(), 3);
        assert!(is_canonical(&out));
        // later duplicate wins
        assert_eq!(out[1].close, 102.5);
    }

    #[test]
    fn canonicalize_drops_void_bars() {
        let mut void = bar_at(3, 0.0);
        void.open = f64::NAN;
        let out = canonicalize(vec![bar_at(2, 100.0), void, bar_at(4, 101.0)]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|b| !b.is_void()));
    }

    #[test]
    fn canonicalize_drops_malformed_bars() {
        let mut inverted = bar_at(3, 100.0);
        inverted.high = 98.0;
        let mut zero = bar_at(4, 0.0);
        zero.low = 0.0;
        let mut close_above_high = bar_at(5, 100.0);
        close_above_high.close = 105.0;

        let out = canonicalize(vec![
            bar_at(2, 100.0),
            inverted,
            zero,
            close_above_high,
            bar_at(6, 101.0),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].close, 100.0);
        assert_eq!(out[1].close, 101.0);
    }
}
