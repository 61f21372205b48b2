//! In-memory price feed for tests and offline demos.

use super::provider::{FeedError, PriceFeed};
use crate::domain::{canonicalize, Bar, Interval, Period};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    series: HashMap<String, Vec<Bar>>,
    failing: HashSet<String>,
}

/// Price feed backed by per-symbol series held in memory.
///
/// Counts every `fetch`/`fetch_latest` call, and can be told to fail for a
/// symbol to simulate an unreachable upstream.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    state: Mutex<MemoryState>,
    fetches: AtomicUsize,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.set_series(symbol, bars);
        self
    }

    /// Daily bars with the given closes, one per day from 2024-01-02.
    pub fn with_closes(self, symbol: &str, closes: &[f64]) -> Self {
        self.with_series(symbol, bars_from_closes(closes))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_series(&self, symbol: &str, bars: Vec<Bar>) {
        self.lock().series.insert(symbol.to_string(), canonicalize(bars));
    }

    /// Append a bar at `close`, one minute after the current last bar.
    pub fn push_close(&self, symbol: &str, close: f64) {
        let mut state = self.lock();
        let series = state.series.entry(symbol.to_string()).or_default();
        let timestamp = series
            .last()
            .map(|b| b.timestamp + Duration::minutes(1))
            .unwrap_or_else(base_timestamp);
        series.push(flat_bar(timestamp, close));
    }

    pub fn fail_symbol(&self, symbol: &str) {
        self.lock().failing.insert(symbol.to_string());
    }

    pub fn recover_symbol(&self, symbol: &str) {
        self.lock().failing.remove(symbol);
    }

    /// Total number of fetch calls served (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn series_for(&self, symbol: &str) -> Result<Vec<Bar>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if state.failing.contains(symbol) {
            return Err(FeedError::NetworkUnreachable(format!(
                "simulated outage for {symbol}"
            )));
        }
        Ok(state.series.get(symbol).cloned().unwrap_or_default())
    }
}

impl PriceFeed for MemoryFeed {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FeedError> {
        let bars = self.series_for(symbol)?;
        let Some(last) = bars.last() else {
            return Ok(bars);
        };
        let cutoff = last.timestamp - period.span();
        Ok(bars.into_iter().filter(|b| b.timestamp > cutoff).collect())
    }

    fn fetch_latest(&self, symbol: &str, _interval: Interval) -> Result<Option<Bar>, FeedError> {
        Ok(self.series_for(symbol)?.pop())
    }
}

fn base_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0)
        .single()
        .unwrap_or_default()
}

fn flat_bar(timestamp: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

/// Create daily bars from close prices.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = base_timestamp();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1_000 + i as u64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_is_empty() {
        let feed = MemoryFeed::new();
        assert!(feed.fetch("SPY", Period::SixMonths).unwrap().is_empty());
        assert!(feed.fetch_latest("SPY", Interval::Daily).unwrap().is_none());
        assert_eq!(feed.fetch_count(), 2);
    }

    #[test]
    fn push_close_moves_latest() {
        let feed = MemoryFeed::new().with_closes("SPY", &[100.0, 101.0]);
        feed.push_close("SPY", 105.0);
        let latest = feed.fetch_latest("SPY", Interval::OneMinute).unwrap().unwrap();
        assert_eq!(latest.close, 105.0);
    }

    #[test]
    fn failing_symbol_errors_until_recovered() {
        let feed = MemoryFeed::new().with_closes("SPY", &[100.0]);
        feed.fail_symbol("SPY");
        assert!(feed.fetch_latest("SPY", Interval::Daily).is_err());
        feed.recover_symbol("SPY");
        assert!(feed.fetch_latest("SPY", Interval::Daily).unwrap().is_some());
    }

    #[test]
    fn generated_bars_are_sane() {
        let bars = bars_from_closes(&[100.0, 99.0, 101.0]);
        assert!(bars.iter().all(Bar::is_sane));
    }
}
