//! CSV file price feed.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `timestamp,open,high,low,close,volume`
//! header and RFC 3339 timestamps. Useful offline and when Yahoo is blocked.

use super::provider::{FeedError, PriceFeed};
use crate::domain::{canonicalize, Bar, Interval, Period};
use std::path::{Path, PathBuf};

pub struct CsvFeed {
    dir: PathBuf,
}

impl CsvFeed {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    /// Load the whole file. A missing file is "no data", not an error.
    fn load(&self, symbol: &str) -> Result<Vec<Bar>, FeedError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_bars(&path)
    }
}

/// Read every bar from a CSV file into a canonical series.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, FeedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let bars = reader
        .deserialize::<Bar>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(canonicalize(bars))
}

/// Write a series to CSV in the layout `CsvFeed` reads.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), FeedError> {
    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;
    Ok(())
}

impl PriceFeed for CsvFeed {
    fn name(&self) -> &str {
        "csv"
    }

    /// Bars within `period` of the last bar in the file.
    fn fetch(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FeedError> {
        let bars = self.load(symbol)?;
        let Some(last) = bars.last() else {
            return Ok(bars);
        };
        let cutoff = last.timestamp - period.span();
        Ok(bars.into_iter().filter(|b| b.timestamp > cutoff).collect())
    }

    fn fetch_latest(&self, symbol: &str, _interval: Interval) -> Result<Option<Bar>, FeedError> {
        Ok(self.load(symbol)?.pop())
    }
}
