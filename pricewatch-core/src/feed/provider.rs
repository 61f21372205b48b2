//! Price feed trait and structured error types.
//!
//! The PriceFeed trait abstracts over price sources (Yahoo Finance, CSV files,
//! in-memory series) so the evaluator and session can swap implementations
//! and mock for tests.

use crate::alerts::StopToken;
use crate::domain::{Bar, Interval, Period};
use crate::error::ErrorKind;
use thiserror::Error;

/// Structured error types for feed operations.
///
/// Every variant except `Cancelled` is a `FeedUnavailable` condition: the
/// caller reports it and retries on the next cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: price feed has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("feed error: {0}")]
    Other(String),

    #[error("fetch abandoned: stop requested")]
    Cancelled,
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::FeedUnavailable,
        }
    }
}

/// Trait for price sources.
///
/// `fetch` returns an empty series when the source has no rows for the
/// request; that is a valid outcome, distinct from `Err`, which means the
/// source could not be reached or understood. Series are canonical: strictly
/// increasing timestamps, no void bars.
pub trait PriceFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    /// Fetch the bar history for `symbol` over `period` at `period.interval()`.
    fn fetch(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FeedError>;

    /// Fetch the most recent bar at `interval`, or `None` if there is none.
    fn fetch_latest(&self, symbol: &str, interval: Interval) -> Result<Option<Bar>, FeedError>;

    /// `fetch_latest` that issues no request once `stop` is raised.
    ///
    /// Feeds that retry or back off must override this and check `stop`
    /// between attempts. The default suits feeds that never block.
    fn fetch_latest_cancellable(
        &self,
        symbol: &str,
        interval: Interval,
        stop: &StopToken,
    ) -> Result<Option<Bar>, FeedError> {
        if stop.is_stopped() {
            return Err(FeedError::Cancelled);
        }
        self.fetch_latest(symbol, interval)
    }

    /// Check if the feed is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}
