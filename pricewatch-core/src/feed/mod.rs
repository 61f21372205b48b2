//! Price feed adapters: Yahoo Finance, CSV files, in-memory series.

pub mod circuit_breaker;
pub mod csv_file;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_file::CsvFeed;
pub use memory::{bars_from_closes, MemoryFeed};
pub use provider::{FeedError, PriceFeed};
pub use yahoo::YahooFeed;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Network feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Per-request timeout. Bounds how long one symbol can stall a cycle.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 2,
            base_delay_ms: 500,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
            base_url: "https://query2.finance.yahoo.com/v8/finance/chart".into(),
        }
    }
}

impl FeedConfig {
    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            Duration::from_secs(self.breaker_cooldown_secs),
            self.breaker_failure_threshold,
        )
    }
}

/// Build the default network feed with its own circuit breaker.
pub fn yahoo_feed(config: &FeedConfig) -> Result<Arc<dyn PriceFeed>, FeedError> {
    let breaker = Arc::new(config.circuit_breaker());
    Ok(Arc::new(YahooFeed::new(config, breaker)?))
}
