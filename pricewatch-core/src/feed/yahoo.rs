//! Yahoo Finance price feed.
//!
//! Reads history and the latest one-minute bar from the v8 chart endpoint.
//! Transient failures back off exponentially and count toward the shared
//! circuit breaker; a 403 opens it at once. A raised stop token ends the
//! retry loop before the next request.
//!
//! The endpoint is unofficial and its payload shape can change without
//! notice. Point the session at a `CsvFeed` when it is unreachable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{FeedError, PriceFeed};
use super::FeedConfig;
use crate::alerts::StopToken;
use crate::domain::{canonicalize, Bar, Interval, Period};
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Top level of a chart payload.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance price feed.
pub struct YahooFeed {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooFeed {
    pub fn new(config: &FeedConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, FeedError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FeedError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        })
    }

    /// Build the chart API URL for a symbol, range code and interval.
    fn chart_url(&self, symbol: &str, range: &str, interval: Interval) -> String {
        format!(
            "{}/{symbol}?range={range}&interval={}&includePrePost=false",
            self.base_url,
            interval.code()
        )
    }

    /// Execute a request with retry and circuit breaker logic, returning the raw body.
    ///
    /// With a `stop` token, the backoff waits on it and no attempt starts
    /// after it is raised. A request already in flight runs to its timeout.
    fn get_with_retry(
        &self,
        symbol: &str,
        url: &str,
        stop: Option<&StopToken>,
    ) -> Result<String, FeedError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FeedError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                match stop {
                    Some(stop) if stop.wait_timeout(delay) => return Err(FeedError::Cancelled),
                    Some(_) => {}
                    None => std::thread::sleep(delay),
                }
            }
            if stop.is_some_and(StopToken::is_stopped) {
                debug!(%symbol, attempt, "stop raised, abandoning chart request");
                return Err(FeedError::Cancelled);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FeedError::CircuitBreakerTripped);
            }

            debug!(%symbol, attempt, "chart request");
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban, trip the breaker now
                        self.circuit_breaker.trip();
                        return Err(FeedError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(FeedError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(FeedError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(FeedError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let body = resp.text().map_err(|e| {
                        FeedError::ResponseFormatChanged(format!(
                            "failed to read response for {symbol}: {e}"
                        ))
                    })?;
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(e) => {
                    let err = if e.is_timeout() {
                        FeedError::Timeout {
                            secs: self.timeout.as_secs(),
                        }
                    } else {
                        FeedError::NetworkUnreachable(e.to_string())
                    };
                    self.circuit_breaker.record_failure();
                    if e.is_connect() || e.is_timeout() {
                        warn!(%symbol, attempt, error = %err, "chart request failed");
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FeedError::Other("max retries exceeded".into())))
    }
}

/// Parse a chart API body into a canonical bar series.
///
/// Rows with any missing OHLC value (halts, holidays) are skipped. An empty
/// result is returned as an empty series rather than an error.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Bar>, FeedError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        FeedError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(FeedError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(FeedError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => return Ok(Vec::new()),
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    // Yahoo omits the timestamp array entirely when the range holds no rows.
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| FeedError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }

    Ok(canonicalize(bars))
}

impl PriceFeed for YahooFeed {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FeedError> {
        let url = self.chart_url(symbol, period.code(), period.interval());
        let body = self.get_with_retry(symbol, &url, None)?;
        parse_chart(symbol, &body)
    }

    fn fetch_latest(&self, symbol: &str, interval: Interval) -> Result<Option<Bar>, FeedError> {
        let url = self.chart_url(symbol, interval.latest_range(), interval);
        let body = self.get_with_retry(symbol, &url, None)?;
        Ok(parse_chart(symbol, &body)?.pop())
    }

    fn fetch_latest_cancellable(
        &self,
        symbol: &str,
        interval: Interval,
        stop: &StopToken,
    ) -> Result<Option<Bar>, FeedError> {
        let url = self.chart_url(symbol, interval.latest_range(), interval);
        let body = self.get_with_retry(symbol, &url, Some(stop))?;
        Ok(parse_chart(symbol, &body)?.pop())
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
