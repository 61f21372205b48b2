//! Evaluation cycle and polling loop.

use super::registry::AlertRegistry;
use super::rule::{AlertEvent, AlertRule, AlertState};
use super::stop::StopToken;
use crate::domain::{Bar, Interval};
use crate::events::{DisplayEvent, EventSink};
use crate::feed::{FeedError, PriceFeed};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts for one evaluation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Rules that received an observation attempt.
    pub evaluated: usize,
    pub fired: usize,
    /// Rules observed below target, still active.
    pub pending: usize,
    /// Rules left active because their symbol had no data or failed.
    pub feed_errors: usize,
}

/// Why the polling loop ended. Both are clean exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunExit {
    /// The stop token was raised.
    Cancelled,
    /// No active rules remain.
    Drained,
}

/// Outcome of fetching one symbol's latest price.
enum Observation {
    Price(Bar),
    NoData,
    Failed(String),
    /// Stop was raised while the fetch was retrying.
    Cancelled,
}

/// Checks active rules against the latest price and retires the ones that
/// fire.
pub struct AlertEvaluator {
    registry: Arc<AlertRegistry>,
    feed: Arc<dyn PriceFeed>,
    sink: Arc<dyn EventSink>,
    interval: Interval,
    status_events: bool,
}

impl AlertEvaluator {
    pub fn new(registry: Arc<AlertRegistry>, feed: Arc<dyn PriceFeed>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            feed,
            sink,
            interval: Interval::OneMinute,
            status_events: true,
        }
    }

    /// Bar interval used for the latest-price query (default one minute).
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Emit `AlertStatus` for rules that did not fire (default on).
    pub fn with_status_events(mut self, enabled: bool) -> Self {
        self.status_events = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    /// One pass over a snapshot of the active rules.
    pub fn evaluate_once(&self) -> CycleReport {
        self.cycle(None)
    }

    fn cycle(&self, stop: Option<&StopToken>) -> CycleReport {
        let snapshot = self.registry.list_active();
        let mut observations: HashMap<String, Observation> = HashMap::new();
        let mut report = CycleReport::default();

        for rule in snapshot {
            if !observations.contains_key(&rule.symbol) {
                if stop.is_some_and(StopToken::is_stopped) {
                    debug!("stop raised mid-cycle, skipping remaining fetches");
                    break;
                }
                let observation = self.observe(&rule.symbol, stop);
                if matches!(observation, Observation::Cancelled) {
                    debug!(symbol = %rule.symbol, "fetch abandoned on stop, ending cycle");
                    break;
                }
                observations.insert(rule.symbol.clone(), observation);
            }
            let Some(observation) = observations.get(&rule.symbol) else {
                continue;
            };
            report.evaluated += 1;
            self.apply(rule, observation, &mut report);
        }

        debug!(
            evaluated = report.evaluated,
            fired = report.fired,
            pending = report.pending,
            feed_errors = report.feed_errors,
            "alert cycle complete"
        );
        report
    }

    fn observe(&self, symbol: &str, stop: Option<&StopToken>) -> Observation {
        let latest = match stop {
            Some(stop) => self.feed.fetch_latest_cancellable(symbol, self.interval, stop),
            None => self.feed.fetch_latest(symbol, self.interval),
        };
        match latest {
            Ok(Some(bar)) => Observation::Price(bar),
            Err(FeedError::Cancelled) => Observation::Cancelled,
            Ok(None) => {
                warn!(symbol, feed = self.feed.name(), "no latest price");
                Observation::NoData
            }
            Err(e) => {
                warn!(symbol, feed = self.feed.name(), error = %e, "latest price fetch failed");
                Observation::Failed(e.to_string())
            }
        }
    }

    fn apply(&self, rule: AlertRule, observation: &Observation, report: &mut CycleReport) {
        let bar = match observation {
            Observation::Price(bar) => bar,
            Observation::NoData => {
                report.feed_errors += 1;
                self.sink.emit(DisplayEvent::FeedError {
                    message: format!("no price data for {}", rule.symbol),
                    symbol: rule.symbol,
                });
                return;
            }
            Observation::Failed(message) => {
                report.feed_errors += 1;
                self.sink.emit(DisplayEvent::FeedError {
                    symbol: rule.symbol,
                    message: message.clone(),
                });
                return;
            }
            Observation::Cancelled => return,
        };

        if !rule.is_triggered_by(bar.close) {
            report.pending += 1;
            if self.status_events {
                self.sink.emit(DisplayEvent::AlertStatus {
                    rule,
                    observed_price: bar.close,
                });
            }
            return;
        }

        // Cancelled since the snapshot: nothing to fire.
        let Some(rule) = self.registry.retire(rule.id, AlertState::Fired) else {
            return;
        };
        report.fired += 1;
        info!(
            id = %rule.id,
            symbol = %rule.symbol,
            target = rule.target_price,
            observed = bar.close,
            "alert fired"
        );
        self.sink.emit(DisplayEvent::AlertFired(AlertEvent {
            rule,
            observed_price: bar.close,
            observed_at: bar.timestamp,
        }));
    }

    /// Poll until stopped or until no active rules remain.
    ///
    /// The token is checked before every cycle, before every fetch and right
    /// after each wait, and the feed sees it between retries. A token raised
    /// before the call means zero fetches.
    /// The registry's watcher slot is free again once this returns.
    pub fn run(&self, poll_interval: Duration, stop: &StopToken) -> RunExit {
        info!(
            feed = self.feed.name(),
            poll_secs = poll_interval.as_secs_f64(),
            "alert monitoring started"
        );
        let exit = loop {
            if stop.is_stopped() {
                break RunExit::Cancelled;
            }
            if self.registry.release_watch_if_empty() {
                break RunExit::Drained;
            }
            self.cycle(Some(stop));
            if stop.is_stopped() {
                break RunExit::Cancelled;
            }
            if self.registry.release_watch_if_empty() {
                break RunExit::Drained;
            }
            if stop.wait_timeout(poll_interval) {
                break RunExit::Cancelled;
            }
        };
        if exit == RunExit::Cancelled {
            self.registry.release_watch();
        }
        info!(?exit, "alert monitoring stopped");
        self.sink.emit(DisplayEvent::MonitoringStopped(exit));
        exit
    }
}
