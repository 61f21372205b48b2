//! The session context driven by the display surface.

use crate::config::WatchConfig;
use pricewatch_core::alerts::{
    AlertError, AlertEvaluator, AlertRegistry, AlertRule, Monitor, MonitorHandle, RunExit,
};
use pricewatch_core::classifier::{ClassifierError, DirectionClassifier, Evaluation, ModelCache};
use pricewatch_core::domain::{AlertId, Bar, Interval, Period};
use pricewatch_core::error::ErrorKind;
use pricewatch_core::events::{DisplayEvent, EventSink};
use pricewatch_core::features::{FeatureBuilder, Movement};
use pricewatch_core::feed::{self, FeedError, PriceFeed};
use pricewatch_core::fingerprint::ModelKey;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("no symbol selected")]
    NoSymbolSelected,

    #[error("failed to start alert monitor: {0}")]
    Monitor(#[from] std::io::Error),
}

impl SessionError {
    /// Coarse classification; `None` for failures outside the core taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::Feed(e) => Some(e.kind()),
            SessionError::Alert(e) => Some(e.kind()),
            SessionError::Classifier(e) => Some(e.kind()),
            SessionError::NoSymbolSelected => Some(ErrorKind::InvalidAlert),
            SessionError::Monitor(_) => None,
        }
    }
}

/// What a load produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub symbol: String,
    pub period: Period,
    pub bars: usize,
    /// `None` when there was too little data to train.
    pub prediction: Option<Movement>,
}

/// One user's view: selection, alerts, and the monitor polling them.
///
/// Owns its registry, so nothing is shared across sessions. Dropping a
/// session stops its monitor.
pub struct Session {
    config: WatchConfig,
    feed: Arc<dyn PriceFeed>,
    sink: Arc<dyn EventSink>,
    registry: Arc<AlertRegistry>,
    models: ModelCache,
    features: FeatureBuilder,
    classifier: DirectionClassifier,
    symbol: Option<String>,
    period: Period,
    monitor: Option<MonitorHandle>,
}

impl Session {
    pub fn new(config: WatchConfig, feed: Arc<dyn PriceFeed>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            features: FeatureBuilder::new(config.features.clone()),
            classifier: DirectionClassifier::new(config.classifier.clone()),
            models: ModelCache::default(),
            registry: Arc::new(AlertRegistry::new()),
            symbol: None,
            period: Period::OneDay,
            monitor: None,
            config,
            feed,
            sink,
        }
    }

    /// Session backed by the Yahoo chart API, configured from `[feed]`.
    pub fn with_yahoo(config: WatchConfig, sink: Arc<dyn EventSink>) -> Result<Self, SessionError> {
        let feed = feed::yahoo_feed(&config.feed)?;
        Ok(Self::new(config, feed, sink))
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn selected_symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    /// Select a symbol and load its history for the current period.
    pub fn select_symbol(&mut self, symbol: &str) -> Result<LoadReport, SessionError> {
        self.symbol = Some(symbol.trim().to_ascii_uppercase());
        self.refresh()
    }

    /// Change the period; reloads when a symbol is selected.
    pub fn select_time_range(&mut self, period: Period) -> Result<Option<LoadReport>, SessionError> {
        self.period = period;
        if self.symbol.is_none() {
            return Ok(None);
        }
        self.refresh().map(Some)
    }

    /// Refetch the selection and re-predict.
    ///
    /// A feed failure is reported as a `FeedError` event and returned. Too
    /// little data for a prediction is not an error.
    pub fn refresh(&mut self) -> Result<LoadReport, SessionError> {
        let symbol = self.symbol.clone().ok_or(SessionError::NoSymbolSelected)?;
        let period = self.period;

        debug!(%symbol, %period, feed = self.feed.name(), "loading history");
        let bars = match self.feed.fetch(&symbol, period) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(%symbol, %period, error = %e, "history fetch failed");
                self.sink.emit(DisplayEvent::FeedError {
                    symbol: symbol.clone(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let n_bars = bars.len();
        self.sink.emit(DisplayEvent::DataLoaded {
            symbol: symbol.clone(),
            period,
            bars: bars.clone(),
        });

        let prediction = match self.predict(&symbol, period, &bars) {
            Ok((label, evaluation)) => {
                self.sink.emit(DisplayEvent::PredictionReady {
                    symbol: symbol.clone(),
                    label,
                    evaluation,
                });
                Some(label)
            }
            Err(e) => {
                debug!(%symbol, reason = %e, "prediction unavailable");
                self.sink.emit(DisplayEvent::PredictionUnavailable {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
                None
            }
        };

        Ok(LoadReport {
            symbol,
            period,
            bars: n_bars,
            prediction,
        })
    }

    fn predict(
        &self,
        symbol: &str,
        period: Period,
        bars: &[Bar],
    ) -> Result<(Movement, Evaluation), ClassifierError> {
        let rows = self.features.build(bars);
        let settings = (&self.config.features, &self.config.classifier);
        let model = match ModelKey::new(symbol, period, bars, &settings) {
            Ok(key) => self
                .models
                .get_or_train(key, || self.classifier.train(&rows))?,
            Err(e) => {
                warn!(%symbol, error = %e, "settings not hashable, training without cache");
                Arc::new(self.classifier.train(&rows)?)
            }
        };
        let label = model.predict_latest(&rows)?;
        Ok((label, model.evaluation().clone()))
    }

    /// Add an alert on the selected symbol and make sure it is being polled.
    pub fn submit_alert(&mut self, target_price: f64) -> Result<AlertRule, SessionError> {
        let symbol = self.symbol.clone().ok_or(SessionError::NoSymbolSelected)?;
        let rule = self.registry.add(&symbol, target_price)?;
        self.sink.emit(DisplayEvent::AlertAdded(rule.clone()));
        self.ensure_monitor()?;
        Ok(rule)
    }

    pub fn cancel_alert(&mut self, id: AlertId) -> Result<AlertRule, SessionError> {
        let rule = self.registry.cancel(id)?;
        self.sink.emit(DisplayEvent::AlertCancelled(rule.clone()));
        Ok(rule)
    }

    pub fn active_alerts(&self) -> Vec<AlertRule> {
        self.registry.list_active()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_finished())
    }

    /// Stop and join the monitor. Active rules stay registered and resume
    /// being polled on the next `submit_alert` or `start_monitoring`.
    pub fn stop_monitoring(&mut self) -> Option<RunExit> {
        let exit = self.monitor.take()?.stop();
        info!(?exit, "monitoring stopped by session");
        Some(exit)
    }

    /// Resume polling existing rules. A no-op when there are none.
    pub fn start_monitoring(&mut self) -> Result<(), SessionError> {
        if self.registry.is_empty() {
            return Ok(());
        }
        self.ensure_monitor()
    }

    fn ensure_monitor(&mut self) -> Result<(), SessionError> {
        if !self.registry.acquire_watch() {
            return Ok(());
        }
        // The slot was free, so any previous monitor has exited or is exiting.
        if let Some(previous) = self.monitor.take() {
            previous.stop();
        }

        let evaluator = AlertEvaluator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.feed),
            Arc::clone(&self.sink),
        )
        .with_interval(Interval::OneMinute);

        match Monitor::spawn(evaluator, self.config.alerts.poll_interval()) {
            Ok(handle) => {
                self.monitor = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.registry.release_watch();
                Err(e.into())
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
