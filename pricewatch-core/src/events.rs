//! Events the core reports to the display surface.
//!
//! The core never formats markup; it emits typed events and the display
//! surface decides how to render them.

use crate::alerts::{AlertEvent, AlertRule, RunExit};
use crate::classifier::Evaluation;
use crate::domain::{Bar, Period};
use crate::features::Movement;
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    DataLoaded {
        symbol: String,
        period: Period,
        bars: Vec<Bar>,
    },
    PredictionReady {
        symbol: String,
        label: Movement,
        evaluation: Evaluation,
    },
    PredictionUnavailable {
        symbol: String,
        reason: String,
    },
    AlertAdded(AlertRule),
    AlertCancelled(AlertRule),
    AlertFired(AlertEvent),
    /// Observed price for a rule that did not fire this cycle.
    AlertStatus {
        rule: AlertRule,
        observed_price: f64,
    },
    FeedError {
        symbol: String,
        message: String,
    },
    MonitoringStopped(RunExit),
}

/// Where events go. Implementations must not block for long; the evaluator
/// calls them from its polling loop.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DisplayEvent);
}

/// A disconnected receiver drops events silently.
impl EventSink for Sender<DisplayEvent> {
    fn emit(&self, event: DisplayEvent) {
        let _ = self.send(event);
    }
}

/// Sink that keeps every event, for tests and headless use.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<DisplayEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn fired(&self) -> Vec<AlertEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::AlertFired(event) => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DisplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DisplayEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn sender_sink_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel::<DisplayEvent>();
        tx.emit(DisplayEvent::FeedError {
            symbol: "SPY".into(),
            message: "down".into(),
        });
        assert_eq!(rx.try_iter().count(), 1);
        drop(rx);
        tx.emit(DisplayEvent::MonitoringStopped(RunExit::Drained));
    }

    #[test]
    fn recording_sink_take_empties() {
        let sink = RecordingSink::new();
        sink.emit(DisplayEvent::MonitoringStopped(RunExit::Cancelled));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.events().is_empty());
        assert!(sink.fired().is_empty());
    }
}
