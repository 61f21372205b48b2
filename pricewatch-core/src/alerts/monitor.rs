//! Background thread that runs the polling loop.

use super::evaluator::{AlertEvaluator, RunExit};
use super::stop::StopToken;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

pub struct Monitor;

impl Monitor {
    /// Run `evaluator` on a named background thread.
    pub fn spawn(evaluator: AlertEvaluator, poll_interval: Duration) -> io::Result<MonitorHandle> {
        let stop = StopToken::new();
        let token = stop.clone();
        let handle = thread::Builder::new()
            .name("pricewatch-monitor".into())
            .spawn(move || evaluator.run(poll_interval, &token))?;
        Ok(MonitorHandle {
            stop,
            handle: Some(handle),
        })
    }
}

/// Owns the monitor thread. Dropping the handle stops and joins it.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: StopToken,
    handle: Option<JoinHandle<RunExit>>,
}

impl MonitorHandle {
    /// True once the loop has exited on its own or been stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Raise the stop token and wait for the loop to exit.
    ///
    /// A loop that already drained reports `Drained`.
    pub fn stop(mut self) -> RunExit {
        self.shutdown()
    }

    fn shutdown(&mut self) -> RunExit {
        self.stop.stop();
        let Some(handle) = self.handle.take() else {
            return RunExit::Cancelled;
        };
        handle.join().unwrap_or_else(|_| {
            warn!("monitor thread panicked");
            RunExit::Cancelled
        })
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertRegistry;
    use crate::events::RecordingSink;
    use crate::feed::MemoryFeed;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn stop_interrupts_a_long_wait() {
        let registry = Arc::new(AlertRegistry::new());
        registry.add("SPY", 1_000.0).unwrap();
        let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[10.0]));
        let evaluator = AlertEvaluator::new(registry, feed.clone(), Arc::new(RecordingSink::new()));

        let handle = Monitor::spawn(evaluator, Duration::from_secs(3600)).unwrap();
        let start = Instant::now();
        while feed.fetch_count() == 0 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(handle.stop(), RunExit::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(feed.fetch_count(), 1);
    }

    #[test]
    fn finishes_on_its_own_when_drained() {
        let registry = Arc::new(AlertRegistry::new());
        registry.add("SPY", 1.0).unwrap();
        let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[10.0]));
        let sink = Arc::new(RecordingSink::new());
        let evaluator = AlertEvaluator::new(registry.clone(), feed, sink.clone());

        let handle = Monitor::spawn(evaluator, Duration::from_millis(10)).unwrap();
        let start = Instant::now();
        while !handle.is_finished() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.stop(), RunExit::Drained);
        assert!(registry.is_empty());
        assert_eq!(sink.fired().len(), 1);
    }

    #[test]
    fn cloned_token_stops_the_loop_from_elsewhere() {
        let registry = Arc::new(AlertRegistry::new());
        registry.add("SPY", 1_000.0).unwrap();
        let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[10.0]));
        let evaluator = AlertEvaluator::new(registry, feed, Arc::new(RecordingSink::new()));

        let handle = Monitor::spawn(evaluator, Duration::from_secs(3600)).unwrap();
        let token = handle.stop_token();
        thread::spawn(move || token.stop()).join().unwrap();

        let start = Instant::now();
        while !handle.is_finished() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_finished());
        assert_eq!(handle.stop(), RunExit::Cancelled);
    }
}
