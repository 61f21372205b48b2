//! BDD tests for the session context.
//!
//! These tests verify the flow a display surface drives:
//! - Selecting a symbol loads data and a prediction (or reports why not)
//! - Submitting an alert starts monitoring; fired alerts reach the sink
//! - Stopping monitoring keeps rules; dropping the session stops the monitor
//! - Sessions never share alert state

use pricewatch_core::alerts::{AlertState, RunExit};
use pricewatch_core::domain::Period;
use pricewatch_core::events::{DisplayEvent, RecordingSink};
use pricewatch_core::feed::csv_file::write_bars;
use pricewatch_core::feed::{bars_from_closes, CsvFeed, MemoryFeed};
use pricewatch_session::{Session, WatchConfig};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn zigzag(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + (i % 3) as f64 * 0.4)
        .collect()
}

fn fast_config() -> WatchConfig {
    let mut config = WatchConfig::default();
    config.classifier.n_trees = 10;
    config.alerts.poll_interval_secs = 1;
    config
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn bdd_scenario_select_symbol_loads_data_then_prediction() {
    // GIVEN a feed with 200 daily closes for SPY
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &zigzag(200)));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());

    // WHEN the user picks SPY over two years
    session.select_time_range(Period::TwoYears).unwrap();
    let report = session.select_symbol("SPY").unwrap();

    // THEN the full series loads and a label is predicted
    assert_eq!(report.bars, 200);
    assert_eq!(report.period, Period::TwoYears);
    let label = report.prediction.expect("enough rows to train");

    let events = sink.events();
    assert!(matches!(&events[0], DisplayEvent::DataLoaded { bars, .. } if bars.len() == 200));
    match &events[1] {
        DisplayEvent::PredictionReady {
            symbol,
            label: emitted,
            evaluation,
        } => {
            assert_eq!(symbol, "SPY");
            assert_eq!(*emitted, label);
            assert_eq!(evaluation.train_rows + evaluation.test_rows, 200 - 9);
        }
        other => panic!("expected PredictionReady, got {other:?}"),
    }
}

#[test]
fn bdd_scenario_short_history_reports_prediction_unavailable() {
    // GIVEN only eleven closes
    let feed = Arc::new(MemoryFeed::new().with_closes(
        "SPY",
        &[100.0, 101.0, 99.0, 100.5, 100.5, 100.5, 100.5, 100.5, 100.5, 100.5, 100.5],
    ));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());

    // WHEN the symbol is selected over six months
    session.select_time_range(Period::SixMonths).unwrap();
    let report = session.select_symbol("SPY").unwrap();

    // THEN data loads but the prediction is unavailable, not an error
    assert_eq!(report.bars, 11);
    assert_eq!(report.prediction, None);
    assert!(matches!(
        sink.events().last(),
        Some(DisplayEvent::PredictionUnavailable { reason, .. }) if reason.contains("insufficient data")
    ));
}

#[test]
fn bdd_scenario_reselecting_reuses_the_trained_model() {
    // GIVEN a session that already predicted for SPY
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &zigzag(120)));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());
    session.select_time_range(Period::FiveYears).unwrap();
    let first = session.select_symbol("SPY").unwrap();

    // WHEN the same data is loaded again
    let second = session.refresh().unwrap();

    // THEN the prediction and its evaluation are identical
    assert_eq!(first.prediction, second.prediction);
    let evaluations: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DisplayEvent::PredictionReady { evaluation, .. } => Some(evaluation),
            _ => None,
        })
        .collect();
    assert_eq!(evaluations.len(), 2);
    assert_eq!(evaluations[0], evaluations[1]);
}

#[test]
fn bdd_scenario_submitted_alert_fires_through_the_monitor() {
    // GIVEN SPY trading at 100.5
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[99.0, 100.5]));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());
    session.select_symbol("SPY").unwrap();

    // WHEN the user sets alerts at 100 and 200
    let low = session.submit_alert(100.0).unwrap();
    let high = session.submit_alert(200.0).unwrap();
    assert!(session.is_monitoring());

    // THEN the 100 alert fires from the background monitor
    assert!(wait_until(|| !sink.fired().is_empty()));
    let fired = sink.fired();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].rule.id, low.id);
    assert_eq!(fired[0].observed_price, 100.5);

    // AND the 200 alert stays active
    assert_eq!(session.active_alerts(), vec![high.clone()]);
    assert_eq!(session.registry().state(high.id), Some(AlertState::Active));

    // WHEN monitoring is stopped
    assert_eq!(session.stop_monitoring(), Some(RunExit::Cancelled));

    // THEN the rule remains for later
    assert!(!session.is_monitoring());
    assert_eq!(session.active_alerts().len(), 1);
}

#[test]
fn bdd_scenario_stopped_monitoring_can_resume() {
    // GIVEN a session whose monitor was stopped with a pending alert
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[100.0]));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed.clone(), sink.clone());
    session.select_symbol("SPY").unwrap();
    session.submit_alert(105.0).unwrap();
    assert!(wait_until(|| feed.fetch_count() >= 2));
    session.stop_monitoring();
    let fetches = feed.fetch_count();

    // WHEN the price moves while monitoring is off
    feed.push_close("SPY", 110.0);
    thread::sleep(Duration::from_millis(30));

    // THEN nothing is fetched and nothing fires
    assert_eq!(feed.fetch_count(), fetches);
    assert!(sink.fired().is_empty());

    // WHEN monitoring resumes
    session.start_monitoring().unwrap();

    // THEN the pending alert fires and the monitor drains
    assert!(wait_until(|| !sink.fired().is_empty()));
    assert!(wait_until(|| !session.is_monitoring()));
    assert!(session.active_alerts().is_empty());
}

#[test]
fn bdd_scenario_new_alert_after_drain_restarts_monitoring() {
    // GIVEN a monitor that drained after its only alert fired
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[100.0]));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());
    session.select_symbol("SPY").unwrap();
    session.submit_alert(50.0).unwrap();
    assert!(wait_until(|| !session.is_monitoring()));

    // WHEN another met alert is submitted
    session.submit_alert(60.0).unwrap();

    // THEN a fresh monitor fires it as well
    assert!(wait_until(|| sink.fired().len() == 2));
}

#[test]
fn bdd_scenario_cancelled_alert_is_reported() {
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[100.0]));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed, sink.clone());
    session.select_symbol("SPY").unwrap();

    // GIVEN a pending alert
    let rule = session.submit_alert(500.0).unwrap();

    // WHEN it is cancelled
    let cancelled = session.cancel_alert(rule.id).unwrap();

    // THEN it leaves the active set and the display is told
    assert_eq!(cancelled.id, rule.id);
    assert!(session.active_alerts().is_empty());
    assert!(sink
        .events()
        .contains(&DisplayEvent::AlertCancelled(rule.clone())));

    // AND cancelling again is rejected
    assert!(session.cancel_alert(rule.id).is_err());
}

#[test]
fn bdd_scenario_dropping_session_stops_its_monitor() {
    // GIVEN a session polling a never-met alert
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[100.0]));
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(fast_config(), feed.clone(), sink.clone());
    session.select_symbol("SPY").unwrap();
    session.submit_alert(1_000.0).unwrap();
    assert!(wait_until(|| feed.fetch_count() >= 2));

    // WHEN the session is dropped
    drop(session);

    // THEN the monitor reported a clean stop and polling ceased
    assert_eq!(
        sink.events().last(),
        Some(&DisplayEvent::MonitoringStopped(RunExit::Cancelled))
    );
    let fetches = feed.fetch_count();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(feed.fetch_count(), fetches);
}

#[test]
fn bdd_scenario_sessions_do_not_share_alerts() {
    let feed = Arc::new(MemoryFeed::new().with_closes("SPY", &[100.0]));
    let mut a = Session::new(fast_config(), feed.clone(), Arc::new(RecordingSink::new()));
    let mut b = Session::new(fast_config(), feed, Arc::new(RecordingSink::new()));
    a.select_symbol("SPY").unwrap();
    b.select_symbol("SPY").unwrap();

    a.submit_alert(1_000.0).unwrap();

    assert_eq!(a.active_alerts().len(), 1);
    assert!(b.active_alerts().is_empty());
}

#[test]
fn bdd_scenario_csv_history_with_file_config() {
    // GIVEN a config file and a CSV directory holding SPY history
    let dir = tempfile::tempdir().unwrap();
    write_bars(&dir.path().join("SPY.csv"), &bars_from_closes(&zigzag(400))).unwrap();
    let config_path = dir.path().join("pricewatch.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "[classifier]\nn_trees = 5\n\n[features]\nthreshold = 0.01").unwrap();

    let config = WatchConfig::from_file(&config_path).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let mut session = Session::new(config, Arc::new(CsvFeed::new(dir.path())), sink);

    // WHEN six months of SPY is requested
    session.select_time_range(Period::SixMonths).unwrap();
    let report = session.select_symbol("spy").unwrap();

    // THEN the series is trimmed to the period and a prediction is made
    assert_eq!(report.bars, 183);
    assert!(report.prediction.is_some());
}
