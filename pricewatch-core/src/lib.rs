//! PriceWatch Core: price feeds, direction classifier, price alerts.
//!
//! This crate contains everything a session needs apart from the display:
//! - Domain types (bars, periods, intervals, ids)
//! - Price feed adapters (Yahoo chart API, CSV files, in-memory)
//! - Feature builder (daily return, moving averages, movement label)
//! - Seeded random-forest direction classifier with hold-out evaluation
//! - Alert registry, evaluation cycle and cancellable background monitor
//! - Typed display events

pub mod alerts;
pub mod classifier;
pub mod domain;
pub mod error;
pub mod events;
pub mod features;
pub mod feed;
pub mod fingerprint;
pub mod rng;

pub use error::ErrorKind;
