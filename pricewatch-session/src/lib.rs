//! PriceWatch Session: the context a display surface drives.
//!
//! A [`Session`] holds the current symbol and period, loads history and a
//! direction prediction on selection, and owns the alert registry plus the
//! background monitor that polls it. Configuration comes from TOML
//! ([`WatchConfig`]); [`init_logging`] installs the `tracing` subscriber.

pub mod config;
pub mod logging;
pub mod session;

pub use config::{AlertConfig, ConfigError, LoggingConfig, WatchConfig};
pub use logging::init_logging;
pub use session::{LoadReport, Session, SessionError};
