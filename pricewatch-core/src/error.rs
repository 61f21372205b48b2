//! Error taxonomy shared by every component.
//!
//! Each module keeps its own `thiserror` enum; `ErrorKind` is the coarse
//! classification the session and display layers branch on.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Upstream returned nothing or failed. Recoverable, retried next cycle.
    FeedUnavailable,
    /// Rejected user input. No state changed.
    InvalidAlert,
    /// Not enough rows to train or predict.
    InsufficientData,
    /// Clean shutdown of the evaluator loop. Not a failure.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::FeedUnavailable => "feed unavailable",
            ErrorKind::InvalidAlert => "invalid alert",
            ErrorKind::InsufficientData => "insufficient data",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
