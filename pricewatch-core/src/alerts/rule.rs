use crate::domain::AlertId;
use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("invalid alert: target price {target_price} must be a finite, non-negative number")]
    InvalidTarget { target_price: f64 },

    #[error("invalid alert: {id} is not active")]
    UnknownAlert { id: AlertId },
}

impl AlertError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidAlert
    }
}

/// "Tell me when `symbol` trades at or above `target_price`."
///
/// Two rules with the same symbol and target are distinct entries; `id`
/// tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: AlertId,
    pub symbol: String,
    pub target_price: f64,
    pub created_at: DateTime<Utc>,
}

impl AlertRule {
    pub fn is_triggered_by(&self, observed_price: f64) -> bool {
        observed_price >= self.target_price
    }
}

/// A rule that fired. Emitted once, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule: AlertRule,
    pub observed_price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Lifecycle of a rule. Only `Active` rules live in the registry; the other
/// two states are terminal and the rule is removed on entering them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertState {
    Active,
    Fired,
    Cancelled,
}
