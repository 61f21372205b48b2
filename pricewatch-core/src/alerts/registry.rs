//! Session-owned set of active alert rules.

use super::rule::{AlertError, AlertRule, AlertState};
use crate::domain::AlertId;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Retired rules whose terminal state is remembered, newest kept.
pub const RETIRED_HISTORY: usize = 1024;

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    /// Active rules in insertion order.
    active: Vec<AlertRule>,
    /// Terminal state of the last `RETIRED_HISTORY` rules to leave the
    /// active set.
    retired: HashMap<AlertId, AlertState>,
    /// Retirement order, oldest first.
    retired_order: VecDeque<AlertId>,
    /// A monitor is polling this registry.
    watched: bool,
}

/// Active alert rules behind a single lock.
///
/// Shared by reference between the interaction side (`add`, `cancel`) and
/// the evaluator. Every mutation happens under the one mutex, and no lock is
/// held across a feed fetch.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    state: Mutex<RegistryState>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new active rule. Duplicates are allowed.
    pub fn add(&self, symbol: &str, target_price: f64) -> Result<AlertRule, AlertError> {
        if !target_price.is_finite() || target_price < 0.0 {
            return Err(AlertError::InvalidTarget { target_price });
        }

        let mut state = self.lock();
        state.next_id += 1;
        let rule = AlertRule {
            id: AlertId(state.next_id),
            symbol: symbol.to_string(),
            target_price,
            created_at: Utc::now(),
        };
        state.active.push(rule.clone());
        drop(state);

        info!(id = %rule.id, symbol = %rule.symbol, target = rule.target_price, "alert added");
        Ok(rule)
    }

    /// Snapshot of active rules, oldest first.
    pub fn list_active(&self) -> Vec<AlertRule> {
        self.lock().active.clone()
    }

    pub fn get(&self, id: AlertId) -> Option<AlertRule> {
        self.lock().active.iter().find(|r| r.id == id).cloned()
    }

    /// Lifecycle state of a rule this registry issued. `None` for unknown
    /// ids and for rules retired more than `RETIRED_HISTORY` retirements ago.
    pub fn state(&self, id: AlertId) -> Option<AlertState> {
        let state = self.lock();
        if state.active.iter().any(|r| r.id == id) {
            return Some(AlertState::Active);
        }
        state.retired.get(&id).copied()
    }

    /// `Active -> Cancelled`. Unknown or already-retired ids are rejected.
    pub fn cancel(&self, id: AlertId) -> Result<AlertRule, AlertError> {
        let rule = self
            .retire(id, AlertState::Cancelled)
            .ok_or(AlertError::UnknownAlert { id })?;
        info!(id = %rule.id, symbol = %rule.symbol, "alert cancelled");
        Ok(rule)
    }

    /// Move a still-active rule to `to`. The caller that gets `Some` owns
    /// the transition, which is what makes firing at-most-once.
    pub(crate) fn retire(&self, id: AlertId, to: AlertState) -> Option<AlertRule> {
        let mut state = self.lock();
        let pos = state.active.iter().position(|r| r.id == id)?;
        let rule = state.active.remove(pos);
        state.retired.insert(id, to);
        state.retired_order.push_back(id);
        if state.retired_order.len() > RETIRED_HISTORY {
            if let Some(oldest) = state.retired_order.pop_front() {
                state.retired.remove(&oldest);
            }
        }
        Some(rule)
    }

    /// Claim the single watcher slot. `false` means a monitor already holds
    /// it and will see any rule added before this call.
    pub fn acquire_watch(&self) -> bool {
        !std::mem::replace(&mut self.lock().watched, true)
    }

    /// Release the watcher slot if no rules remain, atomically with the
    /// emptiness check.
    pub fn release_watch_if_empty(&self) -> bool {
        let mut state = self.lock();
        if state.active.is_empty() {
            state.watched = false;
            true
        } else {
            false
        }
    }

    pub fn release_watch(&self) {
        self.lock().watched = false;
    }

    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
