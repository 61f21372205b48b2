//! Trained-model cache keyed by symbol, period and data fingerprint.

use super::model::{ClassifierError, DirectionModel};
use crate::fingerprint::ModelKey;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct CacheState {
    models: HashMap<ModelKey, Arc<DirectionModel>>,
    /// Insertion order, oldest first.
    order: VecDeque<ModelKey>,
}

/// Bounded FIFO cache of trained models.
///
/// A key embeds the data fingerprint, so a refreshed series never hits a
/// stale model.
#[derive(Debug)]
pub struct ModelCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl ModelCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &ModelKey) -> Option<Arc<DirectionModel>> {
        self.lock().models.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, key: ModelKey, model: Arc<DirectionModel>) {
        let mut state = self.lock();
        if state.models.insert(key.clone(), model).is_none() {
            state.order.push_back(key);
        }
        while state.models.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.models.remove(&oldest);
        }
    }

    /// Return the cached model or train one. Training runs outside the lock.
    pub fn get_or_train<F>(&self, key: ModelKey, train: F) -> Result<Arc<DirectionModel>, ClassifierError>
    where
        F: FnOnce() -> Result<DirectionModel, ClassifierError>,
    {
        if let Some(model) = self.get(&key) {
            debug!(symbol = %key.symbol, "model cache hit");
            return Ok(model);
        }
        let model = Arc::new(train()?);
        self.insert(key, Arc::clone(&model));
        Ok(model)
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(16)
    }
}
