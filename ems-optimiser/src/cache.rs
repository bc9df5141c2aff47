use crate::HashMap;
use ems_model::{Allocation, Result};
use std::sync::{Arc, RwLock};

/// Objective values keyed by allocation, shared between evaluation workers.
///
/// Only valid for one instance and utilisation model; entries are never evicted.
#[derive(Clone, Default)]
pub struct ObjectiveCache {
    entries: Arc<RwLock<HashMap<Allocation, f64>>>,
}

impl ObjectiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, allocation: &Allocation) -> Option<f64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(allocation).copied()
    }

    pub fn insert(&self, allocation: Allocation, value: f64) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(allocation, value);
    }

    /// Cached value, or `compute()` stored under `allocation`. Concurrent
    /// misses on the same key may both compute; the last write wins.
    pub fn get_or_insert_with<F>(&self, allocation: &Allocation, compute: F) -> Result<f64>
    where
        F: FnOnce() -> Result<f64>,
    {
        if let Some(value) = self.get(allocation) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(allocation.clone(), value);
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
