//! Bounded buffer of recent observations.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::Observation;

/// Order-preserving FIFO of the most recent observations.
///
/// Serves as the default prediction context when the caller supplies no
/// explicit window. Pushing beyond capacity evicts the oldest entry.
/// Persisted and restored as part of the model snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBuffer {
    entries: VecDeque<Observation>,
    capacity: usize,
}

impl MemoryBuffer {
    /// Create an empty buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an observation, evicting the oldest when full.
    pub fn push(&mut self, observation: Observation) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(observation);
    }

    /// The last `n` observations in insertion order (oldest first), or all
    /// of them when fewer are held.
    pub fn window(&self, n: usize) -> Vec<Observation> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries, keeping the capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over held observations, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }
}
