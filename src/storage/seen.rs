use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Listing signature used as the de-duplication key.
pub type SeenItemId = String;

/// Insertion-ordered set of item ids capped at `capacity`.
///
/// Once full, recording a new id evicts the oldest recorded one. Recording an
/// id that is already present changes nothing, including its position.
#[derive(Debug, Clone)]
pub struct SeenItemStore {
    capacity: usize,
    members: HashSet<SeenItemId>,
    order: VecDeque<SeenItemId>,
}

impl SeenItemStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            members: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Rebuild a store from a snapshot, keeping the newest `capacity` ids.
    pub fn load<I>(ids: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = SeenItemId>,
    {
        let mut store = Self::new(capacity);
        for id in ids {
            store.record(id);
        }
        store
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Returns `true` if the id was newly inserted.
    pub fn record(&mut self, id: SeenItemId) -> bool {
        if self.members.contains(&id) {
            return false;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                debug!("Evicting oldest seen item {}", oldest);
                self.members.remove(&oldest);
            }
        }

        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    /// Owned copy of the ids in insertion order.
    pub fn snapshot(&self) -> Vec<SeenItemId> {
        self.order.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
