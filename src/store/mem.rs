//! In-memory domain map backed by DashMap.
//!
//! Per-key locking for concurrent readers and writers, plus a separate
//! definition-order list so iteration (and therefore routing tie-breaks) is
//! deterministic.

use std::sync::RwLock;

use dashmap::DashMap;

use crate::concept::Domain;

/// Concurrent map of domains keyed by id, iterated in definition order.
#[derive(Debug, Default)]
pub struct DomainMap {
    data: DashMap<String, Domain>,
    order: RwLock<Vec<String>>,
}

impl DomainMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a domain. A replaced domain keeps its position.
    pub fn insert(&self, domain: Domain) {
        let id = domain.id.clone();
        if self.data.insert(id.clone(), domain).is_none() {
            self.order.write().expect("domain order lock poisoned").push(id);
        }
    }

    /// Get a clone of a domain.
    pub fn get(&self, id: &str) -> Option<Domain> {
        self.data.get(id).map(|d| d.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    /// Mutate a domain in place under its shard lock.
    ///
    /// Returns `None` when the domain does not exist.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut Domain) -> R) -> Option<R> {
        self.data.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Domain ids in definition order.
    pub fn ids(&self) -> Vec<String> {
        self.order.read().expect("domain order lock poisoned").clone()
    }

    /// Clones of every domain in definition order.
    pub fn all(&self) -> Vec<Domain> {
        self.ids().iter().filter_map(|id| self.get(id)).collect()
    }

    /// Id of the first domain (definition order) whose concept set holds `concept`.
    pub fn owner_of(&self, concept: &str) -> Option<String> {
        self.ids().into_iter().find(|id| {
            self.data
                .get(id)
                .is_some_and(|d| d.concepts.contains(concept))
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total concepts across all domains.
    pub fn concept_count(&self) -> usize {
        self.data.iter().map(|d| d.concepts.len()).sum()
    }
}
