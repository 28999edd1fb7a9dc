//! # Kagami Mapping
//!
//! Bidirectional identity map from source entity ids to target entity ids.
//! Presence in the cache is the single source of truth for "already copied":
//! it is both the idempotence mechanism and, transitively, the recursion
//! termination mechanism of the replication engine. Entries are appended on
//! every successful creation and never removed during a process lifetime;
//! at startup the cache is rebuilt from provenance links persisted on the
//! target instance.

use kagami_core::EntityId;
use serde::Serialize;
use std::collections::HashMap;

/// Where a source id ended up on the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Mapped {
    /// Copied; the target-side id
    Target(EntityId),
    /// Permanently rejected (the target did not recognize its datatype)
    Invalid,
}

impl Mapped {
    /// The target id, if the entity was actually copied
    pub fn target(&self) -> Option<&EntityId> {
        match self {
            Mapped::Target(id) => Some(id),
            Mapped::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Mapped::Invalid)
    }
}

/// The source-id to target-id identity table
#[derive(Debug, Default, Clone, Serialize)]
pub struct MappingCache {
    forward: HashMap<EntityId, Mapped>,
    reverse: HashMap<EntityId, EntityId>,
}

impl MappingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of source ids with an entry
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Whether the source id has any entry (copied or invalid)
    pub fn contains(&self, source: &EntityId) -> bool {
        self.forward.contains_key(source)
    }

    /// Look up the mapping of a source id
    pub fn get(&self, source: &EntityId) -> Option<&Mapped> {
        self.forward.get(source)
    }

    /// Target id of a copied source id
    pub fn target_of(&self, source: &EntityId) -> Option<&EntityId> {
        self.forward.get(source).and_then(Mapped::target)
    }

    /// Source id a target id was copied from
    pub fn source_of(&self, target: &EntityId) -> Option<&EntityId> {
        self.reverse.get(target)
    }

    /// Insert a mapping if the source id has none yet and return the
    /// canonical target id; an existing mapping always wins, which keeps
    /// replication idempotent even if two code paths race to create the
    /// same entity.
    pub fn insert_target(&mut self, source: EntityId, target: EntityId) -> EntityId {
        if let Some(Mapped::Target(existing)) = self.forward.get(&source) {
            return existing.clone();
        }
        self.forward
            .insert(source.clone(), Mapped::Target(target.clone()));
        self.reverse.insert(target.clone(), source);
        target
    }

    /// Mark a source id as permanently invalid unless it is already mapped
    pub fn mark_invalid(&mut self, source: EntityId) {
        self.forward.entry(source).or_insert(Mapped::Invalid);
    }

    /// Rebuild entries from persisted (source, target) pairs; returns how
    /// many entries were inserted
    pub fn hydrate<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (EntityId, EntityId)>,
    {
        let before = self.forward.len();
        for (source, target) in pairs {
            self.insert_target(source, target);
        }
        self.forward.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    #[test]
    fn test_insert_if_absent_keeps_first_mapping() {
        let mut cache = MappingCache::new();
        let first = cache.insert_target(id("Q1"), id("Q100"));
        assert_eq!(first, id("Q100"));

        // a later insert for the same source reuses the existing target
        let second = cache.insert_target(id("Q1"), id("Q200"));
        assert_eq!(second, id("Q100"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.target_of(&id("Q1")), Some(&id("Q100")));
        assert_eq!(cache.source_of(&id("Q100")), Some(&id("Q1")));
    }

    #[test]
    fn test_invalid_entries_short_circuit() {
        let mut cache = MappingCache::new();
        cache.mark_invalid(id("P99"));
        assert!(cache.contains(&id("P99")));
        assert_eq!(cache.target_of(&id("P99")), None);
        assert!(cache.get(&id("P99")).unwrap().is_invalid());
    }

    #[test]
    fn test_mark_invalid_does_not_clobber_mapping() {
        let mut cache = MappingCache::new();
        cache.insert_target(id("P1"), id("P7"));
        cache.mark_invalid(id("P1"));
        assert_eq!(cache.target_of(&id("P1")), Some(&id("P7")));
    }

    #[test]
    fn test_hydrate_from_persisted_pairs() {
        let mut cache = MappingCache::new();
        let inserted = cache.hydrate(vec![
            (id("Q1"), id("Q100")),
            (id("P31"), id("P2")),
            (id("Q1"), id("Q999")), // duplicate row loses
        ]);
        assert_eq!(inserted, 2);
        assert_eq!(cache.target_of(&id("Q1")), Some(&id("Q100")));
        assert_eq!(cache.target_of(&id("P31")), Some(&id("P2")));
    }
}
