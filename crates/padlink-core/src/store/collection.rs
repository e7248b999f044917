// ── Generic ordered entity collection ──
//
// Arena of entities indexed by id, iterated in insertion order. Owned by a
// single registry, so mutation takes `&mut self`; the registry decides when
// to publish a snapshot to its subscribers.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::EntityId;

/// Ordered storage for a single entity type.
///
/// Entities are held behind `Arc` so snapshots are cheap to hand out;
/// updates are copy-on-write via `Arc::make_mut`. Every mutation bumps a
/// version counter.
pub(crate) struct EntityCollection<T: Clone> {
    entries: IndexMap<EntityId, Arc<T>>,
    version: u64,
}

impl<T: Clone> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            version: 0,
        }
    }

    /// Insert or replace an entity. Returns `true` if the id was new.
    ///
    /// Replacing keeps the entity's original position.
    pub(crate) fn upsert(&mut self, id: EntityId, entity: T) -> bool {
        let is_new = self.entries.insert(id, Arc::new(entity)).is_none();
        self.version += 1;
        is_new
    }

    /// Apply `f` to the entity with `id`, returning the updated value.
    pub(crate) fn update(&mut self, id: &EntityId, f: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let slot = self.entries.get_mut(id)?;
        f(Arc::make_mut(slot));
        self.version += 1;
        Some(Arc::clone(slot))
    }

    /// Remove an entity, preserving the order of the rest.
    pub(crate) fn remove(&mut self, id: &EntityId) -> Option<Arc<T>> {
        let removed = self.entries.shift_remove(id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<&Arc<T>> {
        self.entries.get(id)
    }

    pub(crate) fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Entities in insertion order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_returns_true_for_new_id() {
        let mut col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert(EntityId::from(1_u64), "hello".into()));
        assert!(!col.upsert(EntityId::from(1_u64), "world".into()));
        assert_eq!(**col.get(&EntityId::from(1_u64)).unwrap(), "world");
    }

    #[test]
    fn values_keep_insertion_order_across_removal() {
        let mut col: EntityCollection<&str> = EntityCollection::new();
        col.upsert(EntityId::from(3_u64), "c");
        col.upsert(EntityId::from(1_u64), "a");
        col.upsert(EntityId::from(2_u64), "b");
        col.remove(&EntityId::from(1_u64));

        let order: Vec<&str> = col.values().map(|v| **v).collect();
        assert_eq!(order, vec!["c", "b"]);
    }

    #[test]
    fn update_is_copy_on_write() {
        let mut col: EntityCollection<String> = EntityCollection::new();
        let id = EntityId::from(9_u64);
        col.upsert(id.clone(), "before".into());
        let held = Arc::clone(col.get(&id).unwrap());

        col.update(&id, |s| *s = "after".into());

        assert_eq!(*held, "before");
        assert_eq!(**col.get(&id).unwrap(), "after");
    }

    #[test]
    fn version_bumps_only_on_effective_mutation() {
        let mut col: EntityCollection<u8> = EntityCollection::new();
        col.upsert(EntityId::from(1_u64), 1);
        let v = col.version();
        assert!(col.remove(&EntityId::from(99_u64)).is_none());
        assert!(col.update(&EntityId::from(99_u64), |x| *x = 2).is_none());
        assert_eq!(col.version(), v);
        col.remove(&EntityId::from(1_u64));
        assert!(col.is_empty());
        assert_eq!(col.version(), v + 1);
    }
}
