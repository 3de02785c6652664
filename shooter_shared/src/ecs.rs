//! Entity/component registry (minimal ECS).
//!
//! This is a deliberately small ECS suitable for an authoritative tick-based
//! simulation. It is not archetype-based; instead it uses typed component
//! storages keyed by entity id, all hidden behind one type-erased interface
//! so that destroying an entity can purge every storage without knowing the
//! component types involved.

use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
};

use serde::{Deserialize, Serialize};

/// Opaque entity id. Unique while the entity is alive; recycled after destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Minimal object-safe surface every typed storage exposes, so the registry
/// can purge an entity from all storages on destroy.
trait ComponentStorage: Any + Send + Sync {
    fn remove_entity(&mut self, id: EntityId);
    fn has_entity(&self, id: EntityId) -> bool;
    fn count(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedStorage<T> {
    components: HashMap<EntityId, T>,
}

impl<T> Default for TypedStorage<T> {
    fn default() -> Self {
        Self {
            components: HashMap::new(),
        }
    }
}

impl<T: 'static + Send + Sync> ComponentStorage for TypedStorage<T> {
    fn remove_entity(&mut self, id: EntityId) {
        self.components.remove(&id);
    }

    fn has_entity(&self, id: EntityId) -> bool {
        self.components.contains_key(&id)
    }

    fn count(&self) -> usize {
        self.components.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sparse, type-indexed component store with id recycling.
#[derive(Default)]
pub struct Registry {
    storages: HashMap<TypeId, Box<dyn ComponentStorage>>,
    free_ids: Vec<EntityId>,
    active: HashSet<EntityId>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Creates a new entity, recycling a previously destroyed id if any.
    pub fn create(&mut self) -> EntityId {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            let id = EntityId(self.next_id.max(1));
            self.next_id = id.0 + 1;
            id
        });
        self.active.insert(id);
        id
    }

    /// Destroys an entity: removes it from every component storage and
    /// returns the id to the recycling pool. No-op if not alive.
    pub fn destroy(&mut self, id: EntityId) {
        if !self.active.remove(&id) {
            return;
        }
        for storage in self.storages.values_mut() {
            storage.remove_entity(id);
        }
        self.free_ids.push(id);
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.active.contains(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.active.len()
    }

    /// Inserts/replaces a component for an entity.
    pub fn insert<T: 'static + Send + Sync>(&mut self, id: EntityId, component: T) {
        self.storage_mut::<T>().components.insert(id, component);
    }

    /// Gets a component reference, or `None` if absent.
    pub fn get<T: 'static + Send + Sync>(&self, id: EntityId) -> Option<&T> {
        self.storage::<T>().and_then(|s| s.components.get(&id))
    }

    /// Gets a mutable component reference, or `None` if absent.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self, id: EntityId) -> Option<&mut T> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any_mut().downcast_mut::<TypedStorage<T>>())
            .and_then(|s| s.components.get_mut(&id))
    }

    pub fn has<T: 'static + Send + Sync>(&self, id: EntityId) -> bool {
        self.storage::<T>()
            .is_some_and(|s| s.components.contains_key(&id))
    }

    pub fn remove<T: 'static + Send + Sync>(&mut self, id: EntityId) {
        if let Some(storage) = self.storages.get_mut(&TypeId::of::<T>()) {
            storage.remove_entity(id);
        }
    }

    pub fn count<T: 'static + Send + Sync>(&self) -> usize {
        self.storage::<T>().map_or(0, |s| s.components.len())
    }

    /// Iterates all holders of one component type (immutable).
    pub fn for_each<T: 'static + Send + Sync>(&self, mut f: impl FnMut(EntityId, &T)) {
        if let Some(s) = self.storage::<T>() {
            for (id, component) in &s.components {
                f(*id, component);
            }
        }
    }

    /// Snapshot of ids holding a component type. Safe to use while mutating
    /// other storages, or even this one, during the walk: callers resolve by
    /// id instead of holding a live reference.
    pub fn ids_with<T: 'static + Send + Sync>(&self) -> Vec<EntityId> {
        self.storage::<T>()
            .map(|s| s.components.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Ids holding both `A` and `B`, probing the smaller storage against the
    /// larger. The probe direction is an optimization, not an order guarantee.
    pub fn join_ids<A, B>(&self) -> Vec<EntityId>
    where
        A: 'static + Send + Sync,
        B: 'static + Send + Sync,
    {
        if self.count::<A>() <= self.count::<B>() {
            self.ids_with::<A>()
                .into_iter()
                .filter(|id| self.has::<B>(*id))
                .collect()
        } else {
            self.ids_with::<B>()
                .into_iter()
                .filter(|id| self.has::<A>(*id))
                .collect()
        }
    }

    /// Ids holding `A`, `B` and `C`.
    pub fn join3_ids<A, B, C>(&self) -> Vec<EntityId>
    where
        A: 'static + Send + Sync,
        B: 'static + Send + Sync,
        C: 'static + Send + Sync,
    {
        self.join_ids::<A, B>()
            .into_iter()
            .filter(|id| self.has::<C>(*id))
            .collect()
    }

    fn storage<T: 'static + Send + Sync>(&self) -> Option<&TypedStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any().downcast_ref::<TypedStorage<T>>())
    }

    fn storage_mut<T: 'static + Send + Sync>(&mut self) -> &mut TypedStorage<T> {
        let boxed = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedStorage::<T>::default()));
        match boxed.as_any_mut().downcast_mut::<TypedStorage<T>>() {
            Some(s) => s,
            // Unreachable: the map is keyed by TypeId::of::<T>().
            None => unreachable!("storage type mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
    }
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel {
        dx: f32,
    }
    struct Tag;

    #[test]
    fn insert_and_get() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.insert(e, Pos { x: 1.0 });
        assert_eq!(reg.get::<Pos>(e).unwrap().x, 1.0);
        assert!(reg.get::<Vel>(e).is_none());
    }

    #[test]
    fn destroy_purges_every_storage_and_recycles() {
        let mut reg = Registry::new();
        let e = reg.create();
        reg.insert(e, Pos { x: 1.0 });
        reg.insert(e, Vel { dx: 2.0 });
        reg.destroy(e);

        assert!(!reg.exists(e));
        assert!(reg.get::<Pos>(e).is_none());
        assert!(reg.get::<Vel>(e).is_none());
        assert!(!reg.has::<Pos>(e));

        // Double destroy is a no-op, so the id is pooled exactly once.
        reg.destroy(e);
        let recycled = reg.create();
        assert_eq!(recycled, e);
        let fresh = reg.create();
        assert_ne!(fresh, recycled);
    }

    #[test]
    fn no_two_alive_entities_share_an_id() {
        let mut reg = Registry::new();
        let mut alive = HashSet::new();
        for round in 0..5u32 {
            for _ in 0..20 {
                let e = reg.create();
                assert!(alive.insert(e), "duplicate live id {e:?}");
            }
            // Destroy every other entity to churn the free list.
            let victims: Vec<_> = alive
                .iter()
                .copied()
                .filter(|e| e.0 % 2 == round % 2)
                .collect();
            for v in victims {
                reg.destroy(v);
                alive.remove(&v);
            }
        }
    }

    #[test]
    fn join_visits_exactly_the_intersection() {
        let mut reg = Registry::new();
        let a = reg.create();
        let b = reg.create();
        let c = reg.create();
        reg.insert(a, Pos { x: 0.0 });
        reg.insert(a, Vel { dx: 0.0 });
        reg.insert(b, Pos { x: 0.0 });
        reg.insert(c, Vel { dx: 0.0 });
        reg.insert(c, Tag);

        let mut both = reg.join_ids::<Pos, Vel>();
        both.sort();
        assert_eq!(both, vec![a]);

        // Same result regardless of which storage is smaller.
        let d = reg.create();
        reg.insert(d, Vel { dx: 1.0 });
        let mut both = reg.join_ids::<Pos, Vel>();
        both.sort();
        let mut flipped = reg.join_ids::<Vel, Pos>();
        flipped.sort();
        assert_eq!(both, flipped);
        assert_eq!(reg.join3_ids::<Pos, Vel, Tag>(), vec![]);
        let _ = b;
    }

    #[test]
    fn id_snapshot_tolerates_structural_changes() {
        let mut reg = Registry::new();
        for _ in 0..4 {
            let e = reg.create();
            reg.insert(e, Pos { x: 0.0 });
        }
        for id in reg.ids_with::<Pos>() {
            // Destroy while walking the snapshot; lookups just turn absent.
            reg.destroy(id);
            assert!(reg.get::<Pos>(id).is_none());
        }
        assert_eq!(reg.count::<Pos>(), 0);
    }
}
