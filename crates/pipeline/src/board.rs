//! Live entity state and entity lookup.

use parking_lot::RwLock;
use std::sync::Arc;
use tickersim_types::{Entity, EntityId};

/// Read access to entities by key, as producers need it.
pub trait EntityLookup: Send + Sync {
    /// Current copy of the entity with `key`, if it still exists.
    fn find(&self, key: &str) -> Option<Entity>;
}

/// The live entity collection, indexed by [`EntityId`].
///
/// While the simulation runs the applier is its only writer; the controller
/// replaces the whole set only while stopped. Everyone else reads copies.
#[derive(Clone, Default)]
pub struct EntityBoard {
    entities: Arc<RwLock<Vec<Entity>>>,
}

impl EntityBoard {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: Arc::new(RwLock::new(entities)),
        }
    }

    /// Copy of every entity, in index order.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities.read().clone()
    }

    /// Copy of one entity.
    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().get(id.index()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap in a freshly generated entity set.
    pub fn replace(&self, entities: Vec<Entity>) {
        *self.entities.write() = entities;
    }

    /// Run `f` against the entity at `id` under the write lock. Returns
    /// `None` when `id` is out of range.
    pub(crate) fn with_entity_mut<R>(
        &self,
        id: EntityId,
        f: impl FnOnce(&mut Entity) -> R,
    ) -> Option<R> {
        self.entities.write().get_mut(id.index()).map(f)
    }
}

impl EntityLookup for EntityBoard {
    fn find(&self, key: &str) -> Option<Entity> {
        self.entities.read().iter().find(|e| e.key == key).cloned()
    }
}
