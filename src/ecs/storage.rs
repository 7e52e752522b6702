use std::any::Any;

use super::Entity;

/// Sparse set: dense values + dense owners + sparse entity -> dense index.
///
/// Removal swaps the last element into the hole, so dense order is not
/// insertion order after any removal.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    sparse: Vec<Option<u32>>,
    entities: Vec<Entity>,
    values: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: vec![],
            entities: vec![],
            values: vec![],
        }
    }
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let index = (*self.sparse.get(entity.sparse_index())?)? as usize;
        (self.entities[index] == entity).then_some(index)
    }

    /// Overwrites in place if present. Returns the previous value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(index) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.values[index], value));
        }

        let slot = entity.sparse_index();
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }

        // A stale owner of the same number may still sit here.
        if self.sparse[slot].is_some() {
            self.remove_slot(slot);
        }

        self.sparse[slot] = Some(self.entities.len() as u32);
        self.entities.push(entity);
        self.values.push(value);
        None
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = self.dense_index(entity)?;
        self.remove_dense(index)
    }

    fn remove_slot(&mut self, slot: usize) -> Option<T> {
        let index = (*self.sparse.get(slot)?)? as usize;
        self.remove_dense(index)
    }

    fn remove_dense(&mut self, index: usize) -> Option<T> {
        let removed = self.entities[index];
        let last = *self.entities.last()?;

        self.entities.swap_remove(index);
        let value = self.values.swap_remove(index);

        if last != removed {
            self.sparse[last.sparse_index()] = Some(index as u32);
        }
        self.sparse[removed.sparse_index()] = None;

        Some(value)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|i| &mut self.values[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.values.clear();
    }
}

/// Type-erased view of a `SparseSet<T>`, kept by the world per registered type.
pub trait ComponentStorage: Any {
    fn remove_entity(&mut self, entity: Entity);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ComponentStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
