use std::{any::TypeId, collections::HashMap};

use log::trace;

use super::{query::View, ComponentStorage, Entity, EntityRegistry, SparseSet, ViewTuple};

/// Small per-world index assigned to a component type at first use.
pub type ComponentId = usize;

/// Entity lifecycle plus typed attach/detach/query over one sparse set per type.
///
/// Every operation on a dead or null entity is a no-op or returns `None`.
#[derive(Default)]
pub struct World {
    entities: EntityRegistry,
    component_ids: HashMap<TypeId, ComponentId>,
    storages: Vec<Box<dyn ComponentStorage>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /* #region Entities */

    pub fn create(&mut self) -> Entity {
        self.entities.create()
    }

    /// Removes every component of every type ever registered, then frees the id.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }

        for storage in self.storages.iter_mut() {
            storage.remove_entity(entity);
        }

        trace!("destroyed entity {entity}");
        self.entities.destroy(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /* #endregion */

    /* #region Storages */

    pub fn component_id<T: 'static>(&self) -> Option<ComponentId> {
        self.component_ids.get(&TypeId::of::<T>()).copied()
    }

    fn register<T: 'static>(&mut self) -> ComponentId {
        if let Some(id) = self.component_id::<T>() {
            return id;
        }

        let id = self.storages.len();
        self.storages.push(Box::new(SparseSet::<T>::new()));
        self.component_ids.insert(TypeId::of::<T>(), id);
        trace!(
            "registered component {} as #{id}",
            std::any::type_name::<T>()
        );
        id
    }

    pub fn storage<T: 'static>(&self) -> Option<&SparseSet<T>> {
        let id = self.component_id::<T>()?;
        self.storages[id].as_any().downcast_ref()
    }

    pub fn storage_mut<T: 'static>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.component_id::<T>()?;
        self.storages[id].as_any_mut().downcast_mut()
    }

    fn storage_or_register<T: 'static>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.register::<T>();
        self.storages[id].as_any_mut().downcast_mut()
    }

    /* #endregion */

    /* #region Components */

    /// Attaches `value`, overwriting any previous `T` on the entity.
    /// Returns `None` if the entity is not alive.
    pub fn insert<T: 'static>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }

        let storage = self.storage_or_register::<T>()?;
        storage.insert(entity, value);
        storage.get_mut(entity)
    }

    pub fn remove<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.remove(entity)
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity)
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    pub fn count<T: 'static>(&self) -> usize {
        self.storage::<T>().map(|s| s.len()).unwrap_or(0)
    }

    /// Snapshot of entities holding `T`, for loops that mutate the world.
    pub fn entities_with<T: 'static>(&self) -> Vec<Entity> {
        self.storage::<T>()
            .map(|s| s.entities().to_vec())
            .unwrap_or_default()
    }

    pub fn each<T: 'static>(&self, mut func: impl FnMut(Entity, &T)) {
        if let Some(storage) = self.storage::<T>() {
            for (entity, value) in storage.iter() {
                func(entity, value);
            }
        }
    }

    pub fn each_mut<T: 'static>(&mut self, mut func: impl FnMut(Entity, &mut T)) {
        if let Some(storage) = self.storage_mut::<T>() {
            for (entity, value) in storage.iter_mut() {
                func(entity, value);
            }
        }
    }

    pub fn view<Q: ViewTuple>(&self) -> View<'_, Q> {
        View::new(self)
    }

    /* #endregion */
}
