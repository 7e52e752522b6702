//! Entity registry, sparse-set component stores and the world that composes them.

mod entity;
mod query;
mod storage;
mod world;

pub use entity::{Entity, EntityRegistry};
pub use query::{View, ViewTuple};
pub use storage::{ComponentStorage, SparseSet};
pub use world::{ComponentId, World};
