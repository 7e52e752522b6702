use std::collections::BTreeSet;

/// Opaque, reusable identity. `id()` is the reusable number; the generation
/// distinguishes a recycled number from the handle that used it before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub const NULL: Entity = Entity {
        index: u32::MAX,
        generation: 0,
    };

    #[inline]
    pub fn id(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.index == u32::MAX
    }

    /// `Some(self)` unless this is [`Entity::NULL`].
    #[inline]
    pub fn non_null(self) -> Option<Entity> {
        (!self.is_null()).then_some(self)
    }

    #[inline]
    pub(crate) fn sparse_index(self) -> usize {
        self.index as usize
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

/// Allocates entity numbers and tracks which are alive.
///
/// Destroyed numbers go into a free set and the lowest one is handed out by
/// the next `create`; forward allocation resumes once the free set is empty.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: BTreeSet<u32>,
    live: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Entity {
        let index = match self.free.pop_first() {
            Some(index) => index,
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.alive.push(false);
                index
            }
        };

        self.alive[index as usize] = true;
        self.live += 1;

        Entity {
            index,
            generation: self.generations[index as usize],
        }
    }

    /// Returns `false` if the entity was already dead or never allocated.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let index = entity.sparse_index();
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.insert(entity.index);
        self.live -= 1;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.sparse_index();
        self.alive.get(index).copied().unwrap_or(false) && self.generations[index] == entity.generation
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| Entity {
                index: index as u32,
                generation: self.generations[index],
            })
    }
}
