use std::marker::PhantomData;

use super::{Entity, World};

/// A tuple of component types that can be viewed together.
///
/// Iteration walks the dense entity list of the smallest participating store
/// and checks membership in the others, so its cost is linear in that store.
pub trait ViewTuple: 'static {
    type Item<'w>;

    fn lead_entities(world: &World) -> Option<&[Entity]>;
    fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>>;
}

macro_rules! impl_view_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: 'static),+> ViewTuple for ($($ty,)+) {
            type Item<'w> = ($(&'w $ty,)+);

            fn lead_entities(world: &World) -> Option<&[Entity]> {
                let mut lead: Option<&[Entity]> = None;
                $(
                    let entities = world.storage::<$ty>()?.entities();
                    if lead.map_or(true, |l| entities.len() < l.len()) {
                        lead = Some(entities);
                    }
                )+
                lead
            }

            fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>> {
                Some(($(world.get::<$ty>(entity)?,)+))
            }
        }
    };
}

impl_view_tuple!(A);
impl_view_tuple!(A, B);
impl_view_tuple!(A, B, C);
impl_view_tuple!(A, B, C, D);

pub struct View<'w, Q: ViewTuple> {
    world: &'w World,
    _phantom: PhantomData<Q>,
}

impl<'w, Q: ViewTuple> View<'w, Q> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            _phantom: PhantomData,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, Q::Item<'w>)> + 'w {
        let world = self.world;
        Q::lead_entities(world)
            .unwrap_or_default()
            .iter()
            .filter_map(move |e| Q::fetch(world, *e).map(|item| (*e, item)))
    }

    pub fn each(&self, mut func: impl FnMut(Entity, Q::Item<'w>)) {
        for (entity, item) in self.iter() {
            func(entity, item);
        }
    }

    pub fn find_first(&self, mut predicate: impl FnMut(Entity, &Q::Item<'w>) -> bool) -> Option<Entity> {
        self.iter()
            .find(|(entity, item)| predicate(*entity, item))
            .map(|(entity, _)| entity)
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.iter().map(|(entity, _)| entity).collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}
