use std::collections::{HashMap, HashSet};

use log::trace;

use crate::{
    components::{
        Hierarchy, ModuleExtent, ModuleInst, ModulePixelPosition, Port, PortGridPosition, PortOffset,
        PortSide, Wire,
    },
    ecs::{Entity, World},
    grid::Grid,
    routing::{rasterize, Router},
    unwrap_option_or_continue, unwrap_option_or_return,
    vector::Vec2i,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupantKind {
    Module,
    Wire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub entity: Entity,
    pub kind: OccupantKind,
}

/// Derives geometry from grid placement and keeps the occupancy index used
/// for routing and click validation.
///
/// The index is a cache. Anything that moves a module or creates/deletes a
/// wire must be followed by [`LayoutSystem::rebuild_spatial_index`] before the
/// next query; [`LayoutSystem::mark_dirty`] + [`LayoutSystem::refresh`] exist
/// for callers that batch several mutations.
#[derive(Debug, Clone)]
pub struct LayoutSystem {
    grid: Grid,
    router: Router,
    padding: i32,
    occupancy: HashMap<Vec2i, Occupant>,
    ports: HashMap<Vec2i, Entity>,
    dirty: bool,
}

impl LayoutSystem {
    pub fn new(grid: Grid, router: Router, padding: i32) -> Self {
        Self {
            grid,
            router,
            padding: padding.max(0),
            occupancy: HashMap::new(),
            ports: HashMap::new(),
            dirty: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn padding(&self) -> i32 {
        self.padding
    }

    /* #region Geometry */

    /// Grid origin of a module, read back from its pixel position.
    ///
    /// Positions written by layout are exact multiples of the unit; a module
    /// mid-drag is off-grid and snaps to the nearest point.
    pub fn module_origin(&self, world: &World, module: Entity) -> Option<Vec2i> {
        let position = world.get::<ModulePixelPosition>(module)?.position;
        Some(
            self.grid
                .pixels_to_grid(position)
                .unwrap_or_else(|| self.grid.snap(position)),
        )
    }

    /// Recomputes the module origin from a freshly positioned anchor port,
    /// then every sibling port, then rebuilds the index.
    pub fn update_module_from_anchor(&mut self, world: &mut World, anchor_port: Entity, module: Entity) {
        let anchor = unwrap_option_or_return!(world.get::<PortGridPosition>(anchor_port)).position;
        let offset = world
            .get::<PortOffset>(anchor_port)
            .map(|o| o.offset)
            .unwrap_or_default();
        let origin = anchor - offset;

        let pixel = unwrap_option_or_return!(world.get_mut::<ModulePixelPosition>(module));
        pixel.position = self.grid.to_pixels(origin);

        trace!("module {module} anchored at {origin}");
        self.update_ports(world, module, origin);
        self.rebuild_spatial_index(world);
    }

    /// Writes `origin + offset` into every port of the module.
    pub fn update_ports(&self, world: &mut World, module: Entity, origin: Vec2i) {
        let children = unwrap_option_or_return!(world.get::<Hierarchy>(module)).children.clone();

        for port in children {
            let offset = unwrap_option_or_continue!(world.get::<PortOffset>(port)).offset;
            world.insert(
                port,
                PortGridPosition {
                    position: origin + offset,
                },
            );
        }
    }

    /// Moves a module so its origin sits at `origin`, then rebuilds the index.
    pub fn place_module(&mut self, world: &mut World, module: Entity, origin: Vec2i) {
        let pixel = unwrap_option_or_return!(world.get_mut::<ModulePixelPosition>(module));
        pixel.position = self.grid.to_pixels(origin);
        self.update_ports(world, module, origin);
        self.rebuild_spatial_index(world);
    }

    /// Refreshes every port position from its module's pixel position.
    pub fn update_all(&mut self, world: &mut World) {
        for module in world.entities_with::<ModuleInst>() {
            let origin = unwrap_option_or_continue!(self.module_origin(world, module));
            self.update_ports(world, module, origin);
        }
        self.rebuild_spatial_index(world);
    }

    /* #endregion */

    /* #region Spatial index */

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn refresh(&mut self, world: &World) {
        if self.dirty {
            self.rebuild_spatial_index(world);
        }
    }

    /// Full recompute of the occupancy map.
    ///
    /// Module interiors and their padding ring are occupied by the module,
    /// except padding cells on a port or on the cells leading straight out of
    /// a port. Every cell a wire covers is occupied by the wire.
    pub fn rebuild_spatial_index(&mut self, world: &World) {
        self.occupancy.clear();
        self.ports.clear();

        let mut exempt = HashSet::new();
        for (port, (_, position)) in world.view::<(Port, PortGridPosition)>().iter() {
            self.ports.insert(position.position, port);
            exempt.insert(position.position);

            if let Some(side) = world.get::<PortSide>(port) {
                for step in 1..=self.padding {
                    exempt.insert(side.facing.move_vector(position.position, step));
                }
            }
        }

        let pad = self.padding;
        for (module, (_, extent)) in world.view::<(ModuleInst, ModuleExtent)>().iter() {
            let origin = unwrap_option_or_continue!(self.module_origin(world, module));

            for y in -pad..extent.height + pad {
                for x in -pad..extent.width + pad {
                    let cell = origin + Vec2i::new(x, y);
                    let interior = (0..extent.width).contains(&x) && (0..extent.height).contains(&y);
                    if !interior && exempt.contains(&cell) {
                        continue;
                    }
                    self.occupancy.insert(
                        cell,
                        Occupant {
                            entity: module,
                            kind: OccupantKind::Module,
                        },
                    );
                }
            }
        }

        for (wire, (data,)) in world.view::<(Wire,)>().iter() {
            for cell in rasterize(&data.points) {
                self.occupancy.insert(
                    cell,
                    Occupant {
                        entity: wire,
                        kind: OccupantKind::Wire,
                    },
                );
            }
        }

        self.dirty = false;
        trace!(
            "spatial index rebuilt: {} occupied cells, {} ports",
            self.occupancy.len(),
            self.ports.len()
        );
    }

    pub fn occupant(&self, coord: Vec2i) -> Option<Occupant> {
        self.occupancy.get(&coord).copied()
    }

    /// Whether a module or wire occupies `coord`. Port cells and the padding
    /// cells leading straight out of each port are never occupied by a module.
    pub fn is_cell_blocked(&self, coord: Vec2i, check_modules: bool, check_wires: bool) -> bool {
        match self.occupancy.get(&coord) {
            None => false,
            Some(occupant) => match occupant.kind {
                OccupantKind::Module => check_modules,
                OccupantKind::Wire => check_wires,
            },
        }
    }

    pub fn is_blocked(&self, coord: Vec2i) -> bool {
        self.is_cell_blocked(coord, true, true)
    }

    pub fn port_at(&self, coord: Vec2i) -> Option<Entity> {
        self.ports.get(&coord).copied()
    }

    pub fn wire_at(&self, coord: Vec2i) -> Option<Entity> {
        self.occupancy
            .get(&coord)
            .filter(|o| o.kind == OccupantKind::Wire)
            .map(|o| o.entity)
    }

    pub fn occupied_cells(&self) -> usize {
        self.occupancy.len()
    }

    /* #endregion */

    /// Obstacle-aware route from `start` to `end`; empty when unreachable.
    pub fn route_wire(&self, start: Vec2i, end: Vec2i) -> Vec<Vec2i> {
        self.router.route(start, end, |cell| self.is_blocked(cell))
    }
}

impl Default for LayoutSystem {
    fn default() -> Self {
        Self::new(Grid::default(), Router::default(), 1)
    }
}
