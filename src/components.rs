//! Plain data attached to module, port, signal and wire entities.

use serde::{Deserialize, Serialize};

use crate::{
    direction::Direction4,
    ecs::Entity,
    gates::GateKind,
    vector::{Vec2f, Vec2i},
};

/// A placed gate instance. Its ports are listed in its [`Hierarchy`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInst {
    pub instance_name: String,
    pub kind: GateKind,
}

/// Parent/child links. Modules hold their ports as children; ports point back
/// at their module through `parent`. Both links are weak.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    pub parent: Option<Entity>,
    pub children: Vec<Entity>,
}

/// Size in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleExtent {
    pub width: i32,
    pub height: i32,
}

/// Top-left pixel position. Derived: anchor port grid position minus its
/// offset, converted to pixels. Only dragging writes it directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModulePixelPosition {
    pub position: Vec2f,
}

/// Stable key the renderer maps to a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderKey {
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub owner: Entity,
    /// Maintained only through [`crate::netlist`].
    pub connected_signal: Option<Entity>,
}

/// Offset from the module origin in grid units, authored with the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortOffset {
    pub offset: Vec2i,
}

/// Absolute grid position, `module origin + PortOffset`. Derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortGridPosition {
    pub position: Vec2i,
}

/// Which edge of the module the port faces; the direction points away from the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSide {
    pub facing: Direction4,
}

/// A net. `connected_ports` and every listed port's `connected_signal` always agree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signal {
    pub name: String,
    pub connected_ports: Vec<Entity>,
}

/// A committed orthogonal polyline between two endpoints (ports or wires).
///
/// `points` holds the full polyline, endpoints included; consecutive points
/// differ in exactly one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub signal: Entity,
    pub from_endpoint: Entity,
    pub to_endpoint: Entity,
    pub points: Vec<Vec2i>,
}

impl Wire {
    pub fn touches(&self, endpoint: Entity) -> bool {
        self.from_endpoint == endpoint || self.to_endpoint == endpoint
    }

    pub fn endpoints(&self) -> [Entity; 2] {
        [self.from_endpoint, self.to_endpoint]
    }
}
