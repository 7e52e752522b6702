use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    components::{
        Hierarchy, ModuleExtent, ModuleInst, ModulePixelPosition, Port, PortDirection,
        PortGridPosition, PortOffset, PortSide, ShaderKey,
    },
    direction::Direction4,
    ecs::{Entity, World},
    grid::Grid,
    vector::Vec2i,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortTemplate {
    pub name: &'static str,
    pub offset: [i32; 2],
    pub direction: PortDirection,
    pub side: Direction4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateTemplate {
    pub id: &'static str,
    pub shader_key: &'static str,
    pub width: i32,
    pub height: i32,
    /// First entry is the anchor port used when dragging.
    pub ports: &'static [PortTemplate],
}

impl GateTemplate {
    pub fn extent(&self) -> ModuleExtent {
        ModuleExtent {
            width: self.width,
            height: self.height,
        }
    }
}

const INPUT_A: PortTemplate = PortTemplate {
    name: "A",
    offset: [0, 4],
    direction: PortDirection::In,
    side: Direction4::Left,
};

const INPUT_B: PortTemplate = PortTemplate {
    name: "B",
    offset: [0, 12],
    direction: PortDirection::In,
    side: Direction4::Left,
};

const fn output_y(x: i32) -> PortTemplate {
    PortTemplate {
        name: "Y",
        offset: [x, 8],
        direction: PortDirection::Out,
        side: Direction4::Right,
    }
}

const TWO_INPUT_PORTS: &[PortTemplate] = &[INPUT_A, INPUT_B, output_y(20)];
const WIDE_TWO_INPUT_PORTS: &[PortTemplate] = &[INPUT_A, INPUT_B, output_y(24)];
const ONE_INPUT_PORTS: &[PortTemplate] = &[
    PortTemplate {
        offset: [0, 8],
        ..INPUT_A
    },
    output_y(20),
];

macro_rules! gate_template {
    ($name:ident, $id:literal, $width:literal, $ports:expr) => {
        pub const $name: GateTemplate = GateTemplate {
            id: $id,
            shader_key: $id,
            width: $width,
            height: 16,
            ports: $ports,
        };
    };
}

gate_template!(AND, "AND", 20, TWO_INPUT_PORTS);
gate_template!(NAND, "NAND", 20, TWO_INPUT_PORTS);
gate_template!(OR, "OR", 20, TWO_INPUT_PORTS);
gate_template!(NOR, "NOR", 20, TWO_INPUT_PORTS);
gate_template!(XOR, "XOR", 24, WIDE_TWO_INPUT_PORTS);
gate_template!(XNOR, "XNOR", 24, WIDE_TWO_INPUT_PORTS);
gate_template!(NOT, "NOT", 20, ONE_INPUT_PORTS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
    Not,
}

impl GateKind {
    pub const ALL: [GateKind; 7] = [
        Self::And,
        Self::Nand,
        Self::Or,
        Self::Nor,
        Self::Xor,
        Self::Xnor,
        Self::Not,
    ];

    pub fn template(self) -> &'static GateTemplate {
        match self {
            Self::And => &AND,
            Self::Nand => &NAND,
            Self::Or => &OR,
            Self::Nor => &NOR,
            Self::Xor => &XOR,
            Self::Xnor => &XNOR,
            Self::Not => &NOT,
        }
    }

    /// Case-insensitive lookup by template id.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.template().id.eq_ignore_ascii_case(name))
    }
}

/// Creates the module entity and all of its ports in one step.
///
/// Port grid positions are written from `origin`; the spatial index is left
/// for the caller to rebuild.
pub fn spawn_gate(world: &mut World, grid: &Grid, kind: GateKind, origin: Vec2i, instance_name: String) -> Entity {
    let template = kind.template();
    let module = world.create();

    let ports: Vec<Entity> = template
        .ports
        .iter()
        .map(|port| {
            let entity = world.create();
            let offset = Vec2i::from(port.offset);
            world.insert(
                entity,
                Port {
                    name: port.name.to_owned(),
                    direction: port.direction,
                    owner: module,
                    connected_signal: None,
                },
            );
            world.insert(entity, PortOffset { offset });
            world.insert(
                entity,
                PortGridPosition {
                    position: origin + offset,
                },
            );
            world.insert(entity, PortSide { facing: port.side });
            world.insert(
                entity,
                Hierarchy {
                    parent: Some(module),
                    children: vec![],
                },
            );
            entity
        })
        .collect();

    debug!("spawned {} as {instance_name} at {origin} ({} ports)", template.id, ports.len());

    world.insert(module, ModuleInst { instance_name, kind });
    world.insert(module, template.extent());
    world.insert(
        module,
        ModulePixelPosition {
            position: grid.to_pixels(origin),
        },
    );
    world.insert(
        module,
        ShaderKey {
            key: template.shader_key.to_owned(),
        },
    );
    world.insert(
        module,
        Hierarchy {
            parent: None,
            children: ports,
        },
    );

    module
}
