//! Grid-based logic-gate editor core: entity/component storage, layout with
//! an occupancy index, turn-penalized orthogonal routing and interactive
//! wire drawing. Rendering and input polling live outside this crate.

#[macro_use]
mod macros;

pub mod components;
pub mod config;
pub mod crossings;
pub mod direction;
pub mod ecs;
pub mod editor;
pub mod error;
pub mod gates;
pub mod grid;
pub mod layout;
pub mod netlist;
pub mod routing;
pub mod vector;
pub mod wiring;

pub use config::EditorConfig;
pub use ecs::{Entity, World};
pub use editor::{DropPayload, Editor, FrameInput, ModuleDraw};
pub use error::{ConfigError, EditorError};
pub use gates::GateKind;
pub use grid::Grid;
pub use layout::LayoutSystem;
pub use routing::{find_orthogonal_path, RouteCosts, Router};
pub use vector::{Vec2f, Vec2i};
pub use wiring::{ClickOutcome, EditorMode, Rejection, WiringMachine, WiringState};
