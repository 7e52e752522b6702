//! Multi-click wire drawing.
//!
//! A wire starts on a port or on an existing wire (a junction), collects
//! routed segments on every free-space click and is committed when a click
//! lands on another endpoint. Rejected clicks never change the state.

use std::collections::HashSet;

use log::{debug, trace};

use crate::{
    ecs::{Entity, World},
    layout::LayoutSystem,
    netlist,
    routing::{corners, rasterize},
    vector::Vec2i,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Select,
    Wiring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWire {
    pub start_endpoint: Entity,
    /// Always starts with the start endpoint's coordinate.
    pub committed_points: Vec<Vec2i>,
    /// Routed path from the last committed point to `preview_target`.
    pub preview_path: Vec<Vec2i>,
    pub preview_target: Option<Vec2i>,
}

impl ActiveWire {
    fn new(start_endpoint: Entity, at: Vec2i) -> Self {
        Self {
            start_endpoint,
            committed_points: vec![at],
            preview_path: vec![],
            preview_target: None,
        }
    }

    pub fn last_point(&self) -> Option<Vec2i> {
        self.committed_points.last().copied()
    }

    /// Route from the last committed point to `to`. The wire's own cells
    /// are obstacles, so a new segment never runs back over an earlier one.
    fn route_from_last(&self, layout: &LayoutSystem, to: Vec2i) -> Vec<Vec2i> {
        let Some(last) = self.last_point() else {
            return vec![];
        };
        let own: HashSet<Vec2i> = rasterize(&self.committed_points).collect();
        layout
            .router()
            .route(last, to, |cell| own.contains(&cell) || layout.is_blocked(cell))
    }

    /// Committed points followed by the corners of the preview.
    pub fn polyline(&self) -> Vec<Vec2i> {
        let mut points = self.committed_points.clone();
        if self.preview_path.first().copied() == self.last_point() {
            points.extend(corners(&self.preview_path).into_iter().skip(1));
        }
        points
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WiringState {
    #[default]
    Idle,
    Active(ActiveWire),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Module body or padding, with no port or wire under the click.
    Blocked,
    /// A wire can only be started on a port or an existing wire.
    NotAnEndpoint,
    /// Both ends would sit on the same module or the same endpoint.
    SameModule,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Started(Entity),
    Extended,
    Completed(Entity),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Default)]
pub struct WiringMachine {
    state: WiringState,
    previous_mode: EditorMode,
}

impl WiringMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WiringState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveWire> {
        match &self.state {
            WiringState::Idle => None,
            WiringState::Active(active) => Some(active),
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, WiringState::Active(_))
    }

    pub fn previous_mode(&self) -> EditorMode {
        self.previous_mode
    }

    /// Enters wiring mode, remembering the mode to return to.
    pub fn enter(&mut self, from: EditorMode) {
        self.previous_mode = from;
        self.state = WiringState::Idle;
    }

    /// Leaves wiring mode, dropping any wire in progress.
    pub fn leave(&mut self) -> EditorMode {
        self.cancel();
        self.previous_mode
    }

    /// Drops the wire in progress. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        let was_drawing = self.is_drawing();
        if was_drawing {
            debug!("wire cancelled");
        }
        self.state = WiringState::Idle;
        was_drawing
    }

    /// Routes from the last committed point to the cell under the mouse.
    pub fn update_preview(&mut self, layout: &LayoutSystem, mouse: Vec2i) {
        let WiringState::Active(active) = &mut self.state else {
            return;
        };
        if active.preview_target == Some(mouse) {
            return;
        }

        active.preview_path = active.route_from_last(layout, mouse);
        active.preview_target = Some(mouse);
    }

    /// Endpoint under a grid cell: a port first, then a wire.
    pub fn endpoint_at(layout: &LayoutSystem, coord: Vec2i) -> Option<Entity> {
        layout.port_at(coord).or_else(|| layout.wire_at(coord))
    }

    pub fn click(&mut self, world: &mut World, layout: &mut LayoutSystem, coord: Vec2i) -> ClickOutcome {
        let target = Self::endpoint_at(layout, coord);
        if target.is_none() && layout.is_blocked(coord) {
            trace!("click at {coord} rejected: blocked");
            return ClickOutcome::Rejected(Rejection::Blocked);
        }

        if !self.is_drawing() {
            let Some(start) = target else {
                trace!("click at {coord} rejected: wires start on a port or wire");
                return ClickOutcome::Rejected(Rejection::NotAnEndpoint);
            };
            debug!("wire started at {coord} on {start}");
            self.state = WiringState::Active(ActiveWire::new(start, coord));
            return ClickOutcome::Started(start);
        }
        let WiringState::Active(active) = &mut self.state else {
            return ClickOutcome::Rejected(Rejection::NotAnEndpoint);
        };

        if let Some(end) = target {
            let same_module = match (
                netlist::endpoint_module(world, active.start_endpoint),
                netlist::endpoint_module(world, end),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if same_module || end == active.start_endpoint {
                trace!("click at {coord} rejected: same module");
                return ClickOutcome::Rejected(Rejection::SameModule);
            }
        }

        let Some(last) = active.last_point() else {
            return ClickOutcome::Rejected(Rejection::Unreachable);
        };
        let path = if active.preview_target == Some(coord) && !active.preview_path.is_empty() {
            std::mem::take(&mut active.preview_path)
        } else {
            active.route_from_last(layout, coord)
        };
        if path.is_empty() {
            trace!("click at {coord} rejected: no route from {last}");
            return ClickOutcome::Rejected(Rejection::Unreachable);
        }

        active.committed_points.extend(corners(&path).into_iter().skip(1));
        active.preview_path.clear();
        active.preview_target = None;

        let Some(end) = target else {
            trace!("wire extended to {coord}");
            return ClickOutcome::Extended;
        };

        let start = active.start_endpoint;
        let points = std::mem::take(&mut active.committed_points);
        self.state = WiringState::Idle;

        let wire = netlist::create_wire(world, start, end, points);
        layout.rebuild_spatial_index(world);
        ClickOutcome::Completed(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{Hierarchy, Signal, Wire},
        gates::{spawn_gate, GateKind},
    };

    struct Fixture {
        world: World,
        layout: LayoutSystem,
        m1: Vec<Entity>,
        m2: Vec<Entity>,
    }

    fn fixture() -> Fixture {
        let mut world = World::new();
        let mut layout = LayoutSystem::default();
        let grid = *layout.grid();
        let a = spawn_gate(&mut world, &grid, GateKind::And, Vec2i::new(0, 0), "AND_1".into());
        let b = spawn_gate(&mut world, &grid, GateKind::And, Vec2i::new(60, 0), "AND_2".into());
        layout.rebuild_spatial_index(&world);

        let m1 = world.get::<Hierarchy>(a).unwrap().children.clone();
        let m2 = world.get::<Hierarchy>(b).unwrap().children.clone();
        Fixture { world, layout, m1, m2 }
    }

    #[test]
    fn cannot_start_on_free_space_or_module() {
        let Fixture { mut world, mut layout, .. } = fixture();
        let mut wiring = WiringMachine::new();

        assert_eq!(
            wiring.click(&mut world, &mut layout, Vec2i::new(40, 40)),
            ClickOutcome::Rejected(Rejection::NotAnEndpoint)
        );
        assert_eq!(
            wiring.click(&mut world, &mut layout, Vec2i::new(5, 5)),
            ClickOutcome::Rejected(Rejection::Blocked)
        );
        assert_eq!(wiring.state(), &WiringState::Idle);
    }

    #[test]
    fn multi_click_wire_commits() {
        let Fixture { mut world, mut layout, m1, m2 } = fixture();
        let mut wiring = WiringMachine::new();

        assert_eq!(wiring.click(&mut world, &mut layout, Vec2i::new(20, 8)), ClickOutcome::Started(m1[2]));
        for p in [[30, 8], [30, 4], [40, 4]] {
            wiring.update_preview(&layout, p.into());
            assert_eq!(wiring.click(&mut world, &mut layout, p.into()), ClickOutcome::Extended);
        }

        let ClickOutcome::Completed(wire) = wiring.click(&mut world, &mut layout, Vec2i::new(60, 4)) else {
            panic!("wire was not completed");
        };
        assert_eq!(wiring.state(), &WiringState::Idle);

        let data = world.get::<Wire>(wire).unwrap();
        assert!(crate::routing::is_orthogonal(&data.points));
        assert_eq!(
            data.points,
            [[20, 8], [30, 8], [30, 4], [40, 4], [60, 4]].map(Vec2i::from).to_vec()
        );
        assert_eq!(
            world.get::<Signal>(data.signal).unwrap().connected_ports,
            vec![m1[2], m2[0]]
        );
        assert!(layout.is_cell_blocked(Vec2i::new(50, 4), false, true));
    }

    #[test]
    fn same_module_is_silently_ignored() {
        let Fixture { mut world, mut layout, m1, .. } = fixture();
        let mut wiring = WiringMachine::new();

        wiring.click(&mut world, &mut layout, Vec2i::new(20, 8));
        wiring.click(&mut world, &mut layout, Vec2i::new(30, 8));
        let before = wiring.state().clone();

        assert_eq!(
            wiring.click(&mut world, &mut layout, Vec2i::new(0, 12)),
            ClickOutcome::Rejected(Rejection::SameModule)
        );
        assert_eq!(wiring.state(), &before);
        assert_eq!(world.count::<Wire>(), 0);
        assert_eq!(wiring.active().unwrap().start_endpoint, m1[2]);
    }

    #[test]
    fn junction_joins_existing_signal() {
        let Fixture { mut world, mut layout, m1, m2 } = fixture();
        let mut wiring = WiringMachine::new();

        wiring.click(&mut world, &mut layout, Vec2i::new(20, 8));
        wiring.click(&mut world, &mut layout, Vec2i::new(40, 8));
        wiring.click(&mut world, &mut layout, Vec2i::new(40, 4));
        let ClickOutcome::Completed(first) = wiring.click(&mut world, &mut layout, Vec2i::new(60, 4)) else {
            panic!("first wire was not completed");
        };

        assert_eq!(wiring.click(&mut world, &mut layout, Vec2i::new(30, 8)), ClickOutcome::Started(first));
        wiring.click(&mut world, &mut layout, Vec2i::new(30, 30));
        wiring.click(&mut world, &mut layout, Vec2i::new(50, 30));
        wiring.click(&mut world, &mut layout, Vec2i::new(50, 12));
        let ClickOutcome::Completed(second) = wiring.click(&mut world, &mut layout, Vec2i::new(60, 12)) else {
            panic!("branch was not completed");
        };

        let signal = world.get::<Wire>(first).unwrap().signal;
        assert_eq!(world.get::<Wire>(second).unwrap().signal, signal);
        assert_eq!(world.count::<Signal>(), 1);
        assert_eq!(
            world.get::<Signal>(signal).unwrap().connected_ports,
            vec![m1[2], m2[0], m2[1]]
        );
    }

    #[test]
    fn later_segments_do_not_retrace_the_wire() {
        let Fixture { mut world, mut layout, .. } = fixture();
        let mut wiring = WiringMachine::new();

        wiring.click(&mut world, &mut layout, Vec2i::new(20, 8));
        wiring.click(&mut world, &mut layout, Vec2i::new(30, 8));
        wiring.click(&mut world, &mut layout, Vec2i::new(30, 20));
        // Straight up would run back along (30, 19)..(30, 9).
        assert_eq!(wiring.click(&mut world, &mut layout, Vec2i::new(30, 2)), ClickOutcome::Extended);

        let points = &wiring.active().unwrap().committed_points;
        assert_eq!(points.last(), Some(&Vec2i::new(30, 2)));
        assert!(crate::routing::is_orthogonal(points));

        let cells: Vec<Vec2i> = rasterize(points).collect();
        let unique: HashSet<Vec2i> = cells.iter().copied().collect();
        assert_eq!(cells.len(), unique.len());
    }

    #[test]
    fn cancel_drops_progress() {
        let Fixture { mut world, mut layout, .. } = fixture();
        let mut wiring = WiringMachine::new();
        wiring.enter(EditorMode::Select);

        wiring.click(&mut world, &mut layout, Vec2i::new(20, 8));
        wiring.update_preview(&layout, Vec2i::new(25, 20));
        assert_eq!(wiring.active().unwrap().polyline().last(), Some(&Vec2i::new(25, 20)));

        assert!(wiring.cancel());
        assert!(!wiring.cancel());
        assert_eq!(wiring.leave(), EditorMode::Select);
        assert_eq!(world.count::<Wire>(), 0);
    }
}
