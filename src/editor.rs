use std::{collections::HashMap, path::Path};

use log::{debug, trace, warn};

use crate::{
    components::{
        Hierarchy, ModuleExtent, ModuleInst, ModulePixelPosition, Port, PortGridPosition, PortOffset,
        ShaderKey, Wire,
    },
    config::EditorConfig,
    crossings::{Crossing, WireSegments},
    ecs::{Entity, World},
    error::EditorError,
    gates::{self, GateKind},
    grid::Grid,
    layout::LayoutSystem,
    netlist,
    routing::Router,
    unwrap_alive_or_return, unwrap_option_or_return,
    vector::{Vec2f, Vec2i},
    wiring::{ClickOutcome, EditorMode, WiringMachine},
};

/// A gate dragged in from the palette.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPayload {
    pub gate: String,
    pub pixel: Vec2f,
}

/// Everything the input layer reports for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Canvas-local mouse position.
    pub mouse_px: Vec2f,
    pub clicked: bool,
    pub mouse_down: bool,
    pub released: bool,
    pub toggle_wiring: bool,
    pub delete: bool,
    pub escape: bool,
    pub drop: Option<DropPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    module: Entity,
    grab_offset: Vec2f,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDraw<'a> {
    pub entity: Entity,
    pub position: Vec2f,
    pub size: Vec2f,
    pub shader_key: &'a str,
    pub selected: bool,
}

/// The editing core: owns the world and every system acting on it.
///
/// Every mutating entry point leaves the spatial index up to date. Code that
/// edits the world directly through [`Editor::world_mut`] gets a rebuild on
/// the next [`Editor::update`] or explicit [`Editor::rebuild_spatial_index`].
pub struct Editor {
    config: EditorConfig,
    world: World,
    layout: LayoutSystem,
    mode: EditorMode,
    wiring: WiringMachine,
    selected: Option<Entity>,
    drag: Option<DragState>,
    mouse_px: Vec2f,
    instance_counters: HashMap<GateKind, usize>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let layout = LayoutSystem::new(
            config.grid(),
            Router::new(config.route_costs()),
            config.module_padding,
        );
        Self {
            config,
            world: World::new(),
            layout,
            mode: EditorMode::Select,
            wiring: WiringMachine::new(),
            selected: None,
            drag: None,
            mouse_px: Vec2f::default(),
            instance_counters: HashMap::new(),
        }
    }

    /// Builds an editor from a RON config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config = EditorConfig::load(path)?;
        debug!("loaded editor config: unit {}px, padding {}", config.unit_px, config.module_padding);
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access. The spatial index is considered stale afterwards.
    pub fn world_mut(&mut self) -> &mut World {
        self.layout.mark_dirty();
        &mut self.world
    }

    pub fn layout(&self) -> &LayoutSystem {
        &self.layout
    }

    pub fn grid(&self) -> &Grid {
        self.layout.grid()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn wiring(&self) -> &WiringMachine {
        &self.wiring
    }

    pub fn selected(&self) -> Option<Entity> {
        self.selected.filter(|e| self.world.is_alive(*e))
    }

    /// Module currently following the mouse; its ports are not drawn.
    pub fn dragging_entity(&self) -> Option<Entity> {
        self.drag.map(|d| d.module)
    }

    pub fn mouse_px(&self) -> Vec2f {
        self.mouse_px
    }

    pub fn snap_to_grid(&self, pixel: Vec2f) -> Vec2i {
        self.grid().snap(pixel)
    }

    pub fn rebuild_spatial_index(&mut self) {
        self.layout.rebuild_spatial_index(&self.world);
    }

    /// See [`LayoutSystem::is_cell_blocked`]; port approach cells stay free.
    pub fn is_cell_blocked(&self, coord: Vec2i) -> bool {
        self.layout.is_blocked(coord)
    }

    /* #region Placement and deletion */

    /// Places a gate with its origin at `origin`. The name is matched case-insensitively.
    pub fn create_gate(&mut self, type_name: &str, origin: Vec2i) -> Result<Entity, EditorError> {
        let Some(kind) = GateKind::from_name(type_name) else {
            warn!("cannot place unknown gate \"{type_name}\"");
            return Err(EditorError::UnknownGate(type_name.to_owned()));
        };

        let counter = self.instance_counters.entry(kind).or_default();
        *counter += 1;
        let name = format!("{}_{}", kind.template().id, counter);

        let grid = *self.layout.grid();
        let module = gates::spawn_gate(&mut self.world, &grid, kind, origin, name);
        self.layout.update_ports(&mut self.world, module, origin);
        self.layout.rebuild_spatial_index(&self.world);

        debug!("created gate {module} at {origin}");
        Ok(module)
    }

    /// Places a dropped gate so its centre lands on the cursor, snapped to the grid.
    pub fn drop_gate(&mut self, type_name: &str, pixel: Vec2f) -> Result<Entity, EditorError> {
        let kind = GateKind::from_name(type_name)
            .ok_or_else(|| EditorError::UnknownGate(type_name.to_owned()))?;
        let extent = kind.template().extent();
        let half = self.grid().extent_to_pixels(extent.width, extent.height) * 0.5;
        let origin = self.snap_to_grid(pixel - half);
        self.create_gate(type_name, origin)
    }

    /// Deletes a module (with its ports and attached wires) or a wire.
    pub fn delete_entity(&mut self, entity: Entity) -> bool {
        let deleted = if self.world.has::<ModuleInst>(entity) {
            netlist::destroy_module(&mut self.world, entity)
        } else if self.world.has::<Wire>(entity) {
            netlist::delete_wire(&mut self.world, entity)
        } else {
            warn!("refusing to delete {entity}: not a module or wire");
            false
        };
        if !deleted {
            return false;
        }

        if self.selected == Some(entity) {
            self.selected = None;
        }
        if self.dragging_entity() == Some(entity) {
            self.drag = None;
        }
        if let Some(start) = self.wiring.active().map(|a| a.start_endpoint) {
            if !self.world.is_alive(start) {
                self.wiring.cancel();
            }
        }

        self.layout.rebuild_spatial_index(&self.world);
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        let selected = unwrap_option_or_return!(self.selected(), false);
        self.delete_entity(selected)
    }

    /* #endregion */

    /* #region Modes */

    pub fn toggle_wiring_mode(&mut self) {
        if self.mode == EditorMode::Wiring {
            self.mode = self.wiring.leave();
        } else {
            self.wiring.enter(self.mode);
            if self.config.wiring_toggle_clears_selection {
                self.selected = None;
            }
            self.drag = None;
            self.mode = EditorMode::Wiring;
        }
        debug!("mode is now {:?}", self.mode);
    }

    /// Cancels the wire in progress, or leaves wiring mode when there is none.
    pub fn escape(&mut self) {
        match self.mode {
            EditorMode::Wiring => {
                if !self.wiring.cancel() {
                    self.mode = self.wiring.leave();
                    debug!("mode is now {:?}", self.mode);
                }
            }
            EditorMode::Select => {
                self.selected = None;
            }
        }
    }

    /// Feeds a grid click to the wiring state machine. `None` outside wiring mode.
    pub fn wiring_click(&mut self, coord: Vec2i) -> Option<ClickOutcome> {
        if self.mode != EditorMode::Wiring {
            return None;
        }
        self.layout.refresh(&self.world);
        Some(self.wiring.click(&mut self.world, &mut self.layout, coord))
    }

    pub fn update_preview(&mut self, mouse: Vec2i) {
        if self.mode == EditorMode::Wiring {
            self.wiring.update_preview(&self.layout, mouse);
        }
    }

    /* #endregion */

    /* #region Selection and dragging */

    pub fn module_at(&self, pixel: Vec2f) -> Option<Entity> {
        let unit = self.grid().unit_px() as f32;
        self.world
            .view::<(ModuleInst, ModulePixelPosition, ModuleExtent)>()
            .find_first(|_, (_, position, extent)| {
                let min = position.position;
                let max = min + Vec2f::new(extent.width as f32 * unit, extent.height as f32 * unit);
                (min.x()..max.x()).contains(&pixel.x()) && (min.y()..max.y()).contains(&pixel.y())
            })
    }

    /// Selects the module or wire under the cursor; a module also starts a drag.
    pub fn select_at(&mut self, pixel: Vec2f) -> Option<Entity> {
        if let Some(module) = self.module_at(pixel) {
            let position = self
                .world
                .get::<ModulePixelPosition>(module)
                .map(|p| p.position)
                .unwrap_or_default();
            self.drag = Some(DragState {
                module,
                grab_offset: pixel - position,
            });
            self.selected = Some(module);
            trace!("selected module {module}");
            return Some(module);
        }

        self.selected = self.layout.wire_at(self.snap_to_grid(pixel));
        self.selected
    }

    pub fn drag_to(&mut self, pixel: Vec2f) {
        let drag = unwrap_option_or_return!(self.drag);
        let position = unwrap_alive_or_return!(
            self.world.get_mut::<ModulePixelPosition>(drag.module),
            "drag",
            ()
        );
        position.position = pixel - drag.grab_offset;
    }

    /// Ends a drag: the anchor port snaps to the grid and the module follows it.
    pub fn release(&mut self) {
        let drag = unwrap_option_or_return!(self.drag.take());
        let module = drag.module;

        let anchor = unwrap_alive_or_return!(
            self.world
                .get::<Hierarchy>(module)
                .and_then(|h| h.children.first().copied()),
            "release",
            ()
        );
        let pixel = unwrap_option_or_return!(self.world.get::<ModulePixelPosition>(module)).position;
        let offset = self
            .world
            .get::<PortOffset>(anchor)
            .map(|o| o.offset)
            .unwrap_or_default();

        let position = self.snap_to_grid(pixel) + offset;
        self.world.insert(anchor, PortGridPosition { position });
        self.layout.update_module_from_anchor(&mut self.world, anchor, module);
        debug!("moved module {module}, anchor now at {position}");
    }

    /* #endregion */

    /// Applies one frame of input.
    ///
    /// Mode toggle, escape, delete and drop are handled first. The preview is
    /// then routed to the mouse before a click can commit it.
    pub fn update(&mut self, input: &FrameInput) {
        self.mouse_px = input.mouse_px;
        self.layout.refresh(&self.world);

        if input.toggle_wiring {
            self.toggle_wiring_mode();
        }
        if input.escape {
            self.escape();
        }
        if input.delete {
            self.delete_selected();
        }
        if let Some(payload) = &input.drop {
            if let Err(err) = self.drop_gate(&payload.gate, payload.pixel) {
                warn!("drop ignored: {err}");
            }
        }

        let mouse = self.snap_to_grid(input.mouse_px);
        match self.mode {
            EditorMode::Wiring => {
                self.update_preview(mouse);
                if input.clicked {
                    self.wiring_click(mouse);
                }
            }
            EditorMode::Select => {
                if input.clicked {
                    self.select_at(input.mouse_px);
                }
                if input.mouse_down {
                    self.drag_to(input.mouse_px);
                }
                if input.released {
                    self.release();
                }
            }
        }
    }

    /* #region Render queries */

    pub fn module_draw_list(&self) -> Vec<ModuleDraw<'_>> {
        let selected = self.selected();
        self.world
            .view::<(ModulePixelPosition, ModuleExtent, ShaderKey)>()
            .iter()
            .map(|(entity, (position, extent, key))| ModuleDraw {
                entity,
                position: position.position,
                size: self.grid().extent_to_pixels(extent.width, extent.height),
                shader_key: &key.key,
                selected: selected == Some(entity),
            })
            .collect()
    }

    /// Grid positions of every port, minus those of the module being dragged.
    pub fn port_positions(&self) -> Vec<(Entity, Vec2i)> {
        let dragging = self.dragging_entity();
        self.world
            .view::<(Port, PortGridPosition)>()
            .iter()
            .filter(|(_, (port, _))| Some(port.owner) != dragging)
            .map(|(entity, (_, position))| (entity, position.position))
            .collect()
    }

    pub fn wire_polylines(&self) -> Vec<(Entity, &[Vec2i])> {
        self.world
            .view::<(Wire,)>()
            .iter()
            .map(|(entity, (wire,))| (entity, wire.points.as_slice()))
            .collect()
    }

    /// Committed points of the wire in progress followed by its routed preview.
    pub fn preview_polyline(&self) -> Option<Vec<Vec2i>> {
        self.wiring.active().map(|active| active.polyline())
    }

    pub fn crossings(&self) -> Vec<Crossing> {
        let mut segments = WireSegments::from_world(&self.world);
        if let Some(preview) = self.preview_polyline() {
            segments.add_polyline(None, &preview);
        }
        segments.crossings()
    }

    /* #endregion */
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn click_at(editor: &mut Editor, cell: [i32; 2]) {
        let mouse_px = editor.grid().to_pixels(cell.into());
        editor.update(&FrameInput {
            mouse_px,
            clicked: true,
            ..Default::default()
        });
    }

    #[test]
    fn unknown_gate_is_an_error() {
        let mut editor = Editor::default();
        assert!(matches!(
            editor.create_gate("flux", Vec2i::new(0, 0)),
            Err(EditorError::UnknownGate(name)) if name == "flux"
        ));
        assert_eq!(editor.world().entity_count(), 0);
    }

    #[test]
    fn config_file_sets_up_the_grid() {
        let path = std::env::temp_dir().join(format!("gridwire-editor-{}.ron", std::process::id()));
        std::fs::write(&path, "(unit_px: 16, module_padding: 2)").unwrap();
        let editor = Editor::from_config_file(&path);
        let _ = std::fs::remove_file(&path);

        let editor = editor.unwrap();
        assert_eq!(editor.grid().unit_px(), 16);
        assert_eq!(editor.layout().padding(), 2);
        assert_eq!(editor.config().turn_penalty, 50);
    }

    #[test]
    fn missing_config_file_is_an_editor_error() {
        assert!(matches!(
            Editor::from_config_file("/definitely/not/here.ron"),
            Err(EditorError::Config(ConfigError::Io(_)))
        ));
    }

    #[test]
    fn toggle_and_escape_walk_the_modes() {
        let mut editor = Editor::default();
        let module = editor.create_gate("and", Vec2i::new(0, 0)).unwrap();
        editor.select_at(Vec2f::new(50.0, 50.0));
        editor.release();
        assert_eq!(editor.selected(), Some(module));

        editor.toggle_wiring_mode();
        assert_eq!(editor.mode(), EditorMode::Wiring);
        assert_eq!(editor.selected(), None);

        click_at(&mut editor, [20, 8]);
        assert!(editor.wiring().is_drawing());

        editor.escape();
        assert_eq!(editor.mode(), EditorMode::Wiring);
        assert!(!editor.wiring().is_drawing());

        editor.escape();
        assert_eq!(editor.mode(), EditorMode::Select);

        editor.toggle_wiring_mode();
        click_at(&mut editor, [20, 8]);
        editor.toggle_wiring_mode();
        assert_eq!(editor.mode(), EditorMode::Select);
        assert!(editor.preview_polyline().is_none());
        assert_eq!(editor.world().count::<Wire>(), 0);
    }

    #[test]
    fn drag_and_release_snaps_to_grid() {
        let mut editor = Editor::default();
        let module = editor.create_gate("NOT", Vec2i::new(0, 0)).unwrap();

        editor.update(&FrameInput {
            mouse_px: Vec2f::new(55.0, 55.0),
            clicked: true,
            mouse_down: true,
            ..Default::default()
        });
        assert_eq!(editor.dragging_entity(), Some(module));

        editor.update(&FrameInput {
            mouse_px: Vec2f::new(358.0, 243.0),
            mouse_down: true,
            ..Default::default()
        });
        assert!(editor.port_positions().is_empty());

        editor.update(&FrameInput {
            mouse_px: Vec2f::new(358.0, 243.0),
            released: true,
            ..Default::default()
        });
        assert_eq!(editor.dragging_entity(), None);

        // Pixel (303, 188) rounds to grid (30, 19).
        let draw = &editor.module_draw_list()[0];
        assert_eq!(draw.position, Vec2f::new(300.0, 190.0));
        assert_eq!(draw.shader_key, "NOT");
        assert_eq!(
            editor.port_positions().iter().map(|(_, p)| *p).collect::<Vec<_>>(),
            vec![Vec2i::new(30, 27), Vec2i::new(50, 27)]
        );
        assert!(editor.is_cell_blocked(Vec2i::new(35, 25)));
        assert!(!editor.is_cell_blocked(Vec2i::new(5, 5)));
    }

    #[test]
    fn drop_centres_gate_on_cursor() {
        let mut editor = Editor::default();
        editor.update(&FrameInput {
            mouse_px: Vec2f::new(400.0, 300.0),
            drop: Some(DropPayload {
                gate: "Or".into(),
                pixel: Vec2f::new(400.0, 300.0),
            }),
            ..Default::default()
        });

        let draw = &editor.module_draw_list()[0];
        assert_eq!(draw.position, Vec2f::new(300.0, 220.0));
        assert_eq!(draw.size, Vec2f::new(200.0, 160.0));
        assert_eq!(editor.world().get::<ModuleInst>(draw.entity).unwrap().instance_name, "OR_1");
    }

    #[test]
    fn deleting_selected_module_takes_its_wires() {
        let mut editor = Editor::default();
        let m1 = editor.create_gate("AND", Vec2i::new(0, 0)).unwrap();
        editor.create_gate("AND", Vec2i::new(40, 0)).unwrap();

        editor.toggle_wiring_mode();
        click_at(&mut editor, [20, 8]);
        click_at(&mut editor, [30, 8]);
        click_at(&mut editor, [30, 4]);
        click_at(&mut editor, [40, 4]);
        assert_eq!(editor.world().count::<Wire>(), 1);
        editor.toggle_wiring_mode();

        editor.select_at(Vec2f::new(10.0, 10.0));
        editor.release();
        assert_eq!(editor.selected(), Some(m1));
        editor.update(&FrameInput {
            delete: true,
            ..Default::default()
        });

        assert!(!editor.world().is_alive(m1));
        assert_eq!(editor.world().count::<Wire>(), 0);
        assert_eq!(editor.world().count::<crate::components::Signal>(), 0);
        assert!(netlist::is_consistent(editor.world()));
        assert!(!editor.is_cell_blocked(Vec2i::new(5, 5)));
        assert!(!editor.is_cell_blocked(Vec2i::new(30, 6)));
    }
}
