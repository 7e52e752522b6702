use crate::{components::Wire, ecs::{Entity, World}, vector::Vec2i};

/// An axis-aligned piece of a wire polyline, normalized so `from <= to`.
/// `owner` is `None` for the in-progress preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub owner: Option<Entity>,
    pub from: Vec2i,
    pub to: Vec2i,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub point: Vec2i,
    pub horizontal: Option<Entity>,
    pub vertical: Option<Entity>,
}

/// Horizontal and vertical segments of every wire, for drawing hop arcs
/// where two different wires cross without connecting.
#[derive(Debug, Default, Clone)]
pub struct WireSegments {
    horizontal: Vec<Segment>,
    vertical: Vec<Segment>,
}

impl WireSegments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_world(world: &World) -> Self {
        let mut segments = Self::new();
        for (wire, (data,)) in world.view::<(Wire,)>().iter() {
            segments.add_polyline(Some(wire), &data.points);
        }
        segments
    }

    pub fn add_polyline(&mut self, owner: Option<Entity>, points: &[Vec2i]) {
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let from = a.combine_with(b, i32::min);
            let to = a.combine_with(b, i32::max);
            let segment = Segment { owner, from, to };

            if a.y() == b.y() && a.x() != b.x() {
                self.horizontal.push(segment);
            } else if a.x() == b.x() && a.y() != b.y() {
                self.vertical.push(segment);
            }
        }
    }

    pub fn horizontal(&self) -> &[Segment] {
        &self.horizontal
    }

    pub fn vertical(&self) -> &[Segment] {
        &self.vertical
    }

    /// Points where a vertical segment passes strictly through the inside of
    /// a horizontal segment of another owner. Touching ends are junctions, not crossings.
    pub fn crossings(&self) -> Vec<Crossing> {
        let mut found = vec![];
        for h in &self.horizontal {
            let y = h.from.y();
            for v in &self.vertical {
                if h.owner == v.owner {
                    continue;
                }
                let x = v.from.x();
                if h.from.x() < x && x < h.to.x() && v.from.y() < y && y < v.to.y() {
                    found.push(Crossing {
                        point: Vec2i::new(x, y),
                        horizontal: h.owner,
                        vertical: v.owner,
                    });
                }
            }
        }
        found
    }
}
