//! Orthogonal A* over the 4-connected grid with a turn penalty.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, HashSet},
};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{direction::Direction4, vector::Vec2i};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCosts {
    pub move_cost: u32,
    pub turn_penalty: u32,
}

impl Default for RouteCosts {
    fn default() -> Self {
        Self {
            move_cost: 1,
            turn_penalty: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    pub costs: RouteCosts,
    /// Upper bound on settled nodes; the grid is unbounded, so an enclosed
    /// goal would otherwise never be reported unreachable.
    pub max_expansions: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            costs: RouteCosts::default(),
            max_expansions: 250_000,
        }
    }
}

struct OpenNode {
    pos: Vec2i,
    parent: Vec2i,
    g: u32,
    dir: Option<Direction4>,
}

impl Router {
    pub fn new(costs: RouteCosts) -> Self {
        Self {
            costs,
            ..Default::default()
        }
    }

    fn heuristic(&self, a: Vec2i, b: Vec2i) -> u32 {
        (a - b).manhattan_length() as u32 * self.costs.move_cost
    }

    /// Path from `start` to `goal`, both inclusive, or empty if unreachable.
    ///
    /// `goal` itself is never tested against `is_blocked`, so a route can end
    /// on a port cell that the occupancy index marks as a module. `start` is
    /// never tested either.
    pub fn route(&self, start: Vec2i, goal: Vec2i, mut is_blocked: impl FnMut(Vec2i) -> bool) -> Vec<Vec2i> {
        if start == goal {
            return vec![start];
        }

        let mut nodes = vec![OpenNode {
            pos: start,
            parent: start,
            g: 0,
            dir: None,
        }];
        let mut open = BinaryHeap::new();
        open.push(Reverse((self.heuristic(start, goal), self.heuristic(start, goal), 0usize)));

        let mut best_g: HashMap<Vec2i, u32> = HashMap::from([(start, 0)]);
        let mut came_from: HashMap<Vec2i, Vec2i> = HashMap::new();
        let mut closed: HashSet<Vec2i> = HashSet::new();

        while let Some(Reverse((_, _, index))) = open.pop() {
            let (pos, parent, g, dir) = {
                let node = &nodes[index];
                (node.pos, node.parent, node.g, node.dir)
            };

            if !closed.insert(pos) {
                continue;
            }
            if pos != start {
                came_from.insert(pos, parent);
            }

            if pos == goal {
                trace!("route {start} -> {goal}: cost {g}, settled {}", closed.len());
                return Self::reconstruct(&came_from, start, goal);
            }

            if closed.len() > self.max_expansions {
                trace!("route {start} -> {goal}: gave up after {} nodes", closed.len());
                return vec![];
            }

            for next_dir in Direction4::iter_all() {
                let next = next_dir.move_vector(pos, 1);
                if closed.contains(&next) {
                    continue;
                }
                if next != goal && is_blocked(next) {
                    continue;
                }

                let turn = match dir {
                    Some(d) if d != next_dir => self.costs.turn_penalty,
                    _ => 0,
                };
                let next_g = g + self.costs.move_cost + turn;

                if best_g.get(&next).is_some_and(|best| *best <= next_g) {
                    continue;
                }
                best_g.insert(next, next_g);

                let h = self.heuristic(next, goal);
                open.push(Reverse((next_g + h, h, nodes.len())));
                nodes.push(OpenNode {
                    pos: next,
                    parent: pos,
                    g: next_g,
                    dir: Some(next_dir),
                });
            }
        }

        vec![]
    }

    fn reconstruct(came_from: &HashMap<Vec2i, Vec2i>, start: Vec2i, goal: Vec2i) -> Vec<Vec2i> {
        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            match came_from.get(&current) {
                Some(prev) => current = *prev,
                None => return vec![],
            }
            path.push(current);
        }
        path.reverse();
        path
    }
}

/// Routes with default costs.
pub fn find_orthogonal_path(start: Vec2i, goal: Vec2i, is_blocked: impl FnMut(Vec2i) -> bool) -> Vec<Vec2i> {
    Router::default().route(start, goal, is_blocked)
}

/// Drops collinear interior points, keeping both ends and every corner.
pub fn corners(path: &[Vec2i]) -> Vec<Vec2i> {
    let mut out: Vec<Vec2i> = Vec::with_capacity(path.len().min(8));
    for &point in path {
        if out.last() == Some(&point) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if (a.x() == b.x() && b.x() == point.x()) || (a.y() == b.y() && b.y() == point.y()) {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

/// Every grid cell covered by an orthogonal polyline, endpoints included.
/// Shared segment ends are yielded once.
pub fn rasterize(polyline: &[Vec2i]) -> impl Iterator<Item = Vec2i> + '_ {
    let first = polyline.first().copied();
    first.into_iter().chain(polyline.windows(2).flat_map(|w| {
        let (a, b) = (w[0], w[1]);
        let delta = b - a;
        let steps = delta.manhattan_length();
        let unit = delta.convert(i32::signum);
        (1..=steps).map(move |i| a + unit * i)
    }))
}

/// True when `point` lies on any segment of the polyline.
pub fn polyline_contains(polyline: &[Vec2i], point: Vec2i) -> bool {
    if polyline.len() == 1 {
        return polyline[0] == point;
    }
    polyline.windows(2).any(|w| {
        let (a, b) = (w[0], w[1]);
        let (min_x, max_x) = (a.x().min(b.x()), a.x().max(b.x()));
        let (min_y, max_y) = (a.y().min(b.y()), a.y().max(b.y()));
        (min_x..=max_x).contains(&point.x()) && (min_y..=max_y).contains(&point.y())
    })
}

/// Consecutive points differ in exactly one axis.
pub fn is_orthogonal(polyline: &[Vec2i]) -> bool {
    polyline
        .windows(2)
        .all(|w| (w[0].x() == w[1].x()) != (w[0].y() == w[1].y()))
}
