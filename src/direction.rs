use serde::{Deserialize, Serialize};

use crate::vector::Vec2i;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction4 {
    Up,
    Left,
    Down,
    Right,
}

impl Direction4 {
    pub const ALL: [Direction4; 4] = [Self::Down, Self::Up, Self::Left, Self::Right];

    pub fn iter_all() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter()
    }

    /// Grid y grows downwards, so `Up` is `(0, -1)`.
    pub fn unit_vector(self) -> Vec2i {
        match self {
            Self::Up => [0, -1],
            Self::Left => [-1, 0],
            Self::Down => [0, 1],
            Self::Right => [1, 0],
        }
        .into()
    }

    pub fn move_vector(self, vec: Vec2i, distance: i32) -> Vec2i {
        vec + self.unit_vector() * distance
    }
}
