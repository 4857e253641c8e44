//! Cardinal directions and direction-indexed storage.

use std::ops::{Index, IndexMut};

/// Direction to a neighboring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward y - 1.
    North,
    /// Toward y + 1.
    South,
    /// Toward x + 1.
    East,
    /// Toward x - 1.
    West,
}

impl Direction {
    /// All four cardinal directions, in wire-code order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Get the opposite direction.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Two-bit code used in frame headers.
    pub fn code(self) -> u32 {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }

    /// Decode a two-bit header code.
    pub fn from_code(code: u32) -> Option<Direction> {
        match code {
            0 => Some(Direction::North),
            1 => Some(Direction::South),
            2 => Some(Direction::East),
            3 => Some(Direction::West),
            _ => None,
        }
    }
}

/// One value per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionMap<T> {
    north: T,
    south: T,
    east: T,
    west: T,
}

impl<T> DirectionMap<T> {
    /// Build a map by evaluating `f` for every direction.
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self {
            north: f(Direction::North),
            south: f(Direction::South),
            east: f(Direction::East),
            west: f(Direction::West),
        }
    }

    /// Iterate `(direction, value)` pairs in [`Direction::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().map(move |d| (d, &self[d]))
    }

    /// Map every value, keeping the direction.
    pub fn map<U>(self, mut f: impl FnMut(Direction, T) -> U) -> DirectionMap<U> {
        DirectionMap {
            north: f(Direction::North, self.north),
            south: f(Direction::South, self.south),
            east: f(Direction::East, self.east),
            west: f(Direction::West, self.west),
        }
    }
}

impl<T> Index<Direction> for DirectionMap<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        match direction {
            Direction::North => &self.north,
            Direction::South => &self.south,
            Direction::East => &self.east,
            Direction::West => &self.west,
        }
    }
}

impl<T> IndexMut<Direction> for DirectionMap<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
            Direction::East => &mut self.east,
            Direction::West => &mut self.west,
        }
    }
}
