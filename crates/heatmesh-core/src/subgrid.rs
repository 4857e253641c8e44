//! Per-cell subgrid state.
//!
//! ```text
//!            incoming[North]
//!          +----------------+
//!  incoming|   current      |incoming
//!  [West]  |   S x S        |[East]
//!          |                |
//!          +----------------+
//!            incoming[South]
//! ```
//!
//! Each cell owns two subgrids (current and next) that swap after every
//! completed exchange, plus one incoming and one outgoing edge per direction.
//! Incoming edges facing the outside of the mesh hold the boundary
//! temperature for the whole run.

use crate::direction::{Direction, DirectionMap};
use crate::fixed::Fixed;
use crate::partition::NeighborTable;

/// Square matrix of fixed-point temperatures, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgrid {
    size: usize,
    cells: Vec<Fixed>,
}

impl Subgrid {
    /// Create a zeroed `size x size` subgrid.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Fixed::ZERO; size * size],
        }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row * size + col` is out of range.
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> Fixed {
        self.cells[row * self.size + col]
    }

    /// Set the value at `(row, col)`.
    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, value: Fixed) {
        self.cells[row * self.size + col] = value;
    }

    /// Iterate `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Fixed)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (i / self.size, i % self.size, *v))
    }
}

/// One border of a subgrid, `S` values long.
///
/// North/South edges are indexed by column, East/West edges by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeBuffer(Vec<Fixed>);

impl EdgeBuffer {
    /// Create an edge filled with `value`.
    pub fn filled(len: usize, value: Fixed) -> Self {
        Self(vec![value; len])
    }

    /// Create an edge from explicit values.
    pub fn from_values(values: Vec<Fixed>) -> Self {
        Self(values)
    }

    /// Edge length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the edge has no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values along the edge.
    pub fn values(&self) -> &[Fixed] {
        &self.0
    }

    #[inline(always)]
    pub(crate) fn get(&self, i: usize) -> Fixed {
        self.0[i]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, i: usize, value: Fixed) {
        self.0[i] = value;
    }
}

/// Iteration index mod 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// Even iteration.
    Even,
    /// Odd iteration.
    Odd,
}

impl Parity {
    /// Parity of `iteration`.
    pub fn of(iteration: u32) -> Self {
        if iteration & 1 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    /// Header bit.
    pub fn bit(self) -> u32 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    /// Parity encoded by the low bit of `bits`.
    pub fn from_bit(bits: u32) -> Self {
        Self::of(bits)
    }
}

/// Fixed temperatures held at the outer edges of the whole mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryConditions {
    /// Temperature beyond the north edge.
    pub north: Fixed,
    /// Temperature beyond the south edge.
    pub south: Fixed,
    /// Temperature beyond the east edge.
    pub east: Fixed,
    /// Temperature beyond the west edge.
    pub west: Fixed,
}

impl BoundaryConditions {
    /// Temperature beyond the mesh edge in `direction`.
    pub fn temperature(&self, direction: Direction) -> Fixed {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }
}

impl Default for BoundaryConditions {
    fn default() -> Self {
        Self {
            north: Fixed::HOT,
            south: Fixed::COLD,
            east: Fixed::COLD,
            west: Fixed::HOT,
        }
    }
}

/// Double-buffered subgrid plus edge buffers owned by one cell.
#[derive(Debug, Clone)]
pub struct LocalState {
    pub(crate) current: Subgrid,
    pub(crate) next: Subgrid,
    pub(crate) incoming: DirectionMap<EdgeBuffer>,
    pub(crate) outgoing: DirectionMap<EdgeBuffer>,
}

impl LocalState {
    /// Create the initial state of a cell.
    ///
    /// Everything starts at zero except incoming edges with no neighbor,
    /// which are seeded with the matching boundary temperature.
    pub fn new(size: usize, neighbors: &NeighborTable, boundary: &BoundaryConditions) -> Self {
        let incoming = DirectionMap::from_fn(|d| {
            let seed = if neighbors.is_boundary(d) {
                boundary.temperature(d)
            } else {
                Fixed::ZERO
            };
            EdgeBuffer::filled(size, seed)
        });

        Self {
            current: Subgrid::new(size),
            next: Subgrid::new(size),
            incoming,
            outgoing: DirectionMap::from_fn(|_| EdgeBuffer::filled(size, Fixed::ZERO)),
        }
    }

    /// Subgrid side length.
    pub fn size(&self) -> usize {
        self.current.size()
    }

    /// Current subgrid.
    pub fn current(&self) -> &Subgrid {
        &self.current
    }

    /// Edge most recently received (or the boundary seed) for `direction`.
    pub fn incoming(&self, direction: Direction) -> &EdgeBuffer {
        &self.incoming[direction]
    }

    /// Edge staged for transmission in `direction`.
    pub fn outgoing(&self, direction: Direction) -> &EdgeBuffer {
        &self.outgoing[direction]
    }

    /// Swap current and next subgrids.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{CellId, MeshGeometry};

    #[test]
    fn test_parity() {
        assert_eq!(Parity::of(0), Parity::Even);
        assert_eq!(Parity::of(7), Parity::Odd);
        assert_eq!(Parity::from_bit(Parity::Odd.bit()), Parity::Odd);
    }

    #[test]
    fn test_boundary_seeding_on_corner_cell() {
        let geometry = MeshGeometry::new(4).unwrap();
        let neighbors = geometry.neighbors(CellId(0)).unwrap();
        let state = LocalState::new(3, &neighbors, &BoundaryConditions::default());

        assert_eq!(state.incoming(Direction::North), &EdgeBuffer::filled(3, Fixed::HOT));
        assert_eq!(state.incoming(Direction::West), &EdgeBuffer::filled(3, Fixed::HOT));
        assert_eq!(state.incoming(Direction::East), &EdgeBuffer::filled(3, Fixed::ZERO));
        assert_eq!(state.incoming(Direction::South), &EdgeBuffer::filled(3, Fixed::ZERO));
        assert!(state.current().iter().all(|(_, _, v)| v == Fixed::ZERO));
    }

    #[test]
    fn test_single_cell_sees_all_boundaries() {
        let geometry = MeshGeometry::new(1).unwrap();
        let neighbors = geometry.neighbors(CellId(0)).unwrap();
        let state = LocalState::new(2, &neighbors, &BoundaryConditions::default());

        assert_eq!(state.incoming(Direction::South).values(), &[Fixed::COLD; 2]);
        assert_eq!(state.incoming(Direction::East).values(), &[Fixed::COLD; 2]);
    }

    #[test]
    fn test_swap_exchanges_buffers() {
        let geometry = MeshGeometry::new(1).unwrap();
        let neighbors = geometry.neighbors(CellId(0)).unwrap();
        let mut state = LocalState::new(2, &neighbors, &BoundaryConditions::default());
        state.next.set(1, 1, Fixed::from_int(9));
        state.swap();
        assert_eq!(state.current().get(1, 1), Fixed::from_int(9));
        assert_eq!(state.next.get(1, 1), Fixed::ZERO);
    }
}
