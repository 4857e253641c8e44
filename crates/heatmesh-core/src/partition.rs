//! Grid partitioning: cell positions and neighbor tables.
//!
//! Cells form an `L x L` square where `L = sqrt(P)`. A cell identifier is
//! split into `(x, y)` at bit `log2(L)`, so `P` must be a power of two with
//! an even exponent.

use std::fmt;

use crate::direction::{Direction, DirectionMap};
use crate::error::{MeshError, Result};

/// Linear identifier of a mesh cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell_{}", self.0)
    }
}

/// Position of a cell in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Column in the mesh (grows toward East).
    pub x: u32,
    /// Row in the mesh (grows toward South).
    pub y: u32,
}

/// Validated mesh dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshGeometry {
    cells: u32,
    log_side: u32,
}

impl MeshGeometry {
    /// Create a geometry for `cells` cells.
    ///
    /// Fails unless `cells` is a power of two whose log2 is even.
    pub fn new(cells: u32) -> Result<Self> {
        if !cells.is_power_of_two() {
            return Err(MeshError::InvalidCellCount(cells));
        }
        let log_cells = cells.trailing_zeros();
        if log_cells % 2 != 0 {
            return Err(MeshError::InvalidCellCount(cells));
        }
        Ok(Self {
            cells,
            log_side: log_cells / 2,
        })
    }

    /// Total number of cells `P`.
    pub fn cells(&self) -> u32 {
        self.cells
    }

    /// Side length `L` of the mesh in cells.
    pub fn side(&self) -> u32 {
        1 << self.log_side
    }

    /// log2 of the side length.
    pub fn log_side(&self) -> u32 {
        self.log_side
    }

    /// Iterate every cell identifier.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.cells).map(CellId)
    }

    fn check(&self, id: CellId) -> Result<()> {
        if id.0 >= self.cells {
            return Err(MeshError::CellOutOfRange {
                cell: id.0,
                cells: self.cells,
            });
        }
        Ok(())
    }

    /// Position of a cell.
    pub fn position(&self, id: CellId) -> Result<Position> {
        self.check(id)?;
        Ok(Position {
            x: id.0 & (self.side() - 1),
            y: id.0 >> self.log_side,
        })
    }

    /// Identifier of the cell at `position`, if it lies inside the mesh.
    pub fn cell_id(&self, position: Position) -> Option<CellId> {
        let side = self.side();
        (position.x < side && position.y < side)
            .then(|| CellId((position.y << self.log_side) | position.x))
    }

    /// Compute the neighbor table of a cell.
    pub fn neighbors(&self, id: CellId) -> Result<NeighborTable> {
        let Position { x, y } = self.position(id)?;
        let last = self.side() - 1;
        let table = DirectionMap::from_fn(|direction| {
            let neighbor = match direction {
                Direction::North if y > 0 => Position { x, y: y - 1 },
                Direction::South if y < last => Position { x, y: y + 1 },
                Direction::East if x < last => Position { x: x + 1, y },
                Direction::West if x > 0 => Position { x: x - 1, y },
                _ => return None,
            };
            self.cell_id(neighbor)
        });
        Ok(NeighborTable(table))
    }
}

/// Neighbor of a cell in each direction; `None` at the mesh boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTable(DirectionMap<Option<CellId>>);

impl NeighborTable {
    /// Neighbor in `direction`.
    pub fn get(&self, direction: Direction) -> Option<CellId> {
        self.0[direction]
    }

    /// Directions that have a neighbor, in [`Direction::ALL`] order.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.0.iter().filter(|(_, n)| n.is_some()).map(|(d, _)| d)
    }

    /// Number of existing neighbors.
    pub fn count(&self) -> usize {
        self.directions().count()
    }

    /// True if there is no neighbor in `direction`.
    pub fn is_boundary(&self, direction: Direction) -> bool {
        self.0[direction].is_none()
    }
}
