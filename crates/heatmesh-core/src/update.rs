//! Update engine.
//!
//! Every position averages its four neighbors, reading subgrid interior
//! values or, on the border, the matching incoming edge. The new value is
//! computed as `old - (old - average)` in wrapping fixed-point arithmetic;
//! the two subtractions are kept rather than folded into `average`.

use crate::direction::Direction;
use crate::fixed::Fixed;
use crate::subgrid::LocalState;

/// New temperature for a cell from its old value and four neighbors.
#[inline(always)]
pub fn next_temperature(old: Fixed, north: Fixed, south: Fixed, east: Fixed, west: Fixed) -> Fixed {
    let surroundings = (north + south + west + east).quarter();
    old - (old - surroundings)
}

impl LocalState {
    /// Compute the next subgrid and stage outgoing edges.
    ///
    /// Reads `current` and the incoming edges, writes `next` and the
    /// outgoing edges. Call [`LocalState::swap`] once the exchange for this
    /// iteration has completed.
    pub fn update(&mut self) {
        let size = self.current.size();
        let Some(last) = size.checked_sub(1) else {
            return;
        };

        for y in 0..size {
            for x in 0..size {
                let old = self.current.get(y, x);
                let west = if x == 0 {
                    self.incoming[Direction::West].get(y)
                } else {
                    self.current.get(y, x - 1)
                };
                let east = if x == last {
                    self.incoming[Direction::East].get(y)
                } else {
                    self.current.get(y, x + 1)
                };
                let north = if y == 0 {
                    self.incoming[Direction::North].get(x)
                } else {
                    self.current.get(y - 1, x)
                };
                let south = if y == last {
                    self.incoming[Direction::South].get(x)
                } else {
                    self.current.get(y + 1, x)
                };

                let new = next_temperature(old, north, south, east, west);
                self.next.set(y, x, new);

                if y == 0 {
                    self.outgoing[Direction::North].set(x, new);
                }
                if y == last {
                    self.outgoing[Direction::South].set(x, new);
                }
                if x == 0 {
                    self.outgoing[Direction::West].set(y, new);
                }
                if x == last {
                    self.outgoing[Direction::East].set(y, new);
                }
            }
        }
    }
}
