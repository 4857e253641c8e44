//! Sequential whole-grid solver.
//!
//! Runs the same fixed-point update over the global `(L*S) x (L*S)` grid
//! with a one-wide ring holding the boundary temperatures. Each mesh cell
//! consumes its neighbors' previous-iteration edges, so a mesh run must
//! match this solver bit for bit.

use std::mem;

use crate::fixed::Fixed;
use crate::subgrid::BoundaryConditions;
use crate::update::next_temperature;

/// Global grid solved without messaging.
#[derive(Debug, Clone)]
pub struct ReferenceSolver {
    side: usize,
    /// Padded width, `side + 2`.
    width: usize,
    current: Vec<Fixed>,
    next: Vec<Fixed>,
    iterations: u32,
}

impl ReferenceSolver {
    /// Create a zeroed `side x side` grid surrounded by `boundary`.
    pub fn new(side: usize, boundary: &BoundaryConditions) -> Self {
        let width = side + 2;
        let mut current = vec![Fixed::ZERO; width * width];

        for k in 1..=side {
            current[k] = boundary.north;
            current[(width - 1) * width + k] = boundary.south;
            current[k * width] = boundary.west;
            current[k * width + width - 1] = boundary.east;
        }
        let next = current.clone();

        Self {
            side,
            width,
            current,
            next,
            iterations: 0,
        }
    }

    /// Grid side length.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Iterations applied so far.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Value at global `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Fixed {
        self.current[(row + 1) * self.width + col + 1]
    }

    /// Apply one iteration.
    pub fn step(&mut self) {
        let w = self.width;
        for i in 1..=self.side {
            for j in 1..=self.side {
                let idx = i * w + j;
                self.next[idx] = next_temperature(
                    self.current[idx],
                    self.current[idx - w],
                    self.current[idx + w],
                    self.current[idx + 1],
                    self.current[idx - 1],
                );
            }
        }
        mem::swap(&mut self.current, &mut self.next);
        self.iterations += 1;
    }

    /// Apply `iterations` iterations.
    pub fn run(&mut self, iterations: u32) {
        for _ in 0..iterations {
            self.step();
        }
    }

    /// Temperature bytes in row-major order.
    pub fn temperature_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.side * self.side);
        for row in 0..self.side {
            for col in 0..self.side {
                bytes.push(self.get(row, col).temperature_byte());
            }
        }
        bytes
    }
}
