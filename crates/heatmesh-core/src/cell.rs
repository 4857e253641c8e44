//! Cell actor: the per-cell control loop.
//!
//! ```text
//! for t in 0..N:
//!     drain check -> update -> exchange(t) -> swap
//! emit results
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::emit::{emit_subgrid, ResultSink};
use crate::error::Result;
use crate::halo::HaloExchange;
use crate::link::{CellPorts, LinkCounters};
use crate::partition::{CellId, MeshGeometry, Position};
use crate::subgrid::{BoundaryConditions, LocalState};

/// Summary of one finished cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellReport {
    /// Cell identifier.
    pub cell: CellId,
    /// Cell position.
    pub position: Position,
    /// Iterations completed.
    pub iterations: u32,
    /// Edges that arrived one iteration early.
    pub early_arrivals: u64,
    /// Result words emitted.
    pub emitted: usize,
    /// Wall time spent in the control loop.
    pub elapsed: Duration,
}

/// One mesh cell with its private state and links.
#[derive(Debug)]
pub struct CellActor {
    id: CellId,
    position: Position,
    state: LocalState,
    halo: HaloExchange,
}

impl CellActor {
    /// Build the actor for `ports.cell()`.
    pub fn new(
        geometry: &MeshGeometry,
        ports: CellPorts,
        size: usize,
        boundary: &BoundaryConditions,
        counters: Arc<LinkCounters>,
    ) -> Result<Self> {
        let id = ports.cell();
        let position = geometry.position(id)?;
        let neighbors = geometry.neighbors(id)?;
        let state = LocalState::new(size, &neighbors, boundary);
        let halo = HaloExchange::new(ports, size, counters)?;

        Ok(Self {
            id,
            position,
            state,
            halo,
        })
    }

    /// Cell identifier.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Cell position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Local state.
    pub fn state(&self) -> &LocalState {
        &self.state
    }

    /// Run one iteration.
    pub async fn step(&mut self, iteration: u32) -> Result<u64> {
        self.halo.ensure_drained()?;
        self.state.update();
        let report = self
            .halo
            .exchange(iteration, &self.state.outgoing, &mut self.state.incoming)
            .await?;
        self.state.swap();
        Ok(report.early as u64)
    }

    /// Run `iterations` iterations, then emit the subgrid into `sink`.
    pub async fn run(mut self, iterations: u32, sink: Arc<dyn ResultSink>) -> Result<CellReport> {
        let start = Instant::now();
        debug!(
            "{} starting at ({}, {}) with {} neighbors",
            self.id,
            self.position.x,
            self.position.y,
            self.halo.neighbor_count()
        );

        let mut early_arrivals = 0;
        for t in 0..iterations {
            early_arrivals += self.step(t).await?;
        }

        let emitted = emit_subgrid(self.position, self.state.current(), sink.as_ref());
        let elapsed = start.elapsed();
        debug!("{} finished {} iterations in {:?}", self.id, iterations, elapsed);

        Ok(CellReport {
            cell: self.id,
            position: self.position,
            iterations,
            early_arrivals,
            emitted,
            elapsed,
        })
    }
}
