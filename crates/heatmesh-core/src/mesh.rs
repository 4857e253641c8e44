//! Mesh runner.
//!
//! Builds one [`CellActor`] per cell, runs each on its own tokio task and
//! collects the result words into a [`HeatMap`]. The runner only wires
//! links and drains results; it never touches cell state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cell::{CellActor, CellReport};
use crate::config::MeshConfig;
use crate::emit::{ChannelSink, ResultSink};
use crate::error::{MeshError, Result};
use crate::heatmap::HeatMap;
use crate::link::{LinkFabric, LinkStats};
use crate::partition::MeshGeometry;
use crate::reference::ReferenceSolver;

/// Outcome of a mesh run.
#[derive(Debug, Clone)]
pub struct MeshRun {
    /// Collected temperatures.
    pub heat_map: HeatMap,
    /// Link delivery counters.
    pub stats: LinkStats,
    /// Per-cell reports, ordered by cell id.
    pub reports: Vec<CellReport>,
    /// Iterations run.
    pub iterations: u32,
    /// Wall time from spawn to the last result word.
    pub elapsed: Duration,
}

impl MeshRun {
    /// Iterations per second across the whole mesh.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            f64::from(self.iterations) / secs
        } else {
            0.0
        }
    }
}

/// A wired mesh ready to run.
pub struct HeatMesh {
    config: MeshConfig,
    geometry: MeshGeometry,
    fabric: LinkFabric,
    cells: Vec<CellActor>,
}

impl HeatMesh {
    /// Validate `config`, wire the links and build every cell.
    pub fn new(config: MeshConfig) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let fabric = LinkFabric::new(config.link_config());
        let boundary = config.boundary();
        let size = config.edge_len();

        let cells = fabric
            .wire(&geometry)?
            .into_iter()
            .map(|ports| CellActor::new(&geometry, ports, size, &boundary, fabric.counters()))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Created HeatMesh: {}x{} cells, {}x{} values per cell, {}x{} global grid",
            geometry.side(),
            geometry.side(),
            size,
            size,
            global_side(&config, &geometry),
            global_side(&config, &geometry)
        );

        Ok(Self {
            config,
            geometry,
            fabric,
            cells,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Mesh geometry.
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Side length of the global grid.
    pub fn global_side(&self) -> usize {
        global_side(&self.config, &self.geometry)
    }

    /// Run every cell to completion and collect the results.
    ///
    /// On the first cell failure the remaining cells are aborted and the
    /// error is returned.
    pub async fn run(self) -> Result<MeshRun> {
        let side = self.global_side();
        let iterations = self.config.iterations;
        let start = Instant::now();

        let (sink, mut results) = ChannelSink::new();
        let sink: Arc<dyn ResultSink> = Arc::new(sink);

        let mut tasks = JoinSet::new();
        for cell in self.cells {
            tasks.spawn(cell.run(iterations, Arc::clone(&sink)));
        }
        drop(sink);

        let mut reports = Vec::with_capacity(self.geometry.cells() as usize);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| MeshError::CellFailed(e.to_string()))
                .and_then(|report| report);
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!("Aborting mesh after cell failure: {}", e);
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }
        reports.sort_by_key(|r| r.cell);

        // Every sink clone is gone once all cells have returned.
        let mut words = Vec::with_capacity(side * side);
        while let Some(word) = results.recv().await {
            words.push(word);
        }
        let heat_map = HeatMap::from_words(side, words)?;
        let elapsed = start.elapsed();
        let stats = self.fabric.stats();

        info!(
            "HeatMesh finished {} iterations in {:?}: {} frames, {} early arrivals",
            iterations, elapsed, stats.frames_sent, stats.early_arrivals
        );

        Ok(MeshRun {
            heat_map,
            stats,
            reports,
            iterations,
            elapsed,
        })
    }
}

impl std::fmt::Debug for HeatMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatMesh")
            .field("config", &self.config)
            .field("geometry", &self.geometry)
            .field("cells", &self.cells.len())
            .finish()
    }
}

fn global_side(config: &MeshConfig, geometry: &MeshGeometry) -> usize {
    geometry.side() as usize * config.edge_len()
}

/// Solve `config` sequentially and return the expected heat map.
pub fn reference_heat_map(config: &MeshConfig) -> Result<HeatMap> {
    config.validate()?;
    let side = global_side(config, &config.geometry()?);
    let mut solver = ReferenceSolver::new(side, &config.boundary());
    solver.run(config.iterations);
    HeatMap::from_bytes(side, solver.temperature_bytes())
}

/// Run `config` and compare against the sequential solver.
pub async fn run_verified(config: MeshConfig) -> Result<MeshRun> {
    let expected = reference_heat_map(&config)?;
    let run = HeatMesh::new(config)?.run().await?;

    let diff = run.heat_map.diff(&expected);
    if let Some(&(row, col, ours, theirs)) = diff.first() {
        return Err(MeshError::ResultMismatch(format!(
            "{} positions differ from the reference, first at ({}, {}): {} != {}",
            diff.len(),
            row,
            col,
            ours,
            theirs
        )));
    }

    info!("Mesh output matches the sequential solver");
    Ok(run)
}
