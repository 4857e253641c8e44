//! # heatmesh core
//!
//! 2D heat diffusion on a square mesh of independently scheduled cells.
//!
//! Every cell owns an `S x S` subgrid of Q16.16 temperatures and runs on its
//! own tokio task. Cells share no memory: once per iteration each one swaps
//! border edges with its four cardinal neighbors over bounded per-direction
//! links. There is no global barrier. A neighbor may run one iteration
//! ahead, and its early edge is held in a lookahead slot until the receiving
//! cell catches up.
//!
//! ## Components
//!
//! - [`MeshGeometry`] - cell positions and neighbor tables
//! - [`LocalState`] - double-buffered subgrid and edge buffers
//! - [`HaloExchange`] - per-iteration edge exchange with early-arrival buffering
//! - [`CellActor`] - the per-cell control loop
//! - [`HeatMesh`] - spawns cells and assembles a [`HeatMap`]
//! - [`ReferenceSolver`] - sequential solver used to verify mesh output
//!
//! ## Example
//!
//! ```ignore
//! use heatmesh_core::prelude::*;
//!
//! let config = MeshConfigBuilder::new().cells(16).iterations(100).build()?;
//! let run = HeatMesh::new(config)?.run().await?;
//! println!("mean temperature {:.1}", run.heat_map.mean());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod config;
pub mod direction;
pub mod emit;
pub mod error;
pub mod fixed;
pub mod halo;
pub mod heatmap;
pub mod link;
pub mod mesh;
pub mod message;
pub mod partition;
pub mod reference;
pub mod subgrid;
pub mod update;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cell::{CellActor, CellReport};
    pub use crate::config::{BoundaryConfig, MeshConfig, MeshConfigBuilder};
    pub use crate::direction::{Direction, DirectionMap};
    pub use crate::emit::{ChannelSink, MemorySink, ResultSink, ResultWord};
    pub use crate::error::{MeshError, Result};
    pub use crate::fixed::Fixed;
    pub use crate::halo::{ExchangeReport, HaloExchange};
    pub use crate::heatmap::HeatMap;
    pub use crate::link::{CellPorts, LinkConfig, LinkFabric, LinkStats};
    pub use crate::mesh::{reference_heat_map, run_verified, HeatMesh, MeshRun};
    pub use crate::message::{Frame, HaloMessage};
    pub use crate::partition::{CellId, MeshGeometry, NeighborTable, Position};
    pub use crate::reference::ReferenceSolver;
    pub use crate::subgrid::{BoundaryConditions, EdgeBuffer, LocalState, Parity, Subgrid};
}

pub use cell::{CellActor, CellReport};
pub use config::MeshConfig;
pub use error::{MeshError, Result};
pub use halo::HaloExchange;
pub use heatmap::HeatMap;
pub use mesh::{HeatMesh, MeshRun};
pub use partition::MeshGeometry;
pub use reference::ReferenceSolver;
pub use subgrid::LocalState;
