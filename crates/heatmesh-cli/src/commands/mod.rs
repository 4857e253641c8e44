//! CLI command implementations.

pub mod inspect;
pub mod run;

use std::path::Path;

use heatmesh_core::MeshConfig;

use crate::error::CliResult;

/// Heat map file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Binary PPM image
    Ppm,
    /// `row,col,temp` lines
    Csv,
}

/// Load configuration from an optional file, then apply a cell count override.
pub fn load_config(path: Option<&Path>, cells: Option<u32>) -> CliResult<MeshConfig> {
    let mut config = MeshConfig::load(path)?;
    if let Some(cells) = cells {
        config.cells = cells;
    }
    Ok(config)
}
