//! `heatmesh inspect` command - Show where a cell sits in the mesh.

use std::path::Path;

use colored::Colorize;
use heatmesh_core::direction::Direction;
use heatmesh_core::partition::CellId;

use super::load_config;
use crate::error::CliResult;

/// Execute the `inspect` command.
pub fn execute(cell: u32, config_path: Option<&Path>, cells: Option<u32>) -> CliResult<()> {
    let config = load_config(config_path, cells)?;
    config.validate()?;
    let geometry = config.geometry()?;

    let id = CellId(cell);
    let position = geometry.position(id)?;
    let neighbors = geometry.neighbors(id)?;
    let size = config.edge_len() as u32;

    println!(
        "{} {} in a {}x{} mesh",
        "→".bright_cyan(),
        id.to_string().bright_white(),
        geometry.side(),
        geometry.side()
    );
    println!("  {} Position: x={} y={}", "•".dimmed(), position.x, position.y);
    println!(
        "  {} Global origin: row {} col {}",
        "•".dimmed(),
        position.y * size,
        position.x * size
    );

    for d in Direction::ALL {
        let label = format!("{:?}", d);
        match neighbors.get(d) {
            Some(n) => println!("  {} {:<5} {}", "•".dimmed(), label, n.to_string().bright_yellow()),
            None => {
                let boundary = config.boundary().temperature(d);
                println!(
                    "  {} {:<5} {} ({})",
                    "•".dimmed(),
                    label,
                    "boundary".dimmed(),
                    boundary
                )
            }
        }
    }

    Ok(())
}
