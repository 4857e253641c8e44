//! `heatmesh run` command - Run a mesh and write the heat map.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use colored::Colorize;
use heatmesh_core::mesh::run_verified;
use heatmesh_core::{HeatMesh, MeshRun};
use tracing::debug;

use super::{load_config, OutputFormat};
use crate::error::CliResult;

/// Command-line values taking precedence over file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Cell count.
    pub cells: Option<u32>,
    /// Iteration count.
    pub iterations: Option<u32>,
    /// Message length in words.
    pub message_words: Option<usize>,
}

/// Execute the `run` command.
pub async fn execute(
    config_path: Option<&Path>,
    overrides: Overrides,
    output: Option<&Path>,
    format: OutputFormat,
    verify: bool,
    quiet: bool,
) -> CliResult<()> {
    let mut config = load_config(config_path, overrides.cells)?;
    if let Some(iterations) = overrides.iterations {
        config.iterations = iterations;
    }
    if let Some(words) = overrides.message_words {
        config.message_words = words;
    }
    config.validate()?;
    debug!("Effective configuration:\n{}", toml::to_string(&config)?);

    if !quiet {
        println!("{} Running heat mesh", "→".bright_cyan());
        println!(
            "  {} Cells: {}",
            "•".dimmed(),
            config.cells.to_string().bright_yellow()
        );
        println!(
            "  {} Subgrid: {}x{}",
            "•".dimmed(),
            config.edge_len(),
            config.edge_len()
        );
        println!(
            "  {} Iterations: {}",
            "•".dimmed(),
            config.iterations.to_string().bright_yellow()
        );
        println!();
    }

    let run = if verify {
        run_verified(config).await?
    } else {
        HeatMesh::new(config)?.run().await?
    };

    if let Some(path) = output {
        let writer = BufWriter::new(File::create(path)?);
        match format {
            OutputFormat::Ppm => run.heat_map.write_ppm(writer)?,
            OutputFormat::Csv => run.heat_map.write_csv(writer)?,
        }
    }

    if !quiet {
        print_summary(&run, output, verify);
    }

    Ok(())
}

fn print_summary(run: &MeshRun, output: Option<&Path>, verified: bool) {
    println!("{}:", "Run Summary".bright_white().underline());
    println!(
        "  {} Grid: {}x{}",
        "•".dimmed(),
        run.heat_map.side(),
        run.heat_map.side()
    );
    println!(
        "  {} Elapsed: {:.3?} ({:.1} iterations/s)",
        "•".dimmed(),
        run.elapsed,
        run.throughput()
    );
    println!(
        "  {} Frames: {} sent, {} early",
        "•".dimmed(),
        run.stats.frames_sent,
        run.stats.early_arrivals
    );
    println!(
        "  {} Mean temperature: {:.2}",
        "•".dimmed(),
        run.heat_map.mean()
    );

    if verified {
        println!("  {} Matches sequential solver", "✓".green());
    }
    if let Some(path) = output {
        println!(
            "  {} Heat map written to {}",
            "✓".green(),
            path.display().to_string().bright_white()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heat.csv");
        let overrides = Overrides {
            cells: Some(4),
            iterations: Some(3),
            message_words: Some(3),
        };

        execute(None, overrides, Some(path.as_path()), OutputFormat::Csv, true, true)
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("row,col,temp"));
        // 2x2 cells of 2x2 values
        assert_eq!(lines.count(), 16);
    }

    #[tokio::test]
    async fn test_run_rejects_bad_cell_count() {
        let overrides = Overrides {
            cells: Some(8),
            ..Overrides::default()
        };
        let result = execute(None, overrides, None, OutputFormat::Ppm, false, true).await;
        assert!(result.is_err());
    }
}
