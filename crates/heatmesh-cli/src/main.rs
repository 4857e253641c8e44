//! heatmesh CLI - run and inspect message-passing heat diffusion meshes.
//!
//! # Commands
//!
//! - `heatmesh run` - Run a mesh and write the resulting heat map
//! - `heatmesh inspect --cell <id>` - Show a cell's position and neighbors
//! - `heatmesh completions <shell>` - Generate shell completions
//!
//! # Examples
//!
//! ```bash
//! # 8x8 cells, 7x7 values each, 1000 iterations, written as PPM
//! heatmesh run --output heat.ppm
//!
//! # Small run checked against the sequential solver
//! heatmesh run --cells 16 --iterations 50 --verify
//!
//! # Where does cell 9 sit in a 4x4 mesh?
//! heatmesh inspect --cells 16 --cell 9
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::{inspect, run, OutputFormat};

/// heatmesh - 2D heat diffusion on a mesh of message-passing cells
#[derive(Parser)]
#[command(name = "heatmesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mesh and collect the heat map
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of cells (power of two with even log2)
        #[arg(long)]
        cells: Option<u32>,

        /// Iterations to run
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Message length in 32-bit words (subgrid side + 1)
        #[arg(short, long)]
        message_words: Option<usize>,

        /// Output file for the heat map
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "ppm")]
        format: OutputFormat,

        /// Compare the result against the sequential solver
        #[arg(long)]
        verify: bool,
    },

    /// Show a cell's position, neighbors and global origin
    Inspect {
        /// Cell identifier
        #[arg(long)]
        cell: u32,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of cells (power of two with even log2)
        #[arg(long)]
        cells: Option<u32>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            cells,
            iterations,
            message_words,
            output,
            format,
            verify,
        } => {
            let overrides = run::Overrides {
                cells,
                iterations,
                message_words,
            };
            run::execute(
                config.as_deref(),
                overrides,
                output.as_deref(),
                format,
                verify,
                cli.quiet,
            )
            .await
        }

        Commands::Inspect {
            cell,
            config,
            cells,
        } => inspect::execute(cell, config.as_deref(), cells),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "heatmesh", &mut std::io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
