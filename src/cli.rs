//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command line.
#[derive(Parser, Debug)]
#[command(name = "spacetruss")]
#[command(version)]
#[command(about = "Space truss analysis and discrete section sizing")]
pub struct Args {
    /// Action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse the structure in a JSON problem file
    Analyze {
        /// Problem file
        file: PathBuf,
        /// Use the incremental Newton-Raphson solver
        #[arg(long)]
        nonlinear: bool,
        /// Number of load increments for the nonlinear solver
        #[arg(long)]
        increments: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Size the members of a JSON problem file against its catalog
    Optimize {
        /// Problem file
        file: PathBuf,
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
        /// Maximum number of generations
        #[arg(long)]
        generations: Option<usize>,
        /// Evaluate candidates on a single thread
        #[arg(long)]
        serial: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the built-in tetrahedral tripod
    Benchmark {
        /// Use the incremental Newton-Raphson solver
        #[arg(long)]
        nonlinear: bool,
        /// Size the members before analysing
        #[arg(long)]
        optimize: bool,
    },
}
