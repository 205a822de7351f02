//! Command-line argument parsing for grid field calculations

use super::TaskKind;
use clap::Parser;

/// Evaluate orbitals, densities or angular momentum on a grid from a YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "orbital/example/h2_density.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the task to run
    #[arg(long, value_enum)]
    pub task: Option<TaskKind>,

    /// Report progress, timings and fallbacks
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the parallel orbital kernel and use the dense product only
    #[arg(long)]
    pub no_fast_path: bool,

    /// Override grid points per axis
    #[arg(long)]
    pub points: Option<usize>,

    /// Frame to evaluate
    #[arg(long)]
    pub frame: Option<usize>,

    /// Write a JSON summary of the computed fields to this file
    #[arg(long)]
    pub summary: Option<String>,
}
