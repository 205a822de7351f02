//! Grid field command-line interface
//!
//! Evaluates molecular orbitals, electron densities or orbital angular
//! momentum on a grid, as described by a YAML configuration.

use color_eyre::eyre::Result;

mod app;
mod config;
mod io;

use app::OrbitalApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    OrbitalApplication::from_cli()?.run()
}
