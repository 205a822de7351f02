//! Configuration management for grid field calculations
//!
//! This module handles the YAML input: geometry, basis set files, orbital
//! data, grid parameters and the task to run.

mod args;

pub use args::Args;

use clap::ValueEnum;
use orbital::{DensityNorm, FieldParams, OrbitalSelection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub geometry: Vec<Atom>,
    /// Element symbol -> NWChem basis file.
    pub basis_sets: HashMap<String, String>,
    pub orbitals: OrbitalData,
    #[serde(default)]
    pub grid: Option<FieldParams>,
    #[serde(default)]
    pub task: TaskParams,
}

impl Config {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        self.grid = Some(self.grid.unwrap_or_default().with_defaults());
        self.task = self.task.with_defaults();
        self
    }
}

/// Atomic position configuration (bohr)
#[derive(Debug, Deserialize, Serialize)]
pub struct Atom {
    pub element: String,
    pub coords: [f64; 3],
    #[serde(default)]
    pub frame: usize,
}

/// Orbital coefficients and per-orbital columns
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OrbitalData {
    /// Named coefficient matrices, one row per basis function.
    pub coefficients: HashMap<String, Vec<Vec<f64>>>,
    /// Named per-orbital columns such as `occupation`.
    #[serde(default)]
    pub columns: HashMap<String, Vec<f64>>,
    /// Irrep label of every orbital.
    pub irreps: Option<Vec<usize>>,
    /// Irrep label of every basis function.
    pub basis_irreps: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Orbitals,
    Density,
    AngularMomentum,
}

/// Task selection and its options; unused options are ignored
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskParams {
    pub kind: Option<TaskKind>,
    pub mocoefs: Option<String>,
    pub vector: Option<OrbitalSelection>,
    pub irrep: Option<usize>,
    pub orbocc: Option<String>,
    pub norm: Option<DensityNorm>,
    pub rcoefs: Option<String>,
    pub icoefs: Option<String>,
    /// Magnetic axes, row by row.
    pub maxes: Option<[[f64; 3]; 3]>,
    pub with_current: Option<bool>,
    pub replace: Option<bool>,
    pub fast_path: Option<bool>,
    pub verbose: Option<bool>,
}

impl Default for TaskParams {
    fn default() -> Self {
        TaskParams {
            kind: Some(TaskKind::Orbitals),
            mocoefs: None,
            vector: None,
            irrep: None,
            orbocc: None,
            norm: Some(DensityNorm::Raw),
            rcoefs: None,
            icoefs: None,
            maxes: None,
            with_current: Some(false),
            replace: Some(false),
            fast_path: Some(true),
            verbose: Some(false),
        }
    }
}

impl TaskParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.kind.is_none() {
            self.kind = defaults.kind;
        }
        if self.norm.is_none() {
            self.norm = defaults.norm;
        }
        if self.with_current.is_none() {
            self.with_current = defaults.with_current;
        }
        if self.replace.is_none() {
            self.replace = defaults.replace;
        }
        if self.fast_path.is_none() {
            self.fast_path = defaults.fast_path;
        }
        if self.verbose.is_none() {
            self.verbose = defaults.verbose;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H2_YAML: &str = r#"
geometry:
  - element: H
    coords: [0.0, 0.0, -0.7]
  - element: H
    coords: [0.0, 0.0, 0.7]
basis_sets:
  H: sto-3g.h.nwchem
orbitals:
  coefficients:
    coef:
      - [0.5489, 1.2115]
      - [0.5489, -1.2115]
  columns:
    occupation: [2.0, 0.0]
grid:
  counts: [21, 21, 31]
task:
  kind: density
  norm: occupation
"#;

    #[test]
    fn test_parse_and_defaults() {
        let config: Config = serde_yml::from_str::<Config>(H2_YAML).unwrap().with_defaults();
        assert_eq!(config.geometry.len(), 2);
        assert_eq!(config.geometry[1].frame, 0);
        assert_eq!(config.orbitals.coefficients["coef"].len(), 2);
        assert_eq!(config.task.kind, Some(TaskKind::Density));
        assert_eq!(config.task.norm, Some(DensityNorm::Occupation));
        assert_eq!(config.task.fast_path, Some(true));

        let grid = config.grid.unwrap();
        assert_eq!(grid.counts, Some([21, 21, 31]));
        assert_eq!(grid.margin, Some(orbital::grid::DEFAULT_MARGIN));
    }

    #[test]
    fn test_orbital_selections() {
        let task: TaskParams = serde_yml::from_str("vector: 3").unwrap();
        assert_eq!(task.vector, Some(OrbitalSelection::Index(3)));
        let task: TaskParams = serde_yml::from_str("vector: [1, 2, 5]").unwrap();
        assert_eq!(task.vector, Some(OrbitalSelection::List(vec![1, 2, 5])));
        let task: TaskParams = serde_yml::from_str("vector: {start: 2, end: 4}").unwrap();
        assert_eq!(task.vector, Some(OrbitalSelection::Range(2..4)));
    }
}
