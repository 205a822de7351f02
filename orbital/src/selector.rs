//! Which molecular orbitals to put on the grid.

use crate::error::{FieldError, Result};
use crate::universe::{Universe, OCCUPATION_COLUMN};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Orbitals below the HOMO included in the default window.
pub const WINDOW_BELOW_HOMO: usize = 5;
/// Orbitals above the LUMO included in the default window.
pub const WINDOW_ABOVE_LUMO: usize = 7;
/// Below this many orbitals every orbital is selected by default.
pub const SMALL_SYSTEM_ORBITALS: usize = 10;

/// Explicit orbital selection. Indices are local to the irrep block when
/// an irrep is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrbitalSelection {
    Index(usize),
    List(Vec<usize>),
    Range(Range<usize>),
}

impl OrbitalSelection {
    pub fn indices(&self) -> Vec<usize> {
        match self {
            OrbitalSelection::Index(i) => vec![*i],
            OrbitalSelection::List(v) => v.clone(),
            OrbitalSelection::Range(r) => r.clone().collect(),
        }
    }
}

impl From<usize> for OrbitalSelection {
    fn from(index: usize) -> Self {
        OrbitalSelection::Index(index)
    }
}

impl From<Vec<usize>> for OrbitalSelection {
    fn from(indices: Vec<usize>) -> Self {
        OrbitalSelection::List(indices)
    }
}

impl From<Range<usize>> for OrbitalSelection {
    fn from(range: Range<usize>) -> Self {
        OrbitalSelection::Range(range)
    }
}

/// Resolves the orbital vector to evaluate.
///
/// Without an explicit selection the window HOMO-5 ..= LUMO+7 is used,
/// with the HOMO taken from the occupation column of the orbital table or,
/// failing that, from half the nuclear charge of `frame`. A window from the
/// nuclear charge is built over global indices and then mapped onto the
/// block; it is an error if none of the block falls inside it.
pub fn select_orbitals(
    uni: &Universe,
    selection: Option<&OrbitalSelection>,
    irrep: Option<usize>,
    frame: usize,
) -> Result<Vec<usize>> {
    let block = uni.orbital_block(irrep).map_err(|e| match e {
        FieldError::MissingTable(_) => FieldError::NoOrbitalSource,
        other => other,
    })?;
    let norb = block.len();

    if let Some(selection) = selection {
        let vector = selection.indices();
        if vector.is_empty() {
            return Err(FieldError::EmptySelection);
        }
        if let Some(&index) = vector.iter().find(|&&i| i >= norb) {
            return Err(FieldError::OrbitalOutOfRange { index, count: norb });
        }
        return Ok(vector);
    }

    if norb == 0 {
        return Err(FieldError::NoOrbitalSource);
    }
    if norb < SMALL_SYSTEM_ORBITALS {
        return Ok((0..norb).collect());
    }

    match homo_index(uni, &block, frame)? {
        Homo::Local(homo) => {
            let (lo, hi) = window_bounds(homo);
            Ok((lo..=hi.min(norb - 1)).collect())
        }
        Homo::Global(homo) => {
            let (lo, hi) = window_bounds(homo);
            let window: Vec<usize> = block
                .iter()
                .enumerate()
                .filter(|&(_, g)| (lo..=hi).contains(g))
                .map(|(local, _)| local)
                .collect();
            if window.is_empty() {
                let count = block.last().map_or(0, |&g| g + 1);
                return Err(FieldError::OrbitalOutOfRange { index: lo, count });
            }
            Ok(window)
        }
    }
}

/// HOMO position, either within the block or as a global orbital index.
enum Homo {
    Local(Option<usize>),
    Global(Option<usize>),
}

fn homo_index(uni: &Universe, block: &[usize], frame: usize) -> Result<Homo> {
    if let Ok(orbital) = uni.orbital() {
        if orbital.has_column(OCCUPATION_COLUMN) {
            return orbital.homo(OCCUPATION_COLUMN, block).map(Homo::Local);
        }
    }
    if uni.frame().is_empty() {
        return Err(FieldError::NoOrbitalSource);
    }
    let pairs = (uni.nuclear_charge(frame)? as f64 / 2.0).round() as usize;
    Ok(Homo::Global(pairs.checked_sub(1)))
}

/// Inclusive bounds HOMO-5 ..= LUMO+7.
fn window_bounds(homo: Option<usize>) -> (usize, usize) {
    let (lo, lumo) = match homo {
        Some(h) => (h.saturating_sub(WINDOW_BELOW_HOMO), h + 1),
        None => (0, 0),
    };
    (lo, lumo + WINDOW_ABOVE_LUMO)
}
