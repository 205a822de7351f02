use crate::config::Config;
use crate::io::load_basis_file;
use basis::{BasisFunctions, GtoBasisSet};
use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::{DMatrix, Vector3};
use orbital::{Atom, BasisSetOrder, MoMatrix, OrbitalTable, Universe};
use periodic_table_on_an_enum::Element;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build the universe described by the configuration.
///
/// Basis functions are placed on the atoms of `frame`.
pub fn build_universe(config: &Config, base: &Path, frame: usize) -> Result<Universe> {
    info!("\nPreparing geometry...");
    let mut atoms = Vec::with_capacity(config.geometry.len());
    for atom in &config.geometry {
        let element = Element::from_symbol(&atom.element)
            .ok_or_else(|| eyre!("Invalid element symbol: {}", atom.element))?;
        atoms.push(Atom::new(element.get_symbol(), Vector3::from(atom.coords), atom.frame));
    }

    let (symbols, coords): (Vec<String>, Vec<Vector3<f64>>) = atoms
        .iter()
        .filter(|a| a.frame == frame)
        .map(|a| (a.symbol.clone(), a.position))
        .unzip();
    if symbols.is_empty() {
        return Err(eyre!("Frame {} has no atoms", frame));
    }

    info!("\nPreparing basis sets...");
    let mut element_bases = HashMap::new();
    for symbol in &symbols {
        if element_bases.contains_key(symbol) {
            continue;
        }
        let path = config
            .basis_sets
            .get(symbol)
            .ok_or_else(|| eyre!("No basis set file given for {}", symbol))?;
        element_bases.insert(symbol.clone(), load_basis_file(symbol, path, base)?);
    }

    let mut basis = GtoBasisSet::from_atoms(&symbols, &coords, &element_bases)?;
    if let Some(irreps) = &config.orbitals.basis_irreps {
        if irreps.len() != basis.len() {
            return Err(eyre!("{} basis irreps given for {} basis functions", irreps.len(), basis.len()));
        }
        basis = basis.with_irreps(irreps);
    }
    info!("{} basis functions on {} atoms", basis.len(), symbols.len());
    let order = BasisSetOrder {
        atom: basis.functions.iter().map(|f| f.atom).collect(),
        irrep: basis.irreps(),
    };

    let momatrix = build_momatrix(config, basis.len())?;
    let mut orbital = OrbitalTable::new(momatrix.norb());
    for (name, values) in &config.orbitals.columns {
        orbital = orbital
            .with_column(name, values.clone())
            .wrap_err_with(|| format!("Invalid orbital column '{}'", name))?;
    }
    if let Some(irreps) = &config.orbitals.irreps {
        orbital = orbital.with_irreps(irreps.clone()).wrap_err("Invalid orbital irreps")?;
    }

    let mut uni = Universe::new(atoms)
        .with_momatrix(momatrix)
        .with_orbital(orbital)
        .with_basis_functions(Arc::new(basis))
        .with_basis_set_order(order);
    uni.compute_cartesian_gtf_order(element_bases.values().map(|b| b.lmax()).max().unwrap_or(0));
    Ok(uni)
}

fn build_momatrix(config: &Config, nbasis: usize) -> Result<MoMatrix> {
    let mut shape: Option<(usize, usize)> = None;
    let mut matrices = Vec::new();
    for (name, rows) in &config.orbitals.coefficients {
        let norb = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != norb) {
            return Err(eyre!("Coefficient matrix '{}' has ragged rows", name));
        }
        if rows.len() != nbasis {
            return Err(eyre!(
                "Coefficient matrix '{}' has {} rows for {} basis functions",
                name,
                rows.len(),
                nbasis
            ));
        }
        match shape {
            Some(s) if s != (nbasis, norb) => {
                return Err(eyre!("Coefficient matrix '{}' does not match the other matrices", name))
            }
            _ => shape = Some((nbasis, norb)),
        }
        matrices.push((name, DMatrix::from_row_slice(nbasis, norb, &rows.concat())));
    }

    let (nbasis, norb) = shape.ok_or_else(|| eyre!("No coefficient matrices given"))?;
    let mut momatrix = MoMatrix::new(nbasis, norb);
    for (name, matrix) in matrices {
        momatrix = momatrix.with_column(name, matrix)?;
    }
    Ok(momatrix)
}
