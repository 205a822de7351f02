//! Basis set loading utilities

use basis::ElementBasis;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load an element basis from an NWChem-format file.
///
/// Relative paths are resolved against `base`, normally the directory of
/// the configuration file.
pub fn load_basis_file(symbol: &str, path: &str, base: &Path) -> Result<ElementBasis> {
    let full = base.join(path);
    info!("Loading basis for {} from {}", symbol, full.display());
    let text = fs::read_to_string(&full).wrap_err_with(|| format!("Failed to read basis set file: {}", full.display()))?;
    let basis = ElementBasis::parse_nwchem(&text).wrap_err_with(|| format!("Failed to parse basis set file: {}", full.display()))?;
    if !basis.symbol.eq_ignore_ascii_case(symbol) {
        return Err(eyre!("Basis file {} is for {}, not {}", full.display(), basis.symbol, symbol));
    }
    debug!("{} shells for {}", basis.shells.len(), symbol);
    Ok(basis)
}
