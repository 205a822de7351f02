use crate::cgto::{ContractedGTO, ElementBasis};
use crate::error::{BasisError, Result};
use crate::gto::Direction;
use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;
use std::collections::HashMap;

/// Grid evaluation of an ordered set of basis functions.
///
/// Implementations return a (grid points x basis functions) matrix whose
/// column order is the basis-set order of the implementation.
pub trait BasisFunctions: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of every basis function, or of those in `irrep` only.
    fn evaluate(&self, x: &[f64], y: &[f64], z: &[f64], irrep: Option<usize>) -> Result<DMatrix<f64>>;

    /// First derivatives along `axis` of every basis function.
    fn evaluate_diff(&self, x: &[f64], y: &[f64], z: &[f64], axis: Direction) -> Result<DMatrix<f64>>;
}

/// A basis function placed on an atom.
#[derive(Debug, Clone)]
pub struct BasisFunction {
    pub atom: usize,
    pub irrep: Option<usize>,
    pub cgto: ContractedGTO,
}

/// Cartesian Gaussian basis for a whole molecule.
#[derive(Debug, Clone, Default)]
pub struct GtoBasisSet {
    pub functions: Vec<BasisFunction>,
}

impl GtoBasisSet {
    /// Places each element basis on the atoms of that element, in atom order.
    pub fn from_atoms(
        symbols: &[String],
        coords: &[Vector3<f64>],
        element_bases: &HashMap<String, ElementBasis>,
    ) -> Result<Self> {
        let mut functions = Vec::new();
        for (atom, (symbol, center)) in symbols.iter().zip(coords).enumerate() {
            let basis = element_bases
                .get(symbol)
                .ok_or_else(|| BasisError::MissingElement(symbol.clone()))?;
            for shell in &basis.shells {
                functions.extend(shell.place(*center).into_iter().map(|cgto| BasisFunction {
                    atom,
                    irrep: None,
                    cgto,
                }));
            }
        }
        Ok(GtoBasisSet { functions })
    }

    /// Tags every function with a symmetry label.
    pub fn with_irreps(mut self, irreps: &[usize]) -> Self {
        for (f, &irrep) in self.functions.iter_mut().zip(irreps) {
            f.irrep = Some(irrep);
        }
        self
    }

    pub fn irreps(&self) -> Option<Vec<usize>> {
        self.functions.iter().map(|f| f.irrep).collect()
    }

    fn selected(&self, irrep: Option<usize>) -> Result<Vec<&BasisFunction>> {
        match irrep {
            None => Ok(self.functions.iter().collect()),
            Some(label) => {
                if self.functions.iter().any(|f| f.irrep.is_none()) {
                    return Err(BasisError::NoIrreps);
                }
                Ok(self.functions.iter().filter(|f| f.irrep == Some(label)).collect())
            }
        }
    }
}

fn check_grid(x: &[f64], y: &[f64], z: &[f64]) -> Result<usize> {
    if x.len() != y.len() || x.len() != z.len() {
        return Err(BasisError::GridLength {
            x: x.len(),
            y: y.len(),
            z: z.len(),
        });
    }
    Ok(x.len())
}

// Column-major assembly: one rayon task per basis function.
fn evaluate_columns<F>(functions: &[&BasisFunction], x: &[f64], y: &[f64], z: &[f64], f: F) -> DMatrix<f64>
where
    F: Fn(&ContractedGTO, &Vector3<f64>) -> f64 + Sync,
{
    let npts = x.len();
    let columns: Vec<Vec<f64>> = functions
        .par_iter()
        .map(|bf| {
            (0..npts)
                .map(|p| f(&bf.cgto, &Vector3::new(x[p], y[p], z[p])))
                .collect()
        })
        .collect();
    DMatrix::from_vec(npts, functions.len(), columns.concat())
}

impl BasisFunctions for GtoBasisSet {
    fn len(&self) -> usize {
        self.functions.len()
    }

    fn evaluate(&self, x: &[f64], y: &[f64], z: &[f64], irrep: Option<usize>) -> Result<DMatrix<f64>> {
        check_grid(x, y, z)?;
        let functions = self.selected(irrep)?;
        Ok(evaluate_columns(&functions, x, y, z, |cgto, r| cgto.evaluate(r)))
    }

    fn evaluate_diff(&self, x: &[f64], y: &[f64], z: &[f64], axis: Direction) -> Result<DMatrix<f64>> {
        check_grid(x, y, z)?;
        let functions = self.selected(None)?;
        Ok(evaluate_columns(&functions, x, y, z, |cgto, r| cgto.derivative(r, axis)))
    }
}
