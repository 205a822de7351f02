//! Probability current density and orbital angular momentum fields.

use crate::error::{FieldError, Result};
use crate::evaluate::orbitals_dense;
use crate::grid::GridCoordinates;
use crate::universe::OCCUPATION_TOLERANCE;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use num_complex::Complex64;
use rayon::prelude::*;

/// Current density `j = sum_o occ[o] * Im(conj(psi_o) * grad psi_o)` with
/// `psi_o = bvs * (rcoefs + i icoefs)[:, o]`.
///
/// `grad` holds the x, y and z derivative values of the basis functions on
/// the same points as `bvs`. Every column of the coefficient matrices is an
/// orbital; those with negligible occupation are skipped. Both coefficient
/// matrices are required and checked before anything is computed. There is
/// no fallback: any shape mismatch is an error.
pub fn current_density(
    bvs: &DMatrix<f64>,
    grad: &[DMatrix<f64>; 3],
    rcoefs: Option<&DMatrix<f64>>,
    icoefs: Option<&DMatrix<f64>>,
    occupations: &[f64],
) -> Result<[DVector<f64>; 3]> {
    let (rcoefs, icoefs) = match (rcoefs, icoefs) {
        (Some(r), Some(i)) => (r, i),
        _ => return Err(FieldError::MissingComponents),
    };
    check_inputs(bvs, grad, rcoefs, icoefs, occupations)?;

    let vector: Vec<usize> = occupations
        .iter()
        .enumerate()
        .filter(|&(_, &o)| o.abs() > OCCUPATION_TOLERANCE)
        .map(|(i, _)| i)
        .collect();
    let npts = bvs.nrows();
    if vector.is_empty() {
        return Ok([DVector::zeros(npts), DVector::zeros(npts), DVector::zeros(npts)]);
    }
    let occ: Vec<f64> = vector.iter().map(|&i| occupations[i]).collect();

    let real = orbitals_dense(bvs, &vector, rcoefs)?;
    let imag = orbitals_dense(bvs, &vector, icoefs)?;

    let mut current = [DVector::zeros(npts), DVector::zeros(npts), DVector::zeros(npts)];
    for (axis, component) in current.iter_mut().enumerate() {
        let dreal = orbitals_dense(&grad[axis], &vector, rcoefs)?;
        let dimag = orbitals_dense(&grad[axis], &vector, icoefs)?;
        let values: Vec<f64> = (0..npts)
            .into_par_iter()
            .map(|p| {
                occ.iter()
                    .enumerate()
                    .map(|(o, &w)| {
                        let psi = Complex64::new(real[(p, o)], imag[(p, o)]);
                        let dpsi = Complex64::new(dreal[(p, o)], dimag[(p, o)]);
                        w * (psi.conj() * dpsi).im
                    })
                    .sum::<f64>()
            })
            .collect();
        *component = DVector::from_vec(values);
    }
    Ok(current)
}

fn check_inputs(
    bvs: &DMatrix<f64>,
    grad: &[DMatrix<f64>; 3],
    rcoefs: &DMatrix<f64>,
    icoefs: &DMatrix<f64>,
    occupations: &[f64],
) -> Result<()> {
    if let Some(g) = grad.iter().find(|g| g.shape() != bvs.shape()) {
        return Err(FieldError::ShapeMismatch {
            context: "basis derivatives vs basis values",
            expected: bvs.shape(),
            found: g.shape(),
        });
    }
    if rcoefs.shape() != icoefs.shape() {
        return Err(FieldError::ShapeMismatch {
            context: "imaginary vs real coefficients",
            expected: rcoefs.shape(),
            found: icoefs.shape(),
        });
    }
    if rcoefs.nrows() != bvs.ncols() {
        return Err(FieldError::ShapeMismatch {
            context: "coefficient rows vs basis functions",
            expected: (bvs.ncols(), rcoefs.ncols()),
            found: rcoefs.shape(),
        });
    }
    if occupations.len() != rcoefs.ncols() {
        return Err(FieldError::ShapeMismatch {
            context: "occupations vs coefficient columns",
            expected: (rcoefs.ncols(), 1),
            found: (occupations.len(), 1),
        });
    }
    Ok(())
}

/// Orbital angular momentum density `maxes * (r x j)` at every grid point.
///
/// `maxes` is applied as given; it is not checked for orthogonality.
pub fn angular_momentum(
    coords: &GridCoordinates,
    current: &[DVector<f64>; 3],
    maxes: &Matrix3<f64>,
) -> Result<[DVector<f64>; 3]> {
    let npts = coords.len();
    if let Some(c) = current.iter().find(|c| c.len() != npts) {
        return Err(FieldError::ShapeMismatch {
            context: "current density vs grid points",
            expected: (npts, 3),
            found: (c.len(), 3),
        });
    }

    let moments: Vec<Vector3<f64>> = (0..npts)
        .into_par_iter()
        .map(|p| {
            let j = Vector3::new(current[0][p], current[1][p], current[2][p]);
            maxes * coords.position(p).cross(&j)
        })
        .collect();

    Ok([0usize, 1, 2].map(|axis| DVector::from_iterator(npts, moments.iter().map(|m| m[axis]))))
}
