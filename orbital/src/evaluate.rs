//! Molecular orbital and electron density values on grid points.
//!
//! Orbitals are evaluated by a column kernel that is parallel over the
//! selected orbitals. When its preconditions do not hold it reports a
//! [`FastPath::Unsupported`] outcome and the evaluation is retried once
//! with a plain dense matrix product.

use crate::error::{ErrorKind, FieldError, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime switches of the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Try the parallel column kernel before the dense product.
    pub fast_path: bool,
    /// Report timings and fallbacks at `info` level.
    pub verbose: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            fast_path: true,
            verbose: false,
        }
    }
}

/// Outcome of a fast-path attempt.
#[derive(Debug)]
pub enum FastPath<T> {
    Done(T),
    /// A precondition failed; the error says which.
    Unsupported(FieldError),
}

/// How the electron density is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityNorm {
    /// Plain occupation-weighted sum of squares.
    #[default]
    Raw,
    /// Integrate to the sum of the occupations.
    Occupation,
    /// Integrate to the given electron count.
    Target(f64),
}

/// Runs `fast` and falls back to `dense` on a shape or precondition failure.
///
/// A failing fallback reports the fast path's error.
fn dispatch<T>(
    what: &str,
    config: &EvaluatorConfig,
    fast: impl FnOnce() -> FastPath<T>,
    dense: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if !config.fast_path {
        return dense();
    }
    match fast() {
        FastPath::Done(value) => Ok(value),
        FastPath::Unsupported(err) if err.kind() == ErrorKind::Shape => {
            if config.verbose {
                info!("Falling back to dense {} evaluation: {}", what, err);
            } else {
                debug!("Falling back to dense {} evaluation: {}", what, err);
            }
            dense().map_err(|_| err)
        }
        FastPath::Unsupported(err) => Err(err),
    }
}

/// Values of the orbitals in `vector` at `npts` grid points.
///
/// `bvs` is (grid points x basis functions) and `cmat` is (basis functions
/// x orbitals). Returns a (grid points x `vector.len()`) matrix whose
/// columns follow the order of `vector`.
pub fn evaluate_orbitals(
    npts: usize,
    bvs: &DMatrix<f64>,
    vector: &[usize],
    cmat: &DMatrix<f64>,
    config: &EvaluatorConfig,
) -> Result<DMatrix<f64>> {
    let start = Instant::now();
    let ovs = dispatch(
        "orbital",
        config,
        || orbitals_fast(npts, bvs, vector, cmat),
        || orbitals_dense(bvs, vector, cmat),
    )?;
    if config.verbose {
        info!(
            "Timing: {} orbitals on {} points - {:>8.2}s.",
            vector.len(),
            ovs.nrows(),
            start.elapsed().as_secs_f64()
        );
    }
    Ok(ovs)
}

/// Column kernel: every orbital is an independent axpy sweep over the
/// contiguous basis columns.
pub fn orbitals_fast(npts: usize, bvs: &DMatrix<f64>, vector: &[usize], cmat: &DMatrix<f64>) -> FastPath<DMatrix<f64>> {
    if vector.is_empty() {
        return FastPath::Unsupported(FieldError::UnsupportedFastPath("empty orbital vector"));
    }
    if bvs.nrows() != npts {
        return FastPath::Unsupported(FieldError::ShapeMismatch {
            context: "basis values vs grid points",
            expected: (npts, bvs.ncols()),
            found: bvs.shape(),
        });
    }
    if let Err(err) = check_product(bvs, vector, cmat) {
        return FastPath::Unsupported(err);
    }

    let columns: Vec<Vec<f64>> = vector
        .par_iter()
        .map(|&orb| {
            let mut out = vec![0.0; npts];
            for (b, &c) in cmat.column(orb).iter().enumerate() {
                for (o, &v) in out.iter_mut().zip(bvs.column(b).iter()) {
                    *o += c * v;
                }
            }
            out
        })
        .collect();

    FastPath::Done(DMatrix::from_vec(npts, vector.len(), columns.concat()))
}

/// Dense product `bvs * cmat[:, vector]`; the grid size is taken from `bvs`.
pub fn orbitals_dense(bvs: &DMatrix<f64>, vector: &[usize], cmat: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_product(bvs, vector, cmat)?;
    Ok(bvs * cmat.select_columns(vector.iter()))
}

fn check_product(bvs: &DMatrix<f64>, vector: &[usize], cmat: &DMatrix<f64>) -> Result<()> {
    if bvs.ncols() != cmat.nrows() {
        return Err(FieldError::ShapeMismatch {
            context: "basis values vs coefficient rows",
            expected: (bvs.nrows(), cmat.nrows()),
            found: bvs.shape(),
        });
    }
    if let Some(&index) = vector.iter().find(|&&i| i >= cmat.ncols()) {
        return Err(FieldError::IndexOutOfRange {
            context: "orbital vector",
            index,
            bound: cmat.ncols(),
        });
    }
    Ok(())
}

/// Electron density `sum_o occ[o] * ovs[:, o]^2`.
///
/// `dv` is the grid volume element, used only when `norm` rescales the
/// result. A density that integrates to zero is never rescaled.
pub fn evaluate_density(
    ovs: &DMatrix<f64>,
    occupations: &[f64],
    norm: DensityNorm,
    dv: f64,
    config: &EvaluatorConfig,
) -> Result<DVector<f64>> {
    let start = Instant::now();
    let mut rho = dispatch(
        "density",
        config,
        || density_fast(ovs, occupations),
        || density_dense(ovs, occupations),
    )?;

    let target = match norm {
        DensityNorm::Raw => None,
        DensityNorm::Occupation => Some(occupations.iter().sum::<f64>()),
        DensityNorm::Target(n) => Some(n),
    };
    if let Some(target) = target {
        let integral = rho.sum() * dv;
        if integral > 0.0 {
            rho *= target / integral;
        }
        debug!("Density integrates to {:.6} before scaling to {:.6}", integral, target);
    }

    if config.verbose {
        info!("Timing: compute density - {:>8.2}s.", start.elapsed().as_secs_f64());
    }
    Ok(rho)
}

fn check_occupations(ovs: &DMatrix<f64>, occupations: &[f64]) -> Result<()> {
    if occupations.len() != ovs.ncols() {
        return Err(FieldError::ShapeMismatch {
            context: "occupations vs orbital values",
            expected: (ovs.ncols(), 1),
            found: (occupations.len(), 1),
        });
    }
    Ok(())
}

fn density_fast(ovs: &DMatrix<f64>, occupations: &[f64]) -> FastPath<DVector<f64>> {
    if let Err(err) = check_occupations(ovs, occupations) {
        return FastPath::Unsupported(err);
    }
    let npts = ovs.nrows();
    let rho = (0..ovs.ncols())
        .into_par_iter()
        .map(|o| {
            let col = ovs.column(o);
            col.component_mul(&col) * occupations[o]
        })
        .reduce(|| DVector::zeros(npts), |a, b| a + b);
    FastPath::Done(rho)
}

fn density_dense(ovs: &DMatrix<f64>, occupations: &[f64]) -> Result<DVector<f64>> {
    check_occupations(ovs, occupations)?;
    Ok(ovs.component_mul(ovs) * DVector::from_column_slice(occupations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forced_dense() -> EvaluatorConfig {
        EvaluatorConfig {
            fast_path: false,
            verbose: false,
        }
    }

    fn sample() -> (DMatrix<f64>, DMatrix<f64>) {
        let bvs = DMatrix::from_fn(6, 3, |p, b| ((p + 1) as f64 * 0.3 + b as f64).sin());
        let cmat = DMatrix::from_row_slice(3, 3, &[0.5, -0.2, 0.0, 0.1, 0.9, 1.0, -0.7, 0.3, 0.0]);
        (bvs, cmat)
    }

    #[test]
    fn test_fast_matches_dense() {
        let (bvs, cmat) = sample();
        let vector = [2, 0];
        let fast = evaluate_orbitals(6, &bvs, &vector, &cmat, &EvaluatorConfig::default()).unwrap();
        let dense = evaluate_orbitals(6, &bvs, &vector, &cmat, &forced_dense()).unwrap();
        assert_eq!(fast.shape(), (6, 2));
        assert!((fast - dense).amax() < 1e-14);
    }

    #[test]
    fn test_falls_back_on_wrong_point_count() {
        let (bvs, cmat) = sample();
        assert!(matches!(
            orbitals_fast(10, &bvs, &[0], &cmat),
            FastPath::Unsupported(FieldError::ShapeMismatch { .. })
        ));
        // the dense path sizes itself from the basis values
        let ovs = evaluate_orbitals(10, &bvs, &[0], &cmat, &EvaluatorConfig::default()).unwrap();
        assert_eq!(ovs.shape(), (6, 1));
    }

    #[test]
    fn test_failed_fallback_reports_fast_error() {
        let (bvs, cmat) = sample();
        let err = evaluate_orbitals(6, &bvs, &[3], &cmat, &EvaluatorConfig::default()).unwrap_err();
        assert!(matches!(err, FieldError::IndexOutOfRange { index: 3, bound: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Shape);

        let short = DMatrix::<f64>::zeros(2, 3);
        let err = evaluate_orbitals(6, &bvs, &[0], &short, &EvaluatorConfig::default()).unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_non_finite_values_propagate_on_both_paths() {
        let mut bvs = DMatrix::from_element(3, 2, 0.5);
        bvs[(1, 1)] = f64::NAN;
        let cmat = DMatrix::from_row_slice(2, 1, &[1.0, 0.0]);
        let fast = evaluate_orbitals(3, &bvs, &[0], &cmat, &EvaluatorConfig::default()).unwrap();
        let dense = evaluate_orbitals(3, &bvs, &[0], &cmat, &forced_dense()).unwrap();
        assert!(fast[(1, 0)].is_nan() && dense[(1, 0)].is_nan());
        assert_eq!(fast[(0, 0)], dense[(0, 0)]);

        let ovs = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 0.5, 2.0]);
        let rho = evaluate_density(&ovs, &[2.0, 0.0], DensityNorm::Raw, 1.0, &EvaluatorConfig::default()).unwrap();
        let dense = evaluate_density(&ovs, &[2.0, 0.0], DensityNorm::Raw, 1.0, &forced_dense()).unwrap();
        assert!(rho[0].is_nan() && dense[0].is_nan());
        assert_eq!(rho[1], dense[1]);
    }

    #[test]
    fn test_density_weights_squares() {
        let ovs = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 0.5, 3.0]);
        let rho = evaluate_density(&ovs, &[2.0, 1.0], DensityNorm::Raw, 1.0, &EvaluatorConfig::default()).unwrap();
        assert!((rho[0] - 6.0).abs() < 1e-14);
        assert!((rho[1] - 9.5).abs() < 1e-14);

        let dense = evaluate_density(&ovs, &[2.0, 1.0], DensityNorm::Raw, 1.0, &forced_dense()).unwrap();
        assert!((rho - dense).amax() < 1e-14);
    }

    #[test]
    fn test_density_normalization() {
        let ovs = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 1.0]);
        let dv = 0.5;
        let rho = evaluate_density(&ovs, &[2.0], DensityNorm::Occupation, dv, &EvaluatorConfig::default()).unwrap();
        assert!((rho.sum() * dv - 2.0).abs() < 1e-12);

        let rho = evaluate_density(&ovs, &[2.0], DensityNorm::Target(10.0), dv, &EvaluatorConfig::default()).unwrap();
        assert!((rho.sum() * dv - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_density_is_not_rescaled() {
        let ovs = DMatrix::from_element(4, 2, 0.3);
        let rho = evaluate_density(&ovs, &[0.0, 0.0], DensityNorm::Target(2.0), 1.0, &EvaluatorConfig::default()).unwrap();
        assert!(rho.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_density_rejects_occupation_length() {
        let ovs = DMatrix::from_element(4, 2, 0.3);
        assert!(matches!(
            evaluate_density(&ovs, &[1.0], DensityNorm::Raw, 1.0, &EvaluatorConfig::default()),
            Err(FieldError::ShapeMismatch { .. })
        ));
    }
}
