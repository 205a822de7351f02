//! Public field operations on a [`Universe`].
//!
//! Each operation resolves its grid and inputs from the universe, evaluates
//! the basis functions once, computes its field and then either attaches it
//! to the universe or hands it back, see [`Attachment`].

use crate::current::{angular_momentum, current_density};
use crate::error::{FieldError, Result};
use crate::evaluate::{self, DensityNorm, EvaluatorConfig};
use crate::field::{attach_field, make_field, Attachment, Field, FieldValues};
use crate::grid::{resolve_grid, FieldParams, GridCoordinates, GridSpec};
use crate::selector::{select_orbitals, OrbitalSelection};
use crate::universe::{Universe, COEF_COLUMN, LIMAG_COLUMN, LREAL_COLUMN, OCCUPATION_COLUMN, OCCUPATION_TOLERANCE};
use basis::Direction;
use nalgebra::{DMatrix, Matrix3};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct OrbitalOptions {
    pub field_params: Option<FieldParams>,
    /// Coefficient column, `coef` when unset.
    pub mocoefs: Option<String>,
    /// Orbitals to evaluate; a window around the HOMO when unset.
    pub vector: Option<OrbitalSelection>,
    /// Restrict basis functions and orbitals to one irrep.
    pub irrep: Option<usize>,
    pub frame: usize,
    pub attachment: Attachment,
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DensityOptions {
    pub field_params: Option<FieldParams>,
    /// Coefficient column, `coef` when unset.
    pub mocoefs: Option<String>,
    /// Occupation column. Defaults to the coefficient column's name when
    /// that is not `coef`, and to `occupation` otherwise.
    pub orbocc: Option<String>,
    pub frame: usize,
    pub norm: DensityNorm,
    pub attachment: Attachment,
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AngularMomentumOptions {
    pub field_params: Option<FieldParams>,
    /// Real coefficient column, conventionally `lreal`. Required.
    pub rcoefs: Option<String>,
    /// Imaginary coefficient column, conventionally `limag`. Required.
    pub icoefs: Option<String>,
    /// Occupation column, the real coefficient column's name when unset.
    pub orbocc: Option<String>,
    pub frame: usize,
    /// Magnetic axes; the identity when unset.
    pub maxes: Option<Matrix3<f64>>,
    /// Also keep the current density as a field of its own.
    pub with_current: bool,
    pub attachment: Attachment,
    pub evaluator: EvaluatorConfig,
}

impl AngularMomentumOptions {
    /// Options using the conventional `lreal`/`limag` columns.
    pub fn conventional() -> Self {
        AngularMomentumOptions {
            rcoefs: Some(LREAL_COLUMN.to_string()),
            icoefs: Some(LIMAG_COLUMN.to_string()),
            ..Default::default()
        }
    }
}

/// Grid, coordinates and basis values shared by every operation.
struct Setup {
    start: Instant,
    grids: Vec<GridSpec>,
    coords: GridCoordinates,
    bvs: DMatrix<f64>,
}

fn setup(
    uni: &Universe,
    field_params: Option<&FieldParams>,
    frame: usize,
    count: usize,
    irrep: Option<usize>,
    verbose: bool,
) -> Result<Setup> {
    let start = Instant::now();
    let nbf = uni.basis_count(irrep)?;
    if verbose {
        info!("Evaluating {} basis functions once.", nbf);
    }

    let mut params = field_params.cloned().unwrap_or_default();
    let frame = *params.frame.get_or_insert(frame);
    let atoms = if uni.atoms().is_empty() {
        None
    } else {
        Some(uni.positions(frame)?)
    };
    let grids = resolve_grid(Some(&params), atoms.as_deref(), count)?;
    let coords = grids[0].coordinates();
    debug!("Grid {:?} with {} points", grids[0].counts, coords.len());

    let bvs = uni
        .basis_functions()?
        .evaluate(&coords.x, &coords.y, &coords.z, irrep)?;
    Ok(Setup {
        start,
        grids,
        coords,
        bvs,
    })
}

fn teardown(uni: &mut Universe, field: Field, setup: &Setup, what: &str, attachment: Attachment, verbose: bool) -> Result<Option<Field>> {
    if verbose {
        info!("Timing: compute {} - {:>8.2}s.", what, setup.start.elapsed().as_secs_f64());
    }
    attach_field(uni, field, attachment)
}

/// Evaluates molecular orbitals on a grid, one field entry per orbital.
///
/// With an irrep the orbital indices are local to that irrep's block.
pub fn evaluate_orbitals(uni: &mut Universe, opts: &OrbitalOptions) -> Result<Option<Field>> {
    let column = uni.check_column("momatrix", opts.mocoefs.as_deref(), COEF_COLUMN)?;
    let vector = select_orbitals(uni, opts.vector.as_ref(), opts.irrep, opts.frame)?;
    let cmat = uni.square(&column, opts.irrep)?;
    let setup = setup(
        uni,
        opts.field_params.as_ref(),
        opts.frame,
        vector.len(),
        opts.irrep,
        opts.evaluator.verbose,
    )?;

    let ovs = evaluate::evaluate_orbitals(setup.coords.len(), &setup.bvs, &vector, &cmat, &opts.evaluator)?;
    let values = ovs
        .column_iter()
        .map(|c| FieldValues::Scalar(c.into_owned()))
        .collect();
    let labels = vector
        .iter()
        .map(|i| match opts.irrep {
            Some(irrep) => format!("{} orbital {} (irrep {})", column, i, irrep),
            None => format!("{} orbital {}", column, i),
        })
        .collect();
    let field = make_field(values, labels, &setup.grids)?;
    teardown(uni, field, &setup, "orbitals", opts.attachment, opts.evaluator.verbose)
}

/// Evaluates the electron density of the occupied orbitals.
pub fn evaluate_density(uni: &mut Universe, opts: &DensityOptions) -> Result<Option<Field>> {
    let column = uni.check_column("momatrix", opts.mocoefs.as_deref(), COEF_COLUMN)?;
    let default_occ = if column != COEF_COLUMN {
        column.as_str()
    } else {
        OCCUPATION_COLUMN
    };
    let orbocc = uni.check_column("orbital", opts.orbocc.as_deref(), default_occ)?;

    let all_occ = uni.orbital()?.column(&orbocc)?;
    let vector: Vec<usize> = all_occ
        .iter()
        .enumerate()
        .filter(|&(_, &o)| o.abs() > OCCUPATION_TOLERANCE)
        .map(|(i, _)| i)
        .collect();
    let occupations: Vec<f64> = vector.iter().map(|&i| all_occ[i]).collect();
    let cmat = uni.square(&column, None)?;

    let setup = setup(uni, opts.field_params.as_ref(), opts.frame, 1, None, opts.evaluator.verbose)?;
    let npts = setup.coords.len();

    let rho = if vector.is_empty() {
        debug!("No occupied orbitals in column '{}'", orbocc);
        nalgebra::DVector::zeros(npts)
    } else {
        let ovs = evaluate::evaluate_orbitals(npts, &setup.bvs, &vector, &cmat, &opts.evaluator)?;
        evaluate::evaluate_density(&ovs, &occupations, opts.norm, setup.grids[0].volume_element(), &opts.evaluator)?
    };

    let field = make_field(vec![FieldValues::Scalar(rho)], vec![format!("{} density", orbocc)], &setup.grids)?;
    teardown(uni, field, &setup, "density", opts.attachment, opts.evaluator.verbose)
}

/// Evaluates the orbital angular momentum density `maxes * (r x j)` from
/// the current density of a complex coefficient pair.
pub fn evaluate_current_and_angular_momentum(uni: &mut Universe, opts: &AngularMomentumOptions) -> Result<Option<Field>> {
    let (rname, iname) = match (opts.rcoefs.as_deref(), opts.icoefs.as_deref()) {
        (Some(r), Some(i)) => (r, i),
        _ => return Err(FieldError::MissingComponents),
    };
    let rcol = uni.check_column("momatrix", Some(rname), LREAL_COLUMN)?;
    let icol = uni.check_column("momatrix", Some(iname), LIMAG_COLUMN)?;
    let orbocc = uni.check_column("orbital", opts.orbocc.as_deref(), &rcol)?;
    let maxes = match opts.maxes {
        Some(m) => m,
        None => {
            if opts.evaluator.verbose {
                info!("If magnetic axes are not an identity matrix, specify maxes.");
            }
            Matrix3::identity()
        }
    };

    let occupations = uni.orbital()?.column(&orbocc)?.to_vec();
    let rcoefs = uni.square(&rcol, None)?;
    let icoefs = uni.square(&icol, None)?;

    let setup = setup(uni, opts.field_params.as_ref(), opts.frame, 1, None, opts.evaluator.verbose)?;
    let basis = uni.basis_functions()?;
    let (x, y, z) = (&setup.coords.x, &setup.coords.y, &setup.coords.z);
    let grad = [
        basis.evaluate_diff(x, y, z, Direction::X)?,
        basis.evaluate_diff(x, y, z, Direction::Y)?,
        basis.evaluate_diff(x, y, z, Direction::Z)?,
    ];
    if opts.evaluator.verbose {
        info!("Timing: grid evaluation  - {:>8.2}s.", setup.start.elapsed().as_secs_f64());
    }

    let current = current_density(&setup.bvs, &grad, Some(&rcoefs), Some(&icoefs), &occupations)?;
    if opts.evaluator.verbose {
        info!("Timing: current density  - {:>8.2}s.", setup.start.elapsed().as_secs_f64());
    }
    let moment = angular_momentum(&setup.coords, &current, &maxes)?;

    let mut values = vec![FieldValues::Vector(moment)];
    let mut labels = vec!["orbital angular momentum".to_string()];
    if opts.with_current {
        values.push(FieldValues::Vector(current));
        labels.push("current density".to_string());
    }
    let grids = vec![setup.grids[0]; values.len()];
    let field = make_field(values, labels, &grids)?;
    teardown(uni, field, &setup, "angular momentum", opts.attachment, opts.evaluator.verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{Atom, MoMatrix, OrbitalTable};
    use basis::{ElementBasis, GtoBasisSet};
    use nalgebra::Vector3;
    use std::collections::HashMap;
    use std::sync::Arc;

    const H_STO3G: &str = "\
BASIS \"ao basis\" PRINT
H    S
      3.42525091             0.15432897
      0.62391373             0.53532814
      0.16885540             0.44463454
END
";

    fn h2() -> Universe {
        let element = ElementBasis::parse_nwchem(H_STO3G).unwrap();
        let mut library = HashMap::new();
        library.insert("H".to_string(), element);
        let symbols = vec!["H".to_string(), "H".to_string()];
        let coords = vec![Vector3::new(0.0, 0.0, -0.7), Vector3::new(0.0, 0.0, 0.7)];
        let basis = GtoBasisSet::from_atoms(&symbols, &coords, &library).unwrap();

        let s = 1.0 / 2f64.sqrt();
        let coef = DMatrix::from_row_slice(2, 2, &[s, s, s, -s]);
        let momatrix = MoMatrix::new(2, 2).with_column(COEF_COLUMN, coef).unwrap();
        let orbital = OrbitalTable::new(2)
            .with_column(OCCUPATION_COLUMN, vec![2.0, 0.0])
            .unwrap();
        Universe::new(vec![Atom::new("H", coords[0], 0), Atom::new("H", coords[1], 0)])
            .with_momatrix(momatrix)
            .with_orbital(orbital)
            .with_basis_functions(Arc::new(basis))
    }

    fn small_grid() -> FieldParams {
        FieldParams {
            counts: Some([5, 5, 7]),
            margin: Some(2.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_orbitals_attach_one_entry_per_orbital() {
        let mut uni = h2();
        let opts = OrbitalOptions {
            field_params: Some(small_grid()),
            ..Default::default()
        };
        assert!(evaluate_orbitals(&mut uni, &opts).unwrap().is_none());
        let field = uni.field().unwrap();
        assert_eq!(field.len(), 2);
        assert_eq!(field.grid(0).unwrap().npoints(), 5 * 5 * 7);
        assert!(uni.traits_need_update());
    }

    #[test]
    fn test_density_uses_occupied_orbitals() {
        let mut uni = h2();
        let opts = DensityOptions {
            field_params: Some(small_grid()),
            attachment: Attachment {
                inplace: false,
                replace: false,
            },
            ..Default::default()
        };
        let field = evaluate_density(&mut uni, &opts).unwrap().unwrap();
        assert_eq!(field.len(), 1);
        assert_eq!(field.entries()[0].label, "occupation density");
        let rho = field.values(0).and_then(|v| v.as_scalar()).unwrap();
        assert!(rho.iter().all(|&r| r >= 0.0));
        assert!(rho.amax() > 0.0);
        assert!(uni.field().is_none());
    }

    #[test]
    fn test_missing_column_is_a_configuration_error() {
        let mut uni = h2();
        let opts = OrbitalOptions {
            mocoefs: Some("lreal".into()),
            ..Default::default()
        };
        let err = evaluate_orbitals(&mut uni, &opts).unwrap_err();
        assert!(matches!(err, FieldError::MissingColumn { table: "momatrix", .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_frame() {
        let mut uni = h2();
        let opts = OrbitalOptions {
            frame: 3,
            ..Default::default()
        };
        assert!(matches!(evaluate_orbitals(&mut uni, &opts), Err(FieldError::FrameNotFound(3))));
    }

    #[test]
    fn test_angular_momentum_requires_both_columns() {
        let mut uni = h2();
        let opts = AngularMomentumOptions {
            rcoefs: Some(COEF_COLUMN.into()),
            ..Default::default()
        };
        assert!(matches!(
            evaluate_current_and_angular_momentum(&mut uni, &opts),
            Err(FieldError::MissingComponents)
        ));
        assert!(uni.field().is_none());
    }
}
