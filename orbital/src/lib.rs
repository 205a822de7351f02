//! Molecular orbitals, electron density and orbital angular momentum
//! evaluated on regular 3D grids.

pub mod current;
pub mod error;
pub mod evaluate;
pub mod field;
pub mod grid;
pub mod ops;
pub mod selector;
pub mod universe;

pub use error::{ErrorKind, FieldError, Result};
pub use evaluate::{DensityNorm, EvaluatorConfig};
pub use field::{attach_field, make_field, Attachment, Field, FieldEntry, FieldValues};
pub use grid::{resolve_grid, FieldParams, GridCoordinates, GridSpec};
pub use ops::{
    evaluate_current_and_angular_momentum, evaluate_density, evaluate_orbitals, AngularMomentumOptions,
    DensityOptions, OrbitalOptions,
};
pub use selector::{select_orbitals, OrbitalSelection};
pub use universe::{Atom, BasisSetOrder, MoMatrix, OrbitalTable, Universe};
