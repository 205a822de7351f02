//! Cartesian Gaussian basis functions evaluated on grids of points.

pub mod basis;
pub mod cgto;
pub mod error;
pub mod exponents;
pub mod gto;
#[cfg(test)]
mod helper;

pub use basis::{BasisFunction, BasisFunctions, GtoBasisSet};
pub use cgto::{ContractedGTO, ElementBasis, Shell};
pub use error::{BasisError, Result};
pub use exponents::{cartesian_gtf_count, cartesian_gtf_exponents, lmap, ml_count};
pub use gto::{Direction, GTO1d, GTO};
