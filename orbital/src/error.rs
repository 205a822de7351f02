//! Errors raised while resolving inputs and evaluating fields.

use basis::BasisError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldError>;

/// Broad class of an error; decides whether the orbital evaluator may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing user input. Never recovered.
    Configuration,
    /// Inputs do not fit together. Recovered once by the dense orbital path.
    Shape,
    /// A derived table was used before it was computed.
    UnsupportedState,
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("must specify both rcoefs and icoefs")]
    MissingComponents,

    #[error("column '{column}' not found in the {table} table")]
    MissingColumn { table: &'static str, column: String },

    #[error("the universe has no {0} table")]
    MissingTable(&'static str),

    #[error("frame {0} does not exist in the universe")]
    FrameNotFound(usize),

    #[error("no field parameters given and no atomic coordinates to derive a grid from")]
    NoGridSource,

    #[error("no orbital table, coefficient matrix or atoms to determine orbitals from")]
    NoOrbitalSource,

    #[error("orbital selection is empty")]
    EmptySelection,

    #[error("orbital {index} out of range for {count} orbitals")]
    OrbitalOutOfRange { index: usize, count: usize },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("unknown element symbol: {0}")]
    UnknownElement(String),

    #[error("{context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{context}: index {index} out of bounds for {bound}")]
    IndexOutOfRange {
        context: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("fast path precondition not met: {0}")]
    UnsupportedFastPath(&'static str),

    #[error("compute {0} first")]
    UnsupportedState(&'static str),

    #[error(transparent)]
    Basis(#[from] BasisError),
}

impl FieldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FieldError::ShapeMismatch { .. }
            | FieldError::IndexOutOfRange { .. }
            | FieldError::UnsupportedFastPath(_) => ErrorKind::Shape,
            FieldError::UnsupportedState(_) => ErrorKind::UnsupportedState,
            FieldError::Basis(BasisError::NoIrreps) => ErrorKind::UnsupportedState,
            FieldError::Basis(BasisError::GridLength { .. }) => ErrorKind::Shape,
            _ => ErrorKind::Configuration,
        }
    }
}
