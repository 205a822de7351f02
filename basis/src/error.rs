use thiserror::Error;

pub type Result<T> = std::result::Result<T, BasisError>;

#[derive(Debug, Error)]
pub enum BasisError {
    #[error("unknown element symbol: {0}")]
    UnknownElement(String),

    #[error("unsupported shell type: {0}")]
    UnknownShell(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("no basis set for element {0}")]
    MissingElement(String),

    #[error("coordinate arrays differ in length: x={x}, y={y}, z={z}")]
    GridLength { x: usize, y: usize, z: usize },

    #[error("basis set order has no irrep labels")]
    NoIrreps,
}
