//! Error types in ranklearn
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("interaction matrix has shape {0:?}, but needs at least one row and one column")]
    EmptyMatrix((usize, usize)),
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("solver {0} is not available in this build")]
    SolverUnavailable(&'static str),
    #[error("linear algebra routine failed: {0}")]
    Linalg(String),
    #[error("worker pool failed: {0}")]
    WorkerPool(String),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}

impl From<linfa_linalg::LinalgError> for Error {
    fn from(err: linfa_linalg::LinalgError) -> Self {
        Error::Linalg(err.to_string())
    }
}

#[cfg(feature = "ndarray-linalg")]
impl From<ndarray_linalg::error::LinalgError> for Error {
    fn from(err: ndarray_linalg::error::LinalgError) -> Self {
        Error::Linalg(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::WorkerPool(err.to_string())
    }
}
