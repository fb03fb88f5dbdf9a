//! define the error enum for the result of empirical likelihood inference

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElError {
    #[error("Inconsistent input: {0}")]
    BadInput(String),
    #[error("Linear algebra")]
    LinalgError {
        #[from]
        source: LinalgError,
    },
    #[error("Underconstrained data")]
    Underconstrained,
    #[error("Colinear data (X^T * X is not invertible)")]
    ColinearData,
    /// The Lagrange multiplier did not converge, which typically means the
    /// hypothesized value lies outside the convex hull of the data.
    #[error("Maximum iterations ({0}) reached")]
    MaxIter(usize),
    #[error("Optimization failed: {0}")]
    Optimization(String),
    #[error("Search bounds [{lower}, {upper}] do not bracket the critical value")]
    NoSignChange { lower: f64, upper: f64 },
    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),
}

impl From<argmin::core::Error> for ElError {
    fn from(err: argmin::core::Error) -> Self {
        ElError::Optimization(err.to_string())
    }
}

pub type ElResult<T> = Result<T, ElError>;
