//! Error types for the apex-qp library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::core::Key;
use crate::linalg::LinAlgError;
use thiserror::Error;

/// Main result type used throughout the apex-qp library
pub type QpResult<T> = Result<T, QpError>;

/// Main error type for the apex-qp library
#[derive(Debug, Clone, Error)]
pub enum QpError {
    /// The starting point violates an inequality constraint.
    ///
    /// The solver does not search for a feasible point itself; callers must
    /// supply one (or warm start from a previous solve).
    #[error("Infeasible initial values: inequality {constraint} violated by {violation:.3e}")]
    InfeasibleInitialValues {
        /// Index of the violated inequality in the QP
        constraint: usize,
        /// Signed violation `aᵀx − b` (strictly positive)
        violation: f64,
    },

    /// A key was looked up in a set of values that does not contain it
    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    /// Block or vector dimensions do not agree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid problem definition or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Linear algebra related errors
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// The active-set loop did not reach a KKT point within the iteration cap
    #[error("Maximum iterations reached: no convergence after {iterations} iterations")]
    MaxIterationsReached {
        /// Number of iterations performed
        iterations: usize,
    },
}

impl From<LinAlgError> for QpError {
    fn from(err: LinAlgError) -> Self {
        QpError::LinearAlgebra(err.to_string())
    }
}
