//! Sparse linear solvers.
//!
//! This module provides the sparse direct solvers used to solve the linear
//! systems assembled from factor graphs:
//! - Sparse Cholesky on symmetric positive definite systems (normal equations)
//! - Sparse QR for overdetermined least-squares systems
//! - Sparse LU for the symmetric indefinite KKT systems of constrained problems
//!
//! All solvers are built on faer.

use faer::Mat;
use faer::sparse::{SparseColMat, Triplet};
use thiserror::Error;

pub mod cholesky;
pub mod lu;
pub mod qr;

pub use cholesky::SparseCholeskySolver;
pub use lu::SparseLUSolver;
pub use qr::SparseQRSolver;

/// Type alias for sparse matrices using faer
pub type SparseMatrix = SparseColMat<usize, f64>;

/// Result type for linear algebra operations
pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Errors raised by the sparse solvers
#[derive(Debug, Clone, Error)]
pub enum LinAlgError {
    /// Symbolic or numeric factorization failed
    #[error("Factorization failed: {0}")]
    FactorizationFailed(String),

    /// Building a sparse matrix from triplets failed
    #[error("Matrix construction failed: {0}")]
    MatrixConstruction(String),

    /// The system has fewer equations than unknowns
    #[error("Underdetermined system: {rows} equations for {cols} unknowns")]
    Underdetermined { rows: usize, cols: usize },

    /// Matrix and right-hand side shapes disagree
    #[error("Dimension mismatch: matrix is {rows}x{cols}, right-hand side has {rhs_rows} rows")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        rhs_rows: usize,
    },

    /// The factorization succeeded but the solution contains NaN or infinity
    #[error("Solution contains non-finite values")]
    NonFiniteSolution,
}

/// Which back end solves unconstrained least-squares systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolverType {
    /// Cholesky factorization of the normal equations `AᵀA x = Aᵀb`
    #[default]
    SparseCholesky,
    /// QR factorization of `A` itself (better conditioned, slower)
    SparseQR,
}

/// Common interface of the sparse direct solvers
///
/// Each solver interprets `matrix · x = rhs` in its own sense: exactly for
/// square systems (Cholesky, LU), in the least-squares sense for QR.
pub trait SparseLinearSolver {
    fn solve(&mut self, matrix: &SparseMatrix, rhs: &Mat<f64>) -> LinAlgResult<Mat<f64>>;
}

/// Create sparse matrix from triplets using faer
///
/// Duplicate entries are summed.
pub fn triplets_to_sparse(
    rows: usize,
    cols: usize,
    triplets: &[Triplet<usize, usize, f64>],
) -> LinAlgResult<SparseMatrix> {
    SparseColMat::try_new_from_triplets(rows, cols, triplets)
        .map_err(|e| LinAlgError::MatrixConstruction(format!("{e:?}")))
}

/// Column vector from a slice
pub fn column_from_slice(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), 1, |i, _| values[i])
}

fn check_dimensions(matrix: &SparseMatrix, rhs: &Mat<f64>) -> LinAlgResult<()> {
    if matrix.nrows() != rhs.nrows() {
        return Err(LinAlgError::DimensionMismatch {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            rhs_rows: rhs.nrows(),
        });
    }
    Ok(())
}

fn check_finite(solution: &Mat<f64>) -> LinAlgResult<()> {
    for i in 0..solution.nrows() {
        for j in 0..solution.ncols() {
            if !solution[(i, j)].is_finite() {
                return Err(LinAlgError::NonFiniteSolution);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_creation() {
        let triplets = vec![
            Triplet::new(0, 0, 1.0),
            Triplet::new(1, 1, 2.0),
            Triplet::new(2, 2, 3.0),
        ];
        let sparse = triplets_to_sparse(3, 3, &triplets);
        assert!(sparse.is_ok());
    }

    #[test]
    fn test_linear_solver_type_default() {
        assert_eq!(LinearSolverType::default(), LinearSolverType::SparseCholesky);
    }

    #[test]
    fn test_check_finite() {
        let good = column_from_slice(&[1.0, 2.0]);
        let bad = column_from_slice(&[1.0, f64::NAN]);
        assert!(check_finite(&good).is_ok());
        assert!(matches!(check_finite(&bad), Err(LinAlgError::NonFiniteSolution)));
    }
}
