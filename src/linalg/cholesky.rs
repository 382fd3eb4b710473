use std::ops::Mul;

use faer::Mat;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers;

use super::{LinAlgError, LinAlgResult, SparseLinearSolver, SparseMatrix};

/// Sparse LLᵀ solver for symmetric positive definite systems.
///
/// The sparsity pattern of the systems assembled by the active-set loop
/// changes whenever the working set does, so the symbolic factorization is
/// recomputed on every solve.
#[derive(Debug, Clone)]
pub struct SparseCholeskySolver {
    side: faer::Side,
}

impl SparseCholeskySolver {
    pub fn new() -> Self {
        SparseCholeskySolver {
            side: faer::Side::Lower,
        }
    }

    /// Solve the normal equations `AᵀA x = Aᵀb` of a least-squares system.
    pub fn solve_normal_equation(
        &mut self,
        jacobian: &SparseMatrix,
        rhs: &Mat<f64>,
    ) -> LinAlgResult<Mat<f64>> {
        super::check_dimensions(jacobian, rhs)?;
        let hessian = jacobian
            .as_ref()
            .transpose()
            .to_col_major()
            .map_err(|e| LinAlgError::MatrixConstruction(format!("{e:?}")))?
            .mul(jacobian.as_ref());
        let gradient = jacobian.as_ref().transpose().mul(rhs.clone());
        self.solve(&hessian, &gradient)
    }
}

impl Default for SparseCholeskySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseLinearSolver for SparseCholeskySolver {
    fn solve(&mut self, matrix: &SparseMatrix, rhs: &Mat<f64>) -> LinAlgResult<Mat<f64>> {
        super::check_dimensions(matrix, rhs)?;
        let symbolic = solvers::SymbolicLlt::try_new(matrix.symbolic(), self.side)
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;
        let cholesky = solvers::Llt::try_new_with_symbolic(symbolic, matrix.as_ref(), self.side)
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;

        let solution = cholesky.solve(rhs.clone());
        super::check_finite(&solution)?;
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{column_from_slice, triplets_to_sparse};
    use faer::sparse::Triplet;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn test_cholesky_spd_system() {
        // [4 1; 1 3] x = [1; 2]  ->  x = [1/11; 7/11]
        let triplets = vec![
            Triplet::new(0, 0, 4.0),
            Triplet::new(0, 1, 1.0),
            Triplet::new(1, 0, 1.0),
            Triplet::new(1, 1, 3.0),
        ];
        let matrix = triplets_to_sparse(2, 2, &triplets).unwrap();
        let rhs = column_from_slice(&[1.0, 2.0]);

        let mut solver = SparseCholeskySolver::new();
        let x = solver.solve(&matrix, &rhs).unwrap();
        assert!((x[(0, 0)] - 1.0 / 11.0).abs() < TOLERANCE);
        assert!((x[(1, 0)] - 7.0 / 11.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_cholesky_normal_equation() {
        // overdetermined: x = 1, x = 3  ->  least squares x = 2
        let triplets = vec![Triplet::new(0, 0, 1.0), Triplet::new(1, 0, 1.0)];
        let jacobian = triplets_to_sparse(2, 1, &triplets).unwrap();
        let rhs = column_from_slice(&[1.0, 3.0]);

        let mut solver = SparseCholeskySolver::new();
        let x = solver.solve_normal_equation(&jacobian, &rhs).unwrap();
        assert!((x[(0, 0)] - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let triplets = vec![
            Triplet::new(0, 0, 1.0),
            Triplet::new(0, 1, 2.0),
            Triplet::new(1, 0, 2.0),
            Triplet::new(1, 1, 1.0),
        ];
        let matrix = triplets_to_sparse(2, 2, &triplets).unwrap();
        let rhs = column_from_slice(&[1.0, 1.0]);

        let mut solver = SparseCholeskySolver::new();
        assert!(solver.solve(&matrix, &rhs).is_err());
    }
}
