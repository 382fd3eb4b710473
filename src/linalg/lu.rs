use faer::Mat;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers;

use super::{LinAlgError, LinAlgResult, SparseLinearSolver, SparseMatrix};

/// Sparse LU solver for square, possibly indefinite systems.
///
/// Used for KKT systems `[H Cᵀ; C 0]`, which are symmetric but never
/// positive definite.
#[derive(Debug, Clone, Default)]
pub struct SparseLUSolver;

impl SparseLUSolver {
    pub fn new() -> Self {
        SparseLUSolver
    }
}

impl SparseLinearSolver for SparseLUSolver {
    fn solve(&mut self, matrix: &SparseMatrix, rhs: &Mat<f64>) -> LinAlgResult<Mat<f64>> {
        super::check_dimensions(matrix, rhs)?;
        if matrix.nrows() != matrix.ncols() {
            return Err(LinAlgError::FactorizationFailed(format!(
                "LU needs a square matrix, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }

        let symbolic = solvers::SymbolicLu::try_new(matrix.symbolic())
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;
        let lu = solvers::Lu::try_new_with_symbolic(symbolic, matrix.as_ref())
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;

        let solution = lu.solve(rhs.clone());
        // a singular KKT matrix factors "successfully" but yields inf/NaN
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
    fn test_lu_kkt_system() {
        // min ½(x² + y²) s.t. x + y = 1
        // [1 0 1; 0 1 1; 1 1 0] [x; y; ν] = [0; 0; 1]  ->  x = y = ½, ν = −½
        let triplets = vec![
            Triplet::new(0, 0, 1.0),
            Triplet::new(1, 1, 1.0),
            Triplet::new(0, 2, 1.0),
            Triplet::new(1, 2, 1.0),
            Triplet::new(2, 0, 1.0),
            Triplet::new(2, 1, 1.0),
        ];
        let matrix = triplets_to_sparse(3, 3, &triplets).unwrap();
        let rhs = column_from_slice(&[0.0, 0.0, 1.0]);

        let mut solver = SparseLUSolver::new();
        let x = solver.solve(&matrix, &rhs).unwrap();
        assert!((x[(0, 0)] - 0.5).abs() < TOLERANCE);
        assert!((x[(1, 0)] - 0.5).abs() < TOLERANCE);
        assert!((x[(2, 0)] + 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_lu_rejects_rectangular() {
        let triplets = vec![Triplet::new(0, 0, 1.0), Triplet::new(1, 0, 1.0)];
        let matrix = triplets_to_sparse(2, 1, &triplets).unwrap();
        let rhs = column_from_slice(&[1.0, 1.0]);

        let mut solver = SparseLUSolver::new();
        assert!(solver.solve(&matrix, &rhs).is_err());
    }
}
