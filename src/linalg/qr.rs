use faer::{
    Mat,
    linalg::solvers::SolveLstsqCore,
    sparse::linalg::solvers,
};

use super::{LinAlgError, LinAlgResult, SparseLinearSolver, SparseMatrix};

/// Sparse QR solver for least-squares systems `min ‖A x − b‖²`.
///
/// Works on `A` directly instead of forming `AᵀA`, which squares the
/// condition number. `A` must have at least as many rows as columns.
#[derive(Debug, Clone, Default)]
pub struct SparseQRSolver;

impl SparseQRSolver {
    pub fn new() -> Self {
        SparseQRSolver
    }
}

impl SparseLinearSolver for SparseQRSolver {
    fn solve(&mut self, matrix: &SparseMatrix, rhs: &Mat<f64>) -> LinAlgResult<Mat<f64>> {
        super::check_dimensions(matrix, rhs)?;
        let (m, n) = (matrix.nrows(), matrix.ncols());
        if m < n {
            return Err(LinAlgError::Underdetermined { rows: m, cols: n });
        }

        let symbolic = solvers::SymbolicQr::try_new(matrix.symbolic())
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;
        let qr = solvers::Qr::try_new_with_symbolic(symbolic, matrix.as_ref())
            .map_err(|e| LinAlgError::FactorizationFailed(format!("{e:?}")))?;

        let mut work = rhs.clone();
        qr.solve_lstsq_in_place_with_conj(faer::Conj::No, work.as_mut());
        // the solution occupies the top n rows
        let solution = work.submatrix(0, 0, n, 1).to_owned();
        super::check_finite(&solution)?;
        Ok(solution)
    }
}
