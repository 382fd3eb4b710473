//! Assembly of a linear factor graph into one sparse system.
//!
//! Factors write into a [`LinearSystem`] through two entry points:
//!
//! - [`LinearSystem::add_rows`] for Jacobian rows, either soft
//!   (least-squares) or hard (must hold exactly)
//! - [`LinearSystem::add_quadratic`] for Hessian blocks
//!
//! [`LinearSystem::solve`] then picks the cheapest exact formulation:
//!
//! | contents                      | system                              | solver   |
//! |-------------------------------|-------------------------------------|----------|
//! | soft rows only                | `min ‖Ax − b‖²`                     | QR or LLᵀ on `AᵀA` |
//! | soft rows + quadratic terms   | `(G + AᵀA) x = g + Aᵀb`             | LLᵀ      |
//! | any hard rows                 | `[H Cᵀ; C 0] [x; ν] = [r; d]`       | LU       |

use std::collections::BTreeMap;

use faer::Mat;
use faer::sparse::Triplet;
use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::core::key::format_key;
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::linalg::{
    LinearSolverType, SparseCholeskySolver, SparseLUSolver, SparseLinearSolver, SparseQRSolver,
    column_from_slice, triplets_to_sparse,
};

/// Column layout of the stacked unknown vector
#[derive(Debug, Clone, Default)]
pub struct Ordering {
    slots: BTreeMap<Key, (usize, usize)>,
    total_dim: usize,
}

impl Ordering {
    /// Lay out keys in ascending key order.
    pub fn from_dims<I>(dims: I) -> QpResult<Self>
    where
        I: IntoIterator<Item = (Key, usize)>,
    {
        let mut key_dims: BTreeMap<Key, usize> = BTreeMap::new();
        for (key, dim) in dims {
            match key_dims.insert(key, dim) {
                Some(previous) if previous != dim => {
                    return Err(QpError::DimensionMismatch(format!(
                        "key {} is used with dimensions {} and {}",
                        format_key(key),
                        previous,
                        dim
                    )));
                }
                _ => {}
            }
        }

        let mut slots = BTreeMap::new();
        let mut offset = 0;
        for (key, dim) in key_dims {
            slots.insert(key, (offset, dim));
            offset += dim;
        }
        Ok(Self {
            slots,
            total_dim: offset,
        })
    }

    /// `(offset, dim)` of `key`
    pub fn slot(&self, key: Key) -> QpResult<(usize, usize)> {
        self.slots.get(&key).copied().ok_or(QpError::KeyNotFound(key))
    }

    pub fn total_dim(&self) -> usize {
        self.total_dim
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Split a stacked solution back into per-key vectors.
    fn scatter(&self, solution: &Mat<f64>) -> VectorValues {
        self.slots
            .iter()
            .map(|(key, (offset, dim))| {
                let value = DVector::from_fn(*dim, |i, _| solution[(offset + i, 0)]);
                (*key, value)
            })
            .collect()
    }
}

type SparseRow = Vec<(usize, f64)>;

/// Accumulates factor contributions and solves the resulting system.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    ordering: Ordering,
    soft_rows: Vec<SparseRow>,
    soft_rhs: Vec<f64>,
    hard_rows: Vec<SparseRow>,
    hard_rhs: Vec<f64>,
    quadratic: BTreeMap<(usize, usize), f64>,
    linear: Vec<f64>,
    has_quadratic: bool,
}

impl LinearSystem {
    pub fn new(ordering: Ordering) -> Self {
        let n = ordering.total_dim();
        Self {
            ordering,
            soft_rows: Vec::new(),
            soft_rhs: Vec::new(),
            hard_rows: Vec::new(),
            hard_rhs: Vec::new(),
            quadratic: BTreeMap::new(),
            linear: vec![0.0; n],
            has_quadratic: false,
        }
    }

    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    pub fn num_hard_rows(&self) -> usize {
        self.hard_rows.len()
    }

    pub fn num_soft_rows(&self) -> usize {
        self.soft_rows.len()
    }

    /// Append the rows `Σ Aₖxₖ = b`. Soft rows enter the least-squares cost,
    /// hard rows are enforced exactly.
    pub fn add_rows(
        &mut self,
        blocks: &[(Key, &DMatrix<f64>)],
        rhs: &DVector<f64>,
        hard: bool,
    ) -> QpResult<()> {
        let mut slots = Vec::with_capacity(blocks.len());
        for (key, block) in blocks {
            let (offset, dim) = self.ordering.slot(*key)?;
            if block.nrows() != rhs.len() || block.ncols() != dim {
                return Err(QpError::DimensionMismatch(format!(
                    "block for key {} is {}x{}, expected {}x{}",
                    format_key(*key),
                    block.nrows(),
                    block.ncols(),
                    rhs.len(),
                    dim
                )));
            }
            slots.push(offset);
        }

        for r in 0..rhs.len() {
            let mut row = SparseRow::new();
            for ((_, block), offset) in blocks.iter().zip(&slots) {
                for c in 0..block.ncols() {
                    let value = block[(r, c)];
                    if value != 0.0 {
                        row.push((offset + c, value));
                    }
                }
            }
            if hard {
                self.hard_rows.push(row);
                self.hard_rhs.push(rhs[r]);
            } else {
                self.soft_rows.push(row);
                self.soft_rhs.push(rhs[r]);
            }
        }
        Ok(())
    }

    /// Add the quadratic form `½ xᵀGx − gᵀx` over the concatenation of `keys`.
    pub fn add_quadratic(
        &mut self,
        keys: &[Key],
        information: &DMatrix<f64>,
        linear: &DVector<f64>,
    ) -> QpResult<()> {
        let mut columns = Vec::with_capacity(linear.len());
        for key in keys {
            let (offset, dim) = self.ordering.slot(*key)?;
            columns.extend(offset..offset + dim);
        }
        if information.nrows() != columns.len()
            || information.ncols() != columns.len()
            || linear.len() != columns.len()
        {
            return Err(QpError::DimensionMismatch(format!(
                "quadratic term is {}x{} with a linear term of {}, but its keys span {}",
                information.nrows(),
                information.ncols(),
                linear.len(),
                columns.len()
            )));
        }

        for (i, gi) in columns.iter().enumerate() {
            for (j, gj) in columns.iter().enumerate() {
                let value = information[(i, j)];
                if value != 0.0 {
                    *self.quadratic.entry((*gi, *gj)).or_insert(0.0) += value;
                }
            }
            self.linear[*gi] += linear[i];
        }
        self.has_quadratic = true;
        Ok(())
    }

    /// Solve the assembled system.
    ///
    /// Only pure least-squares systems honor `solver_type`; systems with
    /// quadratic terms go through Cholesky and systems with hard rows
    /// through LU on the KKT matrix.
    pub fn solve(&self, solver_type: LinearSolverType) -> QpResult<VectorValues> {
        let n = self.ordering.total_dim();
        if n == 0 {
            return Ok(VectorValues::new());
        }

        let solution = if self.hard_rows.is_empty() && !self.has_quadratic {
            self.solve_least_squares(solver_type)?
        } else if self.hard_rows.is_empty() {
            self.solve_information()?
        } else {
            self.solve_kkt()?
        };
        Ok(self.ordering.scatter(&solution))
    }

    fn solve_least_squares(&self, solver_type: LinearSolverType) -> QpResult<Mat<f64>> {
        let n = self.ordering.total_dim();
        let m = self.soft_rows.len();
        trace!("least-squares system: {m} rows, {n} columns, {solver_type:?}");

        let triplets: Vec<Triplet<usize, usize, f64>> = self
            .soft_rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().map(move |(c, v)| Triplet::new(r, *c, *v)))
            .collect();
        let jacobian = triplets_to_sparse(m, n, &triplets)?;
        let rhs = column_from_slice(&self.soft_rhs);

        let solution = match solver_type {
            LinearSolverType::SparseCholesky => {
                SparseCholeskySolver::new().solve_normal_equation(&jacobian, &rhs)?
            }
            LinearSolverType::SparseQR => SparseQRSolver::new().solve(&jacobian, &rhs)?,
        };
        Ok(solution)
    }

    /// `H = G + AᵀA` and `r = g + Aᵀb` over the soft rows and quadratic terms
    fn information_form(&self) -> (BTreeMap<(usize, usize), f64>, Vec<f64>) {
        let mut hessian = self.quadratic.clone();
        let mut gradient = self.linear.clone();
        for (row, b) in self.soft_rows.iter().zip(&self.soft_rhs) {
            for (i, vi) in row {
                for (j, vj) in row {
                    *hessian.entry((*i, *j)).or_insert(0.0) += vi * vj;
                }
                gradient[*i] += vi * b;
            }
        }
        (hessian, gradient)
    }

    fn solve_information(&self) -> QpResult<Mat<f64>> {
        let n = self.ordering.total_dim();
        let (hessian, gradient) = self.information_form();
        trace!("information system: {n} columns, {} nonzeros", hessian.len());

        let triplets: Vec<Triplet<usize, usize, f64>> = hessian
            .iter()
            .map(|((i, j), v)| Triplet::new(*i, *j, *v))
            .collect();
        let matrix = triplets_to_sparse(n, n, &triplets)?;
        let rhs = column_from_slice(&gradient);
        Ok(SparseCholeskySolver::new().solve(&matrix, &rhs)?)
    }

    fn solve_kkt(&self) -> QpResult<Mat<f64>> {
        let n = self.ordering.total_dim();
        let p = self.hard_rows.len();
        let (hessian, gradient) = self.information_form();
        trace!("KKT system: {n} primal, {p} constraint rows");

        let mut triplets: Vec<Triplet<usize, usize, f64>> = hessian
            .iter()
            .map(|((i, j), v)| Triplet::new(*i, *j, *v))
            .collect();
        for (k, row) in self.hard_rows.iter().enumerate() {
            for (c, v) in row {
                triplets.push(Triplet::new(n + k, *c, *v));
                triplets.push(Triplet::new(*c, n + k, *v));
            }
        }
        let matrix = triplets_to_sparse(n + p, n + p, &triplets)?;

        let mut rhs = gradient;
        rhs.extend_from_slice(&self.hard_rhs);
        let rhs = column_from_slice(&rhs);

        let solution = SparseLUSolver::new().solve(&matrix, &rhs)?;
        Ok(solution.submatrix(0, 0, n, 1).to_owned())
    }
}
