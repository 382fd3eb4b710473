//! Jacobian (least-squares) factor.

use nalgebra::{DMatrix, DVector};

use super::{LinearFactor, check_unique_keys};
use crate::core::key::format_key;
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::linear::LinearSystem;

/// Linear factor `Σₖ Aₖ xₖ − b` over one or more keys.
///
/// Unconstrained factors contribute the least-squares cost `½‖Σ Aₖxₖ − b‖²`.
/// Constrained factors are hard equality rows `Σ Aₖxₖ = b` that the linear
/// solve satisfies exactly.
///
/// ```
/// use apex_qp::{JacobianFactor, LinearFactor, Symbol, VectorValues};
/// use nalgebra::{dmatrix, dvector};
///
/// // ½(x − 10)²
/// let x = Symbol::new('x', 1).key();
/// let factor = JacobianFactor::new(vec![(x, dmatrix![1.0])], dvector![10.0]).unwrap();
///
/// let mut values = VectorValues::new();
/// values.insert(x, dvector![4.0]);
/// assert_eq!(factor.error(&values).unwrap(), 18.0);
/// assert_eq!(factor.gradient(x, &values).unwrap()[0], -6.0);
/// ```
#[derive(Debug, Clone)]
pub struct JacobianFactor {
    keys: Vec<Key>,
    blocks: Vec<DMatrix<f64>>,
    b: DVector<f64>,
    constrained: bool,
}

impl JacobianFactor {
    /// Create an unconstrained (least-squares) factor.
    pub fn new(terms: Vec<(Key, DMatrix<f64>)>, b: DVector<f64>) -> QpResult<Self> {
        Self::from_terms(terms, b, false)
    }

    /// Create a constrained factor whose rows must hold exactly.
    pub fn constrained(terms: Vec<(Key, DMatrix<f64>)>, b: DVector<f64>) -> QpResult<Self> {
        Self::from_terms(terms, b, true)
    }

    fn from_terms(terms: Vec<(Key, DMatrix<f64>)>, b: DVector<f64>, constrained: bool) -> QpResult<Self> {
        let (keys, blocks): (Vec<Key>, Vec<DMatrix<f64>>) = terms.into_iter().unzip();
        check_unique_keys(&keys)?;
        for (key, block) in keys.iter().zip(&blocks) {
            if block.nrows() != b.len() {
                return Err(QpError::DimensionMismatch(format!(
                    "block for key {} has {} rows but b has {}",
                    format_key(*key),
                    block.nrows(),
                    b.len()
                )));
            }
        }
        Ok(Self {
            keys,
            blocks,
            b,
            constrained,
        })
    }

    pub fn rows(&self) -> usize {
        self.b.len()
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }

    /// Coefficient block of `key`
    pub fn block(&self, key: Key) -> Option<&DMatrix<f64>> {
        self.position(key).map(|i| &self.blocks[i])
    }

    /// `(key, block)` pairs in key order of construction
    pub fn terms(&self) -> impl Iterator<Item = (Key, &DMatrix<f64>)> {
        self.keys.iter().copied().zip(self.blocks.iter())
    }

    /// Residual `Σ Aₖxₖ − b`
    pub fn error_vector(&self, values: &VectorValues) -> QpResult<DVector<f64>> {
        let mut residual = -self.b.clone();
        for (key, block) in self.terms() {
            let value = values.at(key)?;
            if value.len() != block.ncols() {
                return Err(QpError::DimensionMismatch(format!(
                    "key {} has dimension {} but its block has {} columns",
                    format_key(key),
                    value.len(),
                    block.ncols()
                )));
            }
            residual += block * value;
        }
        Ok(residual)
    }

    fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }
}

impl LinearFactor for JacobianFactor {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self, key: Key) -> Option<usize> {
        self.block(key).map(|block| block.ncols())
    }

    /// `½‖Σ Aₖxₖ − b‖²`
    fn error(&self, values: &VectorValues) -> QpResult<f64> {
        Ok(0.5 * self.error_vector(values)?.norm_squared())
    }

    /// `Aₖᵀ(Σ Aⱼxⱼ − b)`
    fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<DVector<f64>> {
        let block = self.block(key).ok_or(QpError::KeyNotFound(key))?;
        Ok(block.transpose() * self.error_vector(values)?)
    }

    fn add_to_system(&self, system: &mut LinearSystem) -> QpResult<()> {
        let blocks: Vec<(Key, &DMatrix<f64>)> = self.terms().collect();
        system.add_rows(&blocks, &self.b, self.constrained)
    }
}
