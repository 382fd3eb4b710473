//! Linear factors
//!
//! A factor is one sparse term of a linear factor graph: a small dense block
//! per variable it touches plus a right-hand side. Factors never solve
//! anything themselves; they evaluate their own error and gradient and write
//! their contribution into a [`LinearSystem`] which the graph then solves.
//!
//! # Factor Types
//!
//! - [`JacobianFactor`]: least-squares rows `½‖Σ Aₖxₖ − b‖²`, or hard rows
//!   `Σ Aₖxₖ = b` when constrained
//! - [`HessianFactor`]: quadratic form `½xᵀGx − gᵀx + ½f`
//! - [`LinearEquality`]: hard rows with a Lagrange multiplier key
//! - [`LinearInequality`]: a single row `aᵀx ≤ b` with a multiplier key

use std::fmt;

use nalgebra::DVector;

use crate::core::key::format_key;
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::linear::LinearSystem;

pub mod hessian;
pub mod jacobian;
pub mod linear_equality;
pub mod linear_inequality;

pub use hessian::HessianFactor;
pub use jacobian::JacobianFactor;
pub use linear_equality::LinearEquality;
pub use linear_inequality::LinearInequality;

/// Interface every term of a [`GaussianFactorGraph`](crate::linear::GaussianFactorGraph) implements.
pub trait LinearFactor: fmt::Debug + Send + Sync {
    /// Keys of all variables this factor touches, in block order
    fn keys(&self) -> &[Key];

    /// Dimension of the block for `key`, `None` if the factor does not touch it
    fn dim(&self, key: Key) -> Option<usize>;

    /// Scalar error at `values`
    fn error(&self, values: &VectorValues) -> QpResult<f64>;

    /// Gradient of [`LinearFactor::error`] with respect to `key` at `values`
    fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<DVector<f64>>;

    /// Write this factor's rows or quadratic terms into `system`
    fn add_to_system(&self, system: &mut LinearSystem) -> QpResult<()>;

    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Check that no key appears twice in a factor
pub(crate) fn check_unique_keys(keys: &[Key]) -> QpResult<()> {
    for (i, key) in keys.iter().enumerate() {
        if keys[..i].contains(key) {
            return Err(QpError::InvalidInput(format!(
                "key {} appears more than once in a factor",
                format_key(*key)
            )));
        }
    }
    Ok(())
}

/// Concatenate the vectors stored at `keys`, checking each against its block dimension
pub(crate) fn stack_values(
    keys: &[Key],
    dims: &[usize],
    values: &VectorValues,
) -> QpResult<DVector<f64>> {
    let total: usize = dims.iter().sum();
    let mut stacked = DVector::zeros(total);
    let mut offset = 0;
    for (key, dim) in keys.iter().zip(dims) {
        let value = values.at(*key)?;
        if value.len() != *dim {
            return Err(QpError::DimensionMismatch(format!(
                "key {} has dimension {} but the factor expects {}",
                format_key(*key),
                value.len(),
                dim
            )));
        }
        stacked.rows_mut(offset, *dim).copy_from(value);
        offset += dim;
    }
    Ok(stacked)
}
