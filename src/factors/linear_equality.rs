use nalgebra::{DMatrix, DVector};

use super::{JacobianFactor, LinearFactor};
use crate::core::{Key, VectorValues};
use crate::error::QpResult;
use crate::linear::LinearSystem;

/// Hard equality constraint `Σ Aₖxₖ = b` with its Lagrange multiplier key.
///
/// The multiplier has one entry per row and is only ever produced by the
/// dual solve of the active-set loop.
#[derive(Debug, Clone)]
pub struct LinearEquality {
    factor: JacobianFactor,
    dual_key: Key,
}

impl LinearEquality {
    pub fn new(terms: Vec<(Key, DMatrix<f64>)>, b: DVector<f64>, dual_key: Key) -> QpResult<Self> {
        Ok(Self {
            factor: JacobianFactor::constrained(terms, b)?,
            dual_key,
        })
    }

    pub fn dual_key(&self) -> Key {
        self.dual_key
    }

    pub fn rows(&self) -> usize {
        self.factor.rows()
    }

    pub fn b(&self) -> &DVector<f64> {
        self.factor.b()
    }

    pub fn block(&self, key: Key) -> Option<&DMatrix<f64>> {
        self.factor.block(key)
    }

    pub fn terms(&self) -> impl Iterator<Item = (Key, &DMatrix<f64>)> {
        self.factor.terms()
    }

    /// Constraint residual `Σ Aₖxₖ − b`, zero when satisfied
    pub fn residual(&self, values: &VectorValues) -> QpResult<DVector<f64>> {
        self.factor.error_vector(values)
    }
}

impl LinearFactor for LinearEquality {
    fn keys(&self) -> &[Key] {
        self.factor.keys()
    }

    fn dim(&self, key: Key) -> Option<usize> {
        self.factor.dim(key)
    }

    fn error(&self, values: &VectorValues) -> QpResult<f64> {
        self.factor.error(values)
    }

    fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<DVector<f64>> {
        self.factor.gradient(key, values)
    }

    fn add_to_system(&self, system: &mut LinearSystem) -> QpResult<()> {
        self.factor.add_to_system(system)
    }
}
