use nalgebra::{DMatrix, DVector};

use super::{LinearFactor, check_unique_keys};
use crate::core::key::format_key;
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::linear::LinearSystem;

/// Scalar inequality constraint `Σ aₖᵀxₖ ≤ b` with its multiplier key.
///
/// Coefficients are stored as `1 × nₖ` row blocks so that an active
/// inequality can be written into a [`LinearSystem`] as a hard equality row
/// exactly like a [`LinearEquality`](super::LinearEquality).
///
/// As a [`LinearFactor`] the inequality contributes the one-sided penalty
/// `½ max(0, aᵀx − b)²`, which is zero whenever the constraint holds.
#[derive(Debug, Clone)]
pub struct LinearInequality {
    keys: Vec<Key>,
    rows: Vec<DMatrix<f64>>,
    b: DVector<f64>,
    dual_key: Key,
}

impl LinearInequality {
    pub fn new(terms: Vec<(Key, DVector<f64>)>, b: f64, dual_key: Key) -> QpResult<Self> {
        let (keys, coefficients): (Vec<Key>, Vec<DVector<f64>>) = terms.into_iter().unzip();
        check_unique_keys(&keys)?;
        if keys.is_empty() {
            return Err(QpError::InvalidInput(
                "an inequality needs at least one term".to_string(),
            ));
        }
        Ok(Self {
            keys,
            rows: coefficients
                .iter()
                .map(|a| DMatrix::from_row_slice(1, a.len(), a.as_slice()))
                .collect(),
            b: DVector::from_element(1, b),
            dual_key,
        })
    }

    pub fn dual_key(&self) -> Key {
        self.dual_key
    }

    pub fn b(&self) -> f64 {
        self.b[0]
    }

    /// `1 × nₖ` coefficient row of `key`
    pub fn row(&self, key: Key) -> Option<&DMatrix<f64>> {
        self.position(key).map(|i| &self.rows[i])
    }

    pub fn terms(&self) -> impl Iterator<Item = (Key, &DMatrix<f64>)> {
        self.keys.iter().copied().zip(self.rows.iter())
    }

    /// Signed violation `aᵀx − b`: negative when strictly satisfied, zero
    /// on the boundary, positive when violated.
    pub fn violation(&self, values: &VectorValues) -> QpResult<f64> {
        Ok(self.dot_product_row(values)? - self.b())
    }

    /// `Σ aₖᵀpₖ` for a direction or point `p`
    pub fn dot_product_row(&self, p: &VectorValues) -> QpResult<f64> {
        let mut sum = 0.0;
        for (key, row) in self.terms() {
            let value = p.at(key)?;
            if value.len() != row.ncols() {
                return Err(QpError::DimensionMismatch(format!(
                    "key {} has dimension {} but the inequality expects {}",
                    format_key(key),
                    value.len(),
                    row.ncols()
                )));
            }
            sum += row.row(0).transpose().dot(value);
        }
        Ok(sum)
    }

    fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }
}

impl LinearFactor for LinearInequality {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self, key: Key) -> Option<usize> {
        self.row(key).map(|row| row.ncols())
    }

    fn error(&self, values: &VectorValues) -> QpResult<f64> {
        let excess = self.violation(values)?.max(0.0);
        Ok(0.5 * excess * excess)
    }

    fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<DVector<f64>> {
        let row = self.row(key).ok_or(QpError::KeyNotFound(key))?;
        let excess = self.violation(values)?.max(0.0);
        Ok(DVector::from_row_slice(row.as_slice()) * excess)
    }

    /// Writes the constraint as the hard row `aᵀx = b`; only active
    /// inequalities are ever added to a system.
    fn add_to_system(&self, system: &mut LinearSystem) -> QpResult<()> {
        let blocks: Vec<(Key, &DMatrix<f64>)> = self.terms().collect();
        system.add_rows(&blocks, &self.b, true)
    }
}
