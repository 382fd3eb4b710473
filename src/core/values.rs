//! Keyed collections of vectors.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::DVector;

use crate::core::key::{Key, format_key};
use crate::error::{QpError, QpResult};

/// One vector per key, ordered by key.
///
/// Used for primal points, step directions and Lagrange multipliers alike.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorValues {
    values: BTreeMap<Key, DVector<f64>>,
}

impl VectorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the vector stored at `key`, returning the old one.
    pub fn insert(&mut self, key: impl Into<Key>, value: DVector<f64>) -> Option<DVector<f64>> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: Key) -> Option<&DVector<f64>> {
        self.values.get(&key)
    }

    /// Like [`VectorValues::get`] but missing keys are an error.
    pub fn at(&self, key: Key) -> QpResult<&DVector<f64>> {
        self.values.get(&key).ok_or(QpError::KeyNotFound(key))
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &DVector<f64>)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    /// Total scalar dimension of all stored vectors.
    pub fn dim(&self) -> usize {
        self.values.values().map(|v| v.len()).sum()
    }

    /// True when both hold the same keys and every pair of vectors agrees
    /// entry-wise within `tol`.
    pub fn equals(&self, other: &VectorValues, tol: f64) -> bool {
        self.values.len() == other.values.len()
            && self.values.iter().all(|(key, value)| {
                other.values.get(key).is_some_and(|o| {
                    o.len() == value.len() && value.iter().zip(o.iter()).all(|(a, b)| (a - b).abs() <= tol)
                })
            })
    }

    /// Key-wise `self − other`. Both must hold the same keys with the same
    /// dimensions.
    pub fn sub(&self, other: &VectorValues) -> QpResult<VectorValues> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Key-wise `self + alpha·direction`.
    pub fn add_scaled(&self, alpha: f64, direction: &VectorValues) -> QpResult<VectorValues> {
        self.zip_with(direction, |a, p| a + p * alpha)
    }

    /// Euclidean norm over all stored vectors.
    pub fn norm(&self) -> f64 {
        self.values
            .values()
            .map(|v| v.norm_squared())
            .sum::<f64>()
            .sqrt()
    }

    fn zip_with<F>(&self, other: &VectorValues, op: F) -> QpResult<VectorValues>
    where
        F: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64>,
    {
        if self.values.len() != other.values.len() {
            return Err(QpError::DimensionMismatch(format!(
                "values hold {} keys but the other operand holds {}",
                self.values.len(),
                other.values.len()
            )));
        }
        let mut result = BTreeMap::new();
        for (key, value) in &self.values {
            let rhs = other.at(*key)?;
            if rhs.len() != value.len() {
                return Err(QpError::DimensionMismatch(format!(
                    "key {} has dimension {} and {}",
                    format_key(*key),
                    value.len(),
                    rhs.len()
                )));
            }
            result.insert(*key, op(value, rhs));
        }
        Ok(VectorValues { values: result })
    }
}

impl FromIterator<(Key, DVector<f64>)> for VectorValues {
    fn from_iter<I: IntoIterator<Item = (Key, DVector<f64>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for VectorValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VectorValues: {} keys", self.values.len())?;
        for (key, value) in &self.values {
            let entries: Vec<String> = value.iter().map(|v| format!("{v:.6}")).collect();
            writeln!(f, "  {}: [{}]", format_key(*key), entries.join(", "))?;
        }
        Ok(())
    }
}
