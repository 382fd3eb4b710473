//! Hessian (quadratic form) factor.
//!
//! Stores a quadratic cost in information form,
//!
//! ```text
//! E(x) = ½ xᵀ G x − gᵀ x + ½ f
//! ```
//!
//! over the concatenation `x = [x₁; x₂; …]` of its keys. A Jacobian factor
//! `½‖Ax − b‖²` is the special case `G = AᵀA`, `g = Aᵀb`, `f = bᵀb`, but a
//! Hessian factor can also express costs that have no convenient square root.

use nalgebra::{DMatrix, DVector};

use super::{LinearFactor, check_unique_keys, stack_values};
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::linear::LinearSystem;

/// Relative tolerance used to reject non-symmetric information matrices
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct HessianFactor {
    keys: Vec<Key>,
    dims: Vec<usize>,
    offsets: Vec<usize>,
    information: DMatrix<f64>,
    linear: DVector<f64>,
    constant: f64,
}

impl HessianFactor {
    /// Create a factor from its full information matrix `G`, linear term `g`
    /// and constant `f`. `G` is laid out in the order of `keys`.
    pub fn new(
        keys: Vec<(Key, usize)>,
        information: DMatrix<f64>,
        linear: DVector<f64>,
        constant: f64,
    ) -> QpResult<Self> {
        let (keys, dims): (Vec<Key>, Vec<usize>) = keys.into_iter().unzip();
        check_unique_keys(&keys)?;

        let total: usize = dims.iter().sum();
        if information.nrows() != total || information.ncols() != total {
            return Err(QpError::DimensionMismatch(format!(
                "information matrix is {}x{} but the keys span {} dimensions",
                information.nrows(),
                information.ncols(),
                total
            )));
        }
        if linear.len() != total {
            return Err(QpError::DimensionMismatch(format!(
                "linear term has {} entries but the keys span {} dimensions",
                linear.len(),
                total
            )));
        }
        let scale = information.amax().max(1.0);
        if (&information - information.transpose()).amax() > SYMMETRY_TOLERANCE * scale {
            return Err(QpError::InvalidInput(
                "information matrix is not symmetric".to_string(),
            ));
        }

        let offsets = dims
            .iter()
            .scan(0, |offset, dim| {
                let start = *offset;
                *offset += dim;
                Some(start)
            })
            .collect();

        Ok(Self {
            keys,
            dims,
            offsets,
            information,
            linear,
            constant,
        })
    }

    /// `½ xᵀ G x − gᵀ x + ½ f` on a single key
    pub fn unary(
        key: Key,
        information: DMatrix<f64>,
        linear: DVector<f64>,
        constant: f64,
    ) -> QpResult<Self> {
        let dim = linear.len();
        Self::new(vec![(key, dim)], information, linear, constant)
    }

    /// Quadratic form on two keys, given as blocks
    ///
    /// ```text
    /// G = [G11  G12]    g = [g1]
    ///     [G12ᵀ G22]        [g2]
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn binary(
        key1: Key,
        key2: Key,
        g11: DMatrix<f64>,
        g12: DMatrix<f64>,
        g22: DMatrix<f64>,
        g1: DVector<f64>,
        g2: DVector<f64>,
        constant: f64,
    ) -> QpResult<Self> {
        let (n1, n2) = (g1.len(), g2.len());
        if g11.shape() != (n1, n1) || g12.shape() != (n1, n2) || g22.shape() != (n2, n2) {
            return Err(QpError::DimensionMismatch(format!(
                "blocks G11 {:?}, G12 {:?}, G22 {:?} do not match key dimensions ({n1}, {n2})",
                g11.shape(),
                g12.shape(),
                g22.shape()
            )));
        }

        let mut information = DMatrix::zeros(n1 + n2, n1 + n2);
        information.view_mut((0, 0), (n1, n1)).copy_from(&g11);
        information.view_mut((0, n1), (n1, n2)).copy_from(&g12);
        information
            .view_mut((n1, 0), (n2, n1))
            .copy_from(&g12.transpose());
        information.view_mut((n1, n1), (n2, n2)).copy_from(&g22);

        let mut linear = DVector::zeros(n1 + n2);
        linear.rows_mut(0, n1).copy_from(&g1);
        linear.rows_mut(n1, n2).copy_from(&g2);

        Self::new(vec![(key1, n1), (key2, n2)], information, linear, constant)
    }

    pub fn information(&self) -> &DMatrix<f64> {
        &self.information
    }

    pub fn linear_term(&self) -> &DVector<f64> {
        &self.linear
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }
}

impl LinearFactor for HessianFactor {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self, key: Key) -> Option<usize> {
        self.position(key).map(|i| self.dims[i])
    }

    fn error(&self, values: &VectorValues) -> QpResult<f64> {
        let x = stack_values(&self.keys, &self.dims, values)?;
        let quadratic = x.dot(&(&self.information * &x));
        Ok(0.5 * quadratic - self.linear.dot(&x) + 0.5 * self.constant)
    }

    /// Block of `G x − g` belonging to `key`
    fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<DVector<f64>> {
        let i = self.position(key).ok_or(QpError::KeyNotFound(key))?;
        let x = stack_values(&self.keys, &self.dims, values)?;
        let full = &self.information * x - &self.linear;
        Ok(full.rows(self.offsets[i], self.dims[i]).into_owned())
    }

    fn add_to_system(&self, system: &mut LinearSystem) -> QpResult<()> {
        system.add_quadratic(&self.keys, &self.information, &self.linear)
    }
}
