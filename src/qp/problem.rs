use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::key::format_key;
use crate::core::{Key, VectorValues};
use crate::error::{QpError, QpResult};
use crate::factors::{LinearEquality, LinearFactor, LinearInequality};
use crate::linear::{GaussianFactorGraph, Ordering};

/// Convex quadratic program
///
/// ```text
/// minimize    cost(x)
/// subject to  Σ Aₖxₖ = b      for every equality
///             Σ aₖᵀxₖ ≤ b     for every inequality
/// ```
///
/// The cost is a [`GaussianFactorGraph`] of Jacobian and/or Hessian terms.
/// A `QP` is validated on construction and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct QP {
    cost: GaussianFactorGraph,
    equalities: Vec<Arc<LinearEquality>>,
    inequalities: Vec<Arc<LinearInequality>>,
}

impl QP {
    /// Build a QP, rejecting:
    /// - a dual key used by more than one constraint
    /// - a dual key that is also a primal variable
    /// - a variable used with two different dimensions
    /// - a variable that appears only in inequalities (its value would be
    ///   undetermined whenever those inequalities are inactive)
    pub fn new(
        cost: GaussianFactorGraph,
        equalities: Vec<LinearEquality>,
        inequalities: Vec<LinearInequality>,
    ) -> QpResult<Self> {
        let qp = Self {
            cost,
            equalities: equalities.into_iter().map(Arc::new).collect(),
            inequalities: inequalities.into_iter().map(Arc::new).collect(),
        };
        qp.validate()?;
        Ok(qp)
    }

    fn validate(&self) -> QpResult<()> {
        let primal = self.primal_keys();

        let mut duals = BTreeSet::new();
        let dual_keys = self
            .equalities
            .iter()
            .map(|e| e.dual_key())
            .chain(self.inequalities.iter().map(|i| i.dual_key()));
        for dual_key in dual_keys {
            if !duals.insert(dual_key) {
                return Err(QpError::InvalidInput(format!(
                    "dual key {} is used by more than one constraint",
                    format_key(dual_key)
                )));
            }
            if primal.contains(&dual_key) {
                return Err(QpError::InvalidInput(format!(
                    "dual key {} is also a primal variable",
                    format_key(dual_key)
                )));
            }
        }

        let mut dims = Vec::new();
        for factor in self.factors() {
            for key in factor.keys() {
                if let Some(dim) = factor.dim(*key) {
                    dims.push((*key, dim));
                }
            }
        }
        Ordering::from_dims(dims)?;

        let mut determined = self.cost.keys();
        determined.extend(self.equalities.iter().flat_map(|e| e.keys().iter().copied()));
        if let Some(key) = primal.iter().find(|key| !determined.contains(key)) {
            return Err(QpError::InvalidInput(format!(
                "variable {} appears only in inequality constraints",
                format_key(*key)
            )));
        }
        Ok(())
    }

    fn factors(&self) -> impl Iterator<Item = &dyn LinearFactor> {
        let cost = self.cost.iter().map(|f| f.as_ref() as &dyn LinearFactor);
        let equalities = self.equalities.iter().map(|e| e.as_ref() as &dyn LinearFactor);
        let inequalities = self.inequalities.iter().map(|i| i.as_ref() as &dyn LinearFactor);
        cost.chain(equalities).chain(inequalities)
    }

    pub fn cost_graph(&self) -> &GaussianFactorGraph {
        &self.cost
    }

    pub fn equalities(&self) -> &[Arc<LinearEquality>] {
        &self.equalities
    }

    pub fn inequalities(&self) -> &[Arc<LinearInequality>] {
        &self.inequalities
    }

    /// Every variable of the cost and the constraints
    pub fn primal_keys(&self) -> BTreeSet<Key> {
        self.factors()
            .flat_map(|f| f.keys().iter().copied())
            .collect()
    }

    /// Objective value at `values`
    pub fn cost(&self, values: &VectorValues) -> QpResult<f64> {
        self.cost.error(values)
    }

    /// True when every equality holds and no inequality is violated by more than `tol`.
    pub fn is_feasible(&self, values: &VectorValues, tol: f64) -> QpResult<bool> {
        for equality in &self.equalities {
            if equality.residual(values)?.amax() > tol {
                return Ok(false);
            }
        }
        for inequality in &self.inequalities {
            if inequality.violation(values)? > tol {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for QP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "QP: {} cost terms, {} equalities, {} inequalities",
            self.cost.len(),
            self.equalities.len(),
            self.inequalities.len()
        )?;
        for equality in &self.equalities {
            let keys: Vec<String> = equality.keys().iter().map(|k| format_key(*k)).collect();
            writeln!(
                f,
                "  equality {} on [{}], {} rows",
                format_key(equality.dual_key()),
                keys.join(", "),
                equality.rows()
            )?;
        }
        for inequality in &self.inequalities {
            let terms: Vec<String> = inequality
                .terms()
                .map(|(key, row)| {
                    let coefficients: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
                    format!("[{}]·{}", coefficients.join(", "), format_key(key))
                })
                .collect();
            writeln!(
                f,
                "  inequality {}: {} <= {}",
                format_key(inequality.dual_key()),
                terms.join(" + "),
                inequality.b()
            )?;
        }
        Ok(())
    }
}
