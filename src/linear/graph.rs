use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{LinearSystem, Ordering};
use crate::core::key::format_key;
use crate::core::{Key, VariableIndex, VectorValues};
use crate::error::{QpError, QpResult};
use crate::factors::LinearFactor;
use crate::linalg::LinearSolverType;

/// Collection of linear factors that is solved jointly.
///
/// Factors are shared through `Arc`, so cloning a graph and appending to the
/// clone never copies factor data. The active-set loop relies on this to
/// rebuild the working graph every iteration.
///
/// ```
/// use apex_qp::{GaussianFactorGraph, JacobianFactor};
/// use nalgebra::{dmatrix, dvector};
///
/// let mut graph = GaussianFactorGraph::new();
/// graph.push(JacobianFactor::new(vec![(1, dmatrix![1.0])], dvector![3.0]).unwrap());
/// let solution = graph.optimize().unwrap();
/// assert!((solution.at(1).unwrap()[0] - 3.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GaussianFactorGraph {
    factors: Vec<Arc<dyn LinearFactor>>,
}

impl GaussianFactorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F: LinearFactor + 'static>(&mut self, factor: F) {
        self.factors.push(Arc::new(factor));
    }

    pub fn push_shared(&mut self, factor: Arc<dyn LinearFactor>) {
        self.factors.push(factor);
    }

    /// Append every factor of `other`
    pub fn extend_from(&mut self, other: &GaussianFactorGraph) {
        self.factors.extend(other.factors.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&Arc<dyn LinearFactor>> {
        self.factors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LinearFactor>> {
        self.factors.iter()
    }

    /// All keys touched by any factor
    pub fn keys(&self) -> BTreeSet<Key> {
        self.factors
            .iter()
            .flat_map(|f| f.keys().iter().copied())
            .collect()
    }

    pub fn variable_index(&self) -> VariableIndex {
        VariableIndex::new(self.factors.iter().map(|f| f.keys()))
    }

    /// Sum of factor errors
    pub fn error(&self, values: &VectorValues) -> QpResult<f64> {
        self.factors.iter().map(|f| f.error(values)).sum()
    }

    /// Gradient of [`GaussianFactorGraph::error`] with respect to `key`,
    /// summed over the factors that touch it.
    pub fn gradient(&self, key: Key, values: &VectorValues) -> QpResult<nalgebra::DVector<f64>> {
        let mut total: Option<nalgebra::DVector<f64>> = None;
        for factor in self.factors.iter().filter(|f| f.dim(key).is_some()) {
            let g = factor.gradient(key, values)?;
            total = Some(match total {
                Some(sum) => sum + g,
                None => g,
            });
        }
        total.ok_or(QpError::KeyNotFound(key))
    }

    /// Solve with the default linear solver
    pub fn optimize(&self) -> QpResult<VectorValues> {
        self.optimize_with(LinearSolverType::default())
    }

    /// Minimize the sum of soft factor errors subject to every hard row.
    pub fn optimize_with(&self, solver_type: LinearSolverType) -> QpResult<VectorValues> {
        let ordering = self.ordering()?;
        let mut system = LinearSystem::new(ordering);
        for factor in &self.factors {
            factor.add_to_system(&mut system)?;
        }
        debug!(
            "solving linear graph: {} factors, {} variables, {} hard rows",
            self.factors.len(),
            system.ordering().len(),
            system.num_hard_rows()
        );
        system.solve(solver_type)
    }

    fn ordering(&self) -> QpResult<Ordering> {
        let mut dims = Vec::new();
        for factor in &self.factors {
            for key in factor.keys() {
                let dim = factor.dim(*key).ok_or_else(|| {
                    QpError::InvalidInput(format!(
                        "factor lists key {} but has no block for it",
                        format_key(*key)
                    ))
                })?;
                dims.push((*key, dim));
            }
        }
        Ordering::from_dims(dims)
    }
}

impl fmt::Display for GaussianFactorGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GaussianFactorGraph: {} factors", self.factors.len())?;
        for (i, factor) in self.factors.iter().enumerate() {
            let keys: Vec<String> = factor.keys().iter().map(|k| format_key(*k)).collect();
            writeln!(f, "  factor {i}: [{}]", keys.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::{HessianFactor, JacobianFactor, LinearEquality, LinearInequality};
    use nalgebra::{dmatrix, dvector};

    const TOLERANCE: f64 = 1e-9;

    fn prior(key: Key, target: f64) -> JacobianFactor {
        JacobianFactor::new(vec![(key, dmatrix![1.0])], dvector![target]).unwrap()
    }

    #[test]
    fn test_error_and_gradient_sum_over_factors() {
        let mut graph = GaussianFactorGraph::new();
        graph.push(prior(1, 1.0));
        graph.push(prior(1, 3.0));
        let values: VectorValues = [(1, dvector![0.0])].into_iter().collect();

        assert_eq!(graph.error(&values).unwrap(), 5.0);
        assert_eq!(graph.gradient(1, &values).unwrap(), dvector![-4.0]);
        assert!(matches!(graph.gradient(2, &values), Err(QpError::KeyNotFound(2))));
    }

    #[test]
    fn test_optimize_with_equality() {
        // min ½(x1² + x2²) s.t. x1 + x2 = 1
        let mut graph = GaussianFactorGraph::new();
        graph.push(prior(1, 0.0));
        graph.push(prior(2, 0.0));
        graph.push(
            LinearEquality::new(vec![(1, dmatrix![1.0]), (2, dmatrix![1.0])], dvector![1.0], 10)
                .unwrap(),
        );

        let solution = graph.optimize().unwrap();
        assert!((solution.at(1).unwrap()[0] - 0.5).abs() < TOLERANCE);
        assert!((solution.at(2).unwrap()[0] - 0.5).abs() < TOLERANCE);
        // the multiplier key is not a primal unknown
        assert!(!solution.contains(10));
    }

    #[test]
    fn test_active_inequality_is_a_hard_row() {
        let mut graph = GaussianFactorGraph::new();
        graph.push(prior(1, 10.0));
        graph.push(LinearInequality::new(vec![(1, dvector![1.0])], 5.0, 20).unwrap());

        let solution = graph.optimize().unwrap();
        assert!((solution.at(1).unwrap()[0] - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_mixed_hessian_and_jacobian() {
        // (x1² − x1x2 + x2² − 3x1) + ½(x2 − 1)²
        let mut graph = GaussianFactorGraph::new();
        graph.push(
            HessianFactor::binary(
                1,
                2,
                dmatrix![2.0],
                dmatrix![-1.0],
                dmatrix![2.0],
                dvector![3.0],
                dvector![0.0],
                0.0,
            )
            .unwrap(),
        );
        graph.push(prior(2, 1.0));

        // [2 −1; −1 3] x = [3; 1]  ->  x = (2, 1)
        let solution = graph.optimize().unwrap();
        assert!((solution.at(1).unwrap()[0] - 2.0).abs() < TOLERANCE);
        assert!((solution.at(2).unwrap()[0] - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_clone_shares_factors() {
        let mut graph = GaussianFactorGraph::new();
        graph.push(prior(1, 1.0));
        let mut extended = graph.clone();
        extended.push(prior(2, 2.0));

        assert_eq!(graph.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.keys().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(Arc::ptr_eq(graph.at(0).unwrap(), extended.at(0).unwrap()));
    }

    #[test]
    fn test_empty_graph_optimizes_to_empty_values() {
        let graph = GaussianFactorGraph::new();
        assert!(graph.optimize().unwrap().is_empty());
        assert!(graph.to_string().contains("0 factors"));
    }
}
