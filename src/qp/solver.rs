//! Primal active-set QP solver
//!
//! Each iteration minimizes the cost subject to the equalities plus the
//! inequalities in the current working set, treated as equalities:
//!
//! - If the minimizer moved, step towards it as far as the inactive
//!   inequalities allow and add the first one hit to the working set.
//! - If it did not move, the point is optimal for the current working set.
//!   Solve the stationarity equations `Σ Aᵀλ = ∇f` for the multipliers; a
//!   positive multiplier marks an active inequality that pulls the wrong
//!   way and is dropped. With none left the point is a KKT point.
//!
//! At convergence every active multiplier is `≤ 0` under this sign
//! convention.

use std::collections::BTreeSet;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use super::{QP, QpSolverConfig, QpState, WorkingSet};
use crate::core::key::format_key;
use crate::core::{Key, VariableIndex, VectorValues};
use crate::error::{QpError, QpResult};
use crate::factors::{JacobianFactor, LinearFactor, LinearInequality};
use crate::linear::GaussianFactorGraph;

/// Active-set solver bound to one [`QP`].
///
/// Construction precomputes everything that does not depend on the working
/// set; the solver is then read-only and can run any number of solves.
///
/// ```
/// use apex_qp::{GaussianFactorGraph, JacobianFactor, LinearInequality, QP, QpSolver, Symbol, VectorValues};
/// use nalgebra::{dmatrix, dvector};
///
/// // minimize ½(x − 10)²  subject to  x ≤ 5
/// let x = Symbol::new('x', 0).key();
/// let mut cost = GaussianFactorGraph::new();
/// cost.push(JacobianFactor::new(vec![(x, dmatrix![1.0])], dvector![10.0])?);
/// let bound = LinearInequality::new(vec![(x, dvector![1.0])], 5.0, Symbol::new('d', 0).key())?;
/// let qp = QP::new(cost, vec![], vec![bound])?;
///
/// let mut initial = VectorValues::new();
/// initial.insert(x, dvector![0.0]);
/// let (values, _duals) = QpSolver::new(qp).optimize(&initial)?;
/// assert!((values.at(x)?[0] - 5.0).abs() < 1e-9);
/// # Ok::<(), apex_qp::QpError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QpSolver {
    qp: QP,
    config: QpSolverConfig,
    base_graph: GaussianFactorGraph,
    cost_variable_index: VariableIndex,
    equality_variable_index: VariableIndex,
    inequality_variable_index: VariableIndex,
    constrained_keys: BTreeSet<Key>,
}

impl QpSolver {
    pub fn new(qp: QP) -> Self {
        Self::with_config(qp, QpSolverConfig::default())
    }

    pub fn with_config(qp: QP, config: QpSolverConfig) -> Self {
        let mut base_graph = qp.cost_graph().clone();
        for equality in qp.equalities() {
            base_graph.push_shared(equality.clone());
        }

        let cost_variable_index = qp.cost_graph().variable_index();
        let equality_variable_index = VariableIndex::new(qp.equalities().iter().map(|e| e.keys()));
        let inequality_variable_index =
            VariableIndex::new(qp.inequalities().iter().map(|i| i.keys()));
        let constrained_keys = equality_variable_index
            .keys()
            .chain(inequality_variable_index.keys())
            .collect();

        Self {
            qp,
            config,
            base_graph,
            cost_variable_index,
            equality_variable_index,
            inequality_variable_index,
            constrained_keys,
        }
    }

    pub fn qp(&self) -> &QP {
        &self.qp
    }

    pub fn config(&self) -> &QpSolverConfig {
        &self.config
    }

    /// Cost plus equality constraints
    pub fn base_graph(&self) -> &GaussianFactorGraph {
        &self.base_graph
    }

    /// Primal keys touched by at least one constraint
    pub fn constrained_keys(&self) -> &BTreeSet<Key> {
        &self.constrained_keys
    }

    /// Minimize the cost subject to the equalities and every active
    /// inequality held at its bound.
    pub fn solve_with_current_working_set(&self, working_set: &WorkingSet) -> QpResult<VectorValues> {
        let mut graph = self.base_graph.clone();
        for (_, inequality) in working_set.active() {
            graph.push_shared(inequality.clone());
        }
        graph.optimize_with(self.config.linear_solver_type)
    }

    /// Stationarity equation of one constrained key,
    /// `Σ Aᵀ_block λ = ∇ₖ cost(values)`, over the equalities and active
    /// inequalities touching it. `None` when no such constraint exists.
    pub fn create_dual_factor(
        &self,
        key: Key,
        working_set: &WorkingSet,
        values: &VectorValues,
    ) -> QpResult<Option<JacobianFactor>> {
        let mut terms: Vec<(Key, DMatrix<f64>)> = Vec::new();
        for &i in self.equality_variable_index.factors(key) {
            let equality = &self.qp.equalities()[i];
            if let Some(block) = equality.block(key) {
                terms.push((equality.dual_key(), block.transpose()));
            }
        }
        for &i in self.inequality_variable_index.factors(key) {
            if !working_set.is_active(i) {
                continue;
            }
            let inequality = &self.qp.inequalities()[i];
            if let Some(row) = inequality.row(key) {
                terms.push((inequality.dual_key(), row.transpose()));
            }
        }
        if terms.is_empty() {
            return Ok(None);
        }

        let mut gradient = DVector::zeros(values.at(key)?.len());
        for &i in self.cost_variable_index.factors(key) {
            if let Some(factor) = self.qp.cost_graph().at(i) {
                gradient += factor.gradient(key, values)?;
            }
        }
        Ok(Some(JacobianFactor::new(terms, gradient)?))
    }

    /// One dual factor per constrained key; its solution holds a multiplier
    /// for every equality and every active inequality.
    pub fn build_dual_graph(
        &self,
        working_set: &WorkingSet,
        values: &VectorValues,
    ) -> QpResult<GaussianFactorGraph> {
        let mut dual_graph = GaussianFactorGraph::new();
        for key in &self.constrained_keys {
            if let Some(factor) = self.create_dual_factor(*key, working_set, values)? {
                dual_graph.push(factor);
            }
        }
        Ok(dual_graph)
    }

    /// Active inequality with the largest strictly positive multiplier, first
    /// in index order on ties.
    pub fn identify_leaving_constraint(
        &self,
        working_set: &WorkingSet,
        duals: &VectorValues,
    ) -> QpResult<Option<usize>> {
        let mut leaving = None;
        let mut max_lambda = 0.0;
        for (i, inequality) in working_set.active() {
            let lambda = duals.at(inequality.dual_key())?[0];
            if lambda > max_lambda {
                max_lambda = lambda;
                leaving = Some(i);
            }
        }
        Ok(leaving)
    }

    /// Longest step `α ∈ [0, 1]` along `p` from `xk` that keeps every
    /// inactive inequality satisfied, and the inequality that blocks it.
    ///
    /// A blocking constraint is reported only when `α < 1`; the first one
    /// in index order wins ties.
    pub fn compute_step_size(
        &self,
        working_set: &WorkingSet,
        xk: &VectorValues,
        p: &VectorValues,
    ) -> QpResult<(f64, Option<usize>)> {
        let mut min_alpha = 1.0;
        let mut blocking = None;
        for (i, inequality) in working_set.inactive() {
            let a_p = inequality.dot_product_row(p)?;
            if a_p <= 0.0 {
                continue;
            }
            let a_x = inequality.dot_product_row(xk)?;
            let alpha = (inequality.b() - a_x) / a_p;
            if alpha < min_alpha {
                min_alpha = alpha;
                blocking = Some(i);
            }
        }
        Ok((min_alpha, blocking))
    }

    /// One active-set step.
    pub fn iterate(&self, state: &QpState) -> QpResult<QpState> {
        let new_values = self.solve_with_current_working_set(&state.working_set)?;
        let iterations = state.iterations + 1;

        if new_values.equals(&state.values, self.config.convergence_tolerance) {
            let duals = self
                .build_dual_graph(&state.working_set, &new_values)?
                .optimize_with(self.config.linear_solver_type)?;

            return match self.identify_leaving_constraint(&state.working_set, &duals)? {
                None => {
                    debug!("iteration {iterations}: KKT point, working set {}", state.working_set);
                    Ok(QpState {
                        values: new_values,
                        duals,
                        working_set: state.working_set.clone(),
                        converged: true,
                        iterations,
                    })
                }
                Some(leaving) => {
                    debug!(
                        "iteration {iterations}: releasing inequality {leaving} ({})",
                        self.describe_dual(leaving, &duals)
                    );
                    Ok(QpState {
                        values: new_values,
                        duals,
                        working_set: state.working_set.deactivated(leaving)?,
                        converged: false,
                        iterations,
                    })
                }
            };
        }

        let p = new_values.sub(&state.values)?;
        let (alpha, blocking) = self.compute_step_size(&state.working_set, &state.values, &p)?;
        let working_set = match blocking {
            Some(i) => state.working_set.activated(i)?,
            None => state.working_set.clone(),
        };
        debug!(
            "iteration {iterations}: step {:.6e}, alpha {alpha:.6}, blocking {blocking:?}",
            p.norm()
        );

        Ok(QpState {
            values: state.values.add_scaled(alpha, &p)?,
            duals: state.duals.clone(),
            working_set,
            converged: false,
            iterations,
        })
    }

    /// Initial working set.
    ///
    /// With `warm_start` and non-empty `duals`, an inequality is active
    /// exactly when `duals` holds its multiplier. Otherwise inequalities
    /// within `feasibility_tolerance` of their bound at `initial` are active
    /// and a violated inequality is an error.
    pub fn identify_active_constraints(
        &self,
        inequalities: &[Arc<LinearInequality>],
        initial: &VectorValues,
        duals: &VectorValues,
        warm_start: bool,
    ) -> QpResult<WorkingSet> {
        let mut active = Vec::with_capacity(inequalities.len());
        for (i, inequality) in inequalities.iter().enumerate() {
            if warm_start && !duals.is_empty() {
                active.push(duals.contains(inequality.dual_key()));
                continue;
            }
            let violation = inequality.violation(initial)?;
            if violation > 0.0 {
                return Err(QpError::InfeasibleInitialValues {
                    constraint: i,
                    violation,
                });
            }
            active.push(violation.abs() < self.config.feasibility_tolerance);
        }
        WorkingSet::with_flags(inequalities.to_vec(), active)
    }

    /// State `optimize` starts from. `initial` must hold exactly the QP's
    /// variables.
    pub fn initial_state(
        &self,
        initial: &VectorValues,
        duals: &VectorValues,
        warm_start: bool,
    ) -> QpResult<QpState> {
        let primal = self.qp.primal_keys();
        if let Some(missing) = primal.iter().find(|key| !initial.contains(**key)) {
            return Err(QpError::KeyNotFound(*missing));
        }
        if let Some(extra) = initial.keys().find(|key| !primal.contains(key)) {
            return Err(QpError::InvalidInput(format!(
                "initial values hold {} which is not a variable of the QP",
                format_key(extra)
            )));
        }

        let working_set =
            self.identify_active_constraints(self.qp.inequalities(), initial, duals, warm_start)?;
        Ok(QpState::new(initial.clone(), duals.clone(), working_set))
    }

    /// Run `iterate` from `state` until convergence.
    pub fn solve_from(&self, mut state: QpState) -> QpResult<QpState> {
        debug!("starting active-set loop, working set {}", state.working_set);
        while !state.converged {
            if state.iterations >= self.config.max_iterations {
                warn!(
                    "active-set loop stopped after {} iterations without convergence",
                    state.iterations
                );
                return Err(QpError::MaxIterationsReached {
                    iterations: state.iterations,
                });
            }
            state = self.iterate(&state)?;
        }
        info!(
            "QP converged after {} iterations, cost {:.6e}, {} active inequalities",
            state.iterations,
            self.qp.cost(&state.values)?,
            state.working_set.num_active()
        );
        Ok(state)
    }

    /// Solve from a feasible starting point, returning `(values, duals)`.
    pub fn optimize(&self, initial: &VectorValues) -> QpResult<(VectorValues, VectorValues)> {
        self.optimize_with_duals(initial, &VectorValues::new(), false)
    }

    /// Solve with optional prior multipliers; see
    /// [`QpSolver::identify_active_constraints`] for how `warm_start` uses them.
    pub fn optimize_with_duals(
        &self,
        initial: &VectorValues,
        duals: &VectorValues,
        warm_start: bool,
    ) -> QpResult<(VectorValues, VectorValues)> {
        let state = self.initial_state(initial, duals, warm_start)?;
        let state = self.solve_from(state)?;
        Ok((state.values, state.duals))
    }

    fn describe_dual(&self, index: usize, duals: &VectorValues) -> String {
        match self.qp.inequalities().get(index) {
            Some(inequality) => {
                let dual_key = inequality.dual_key();
                match duals.get(dual_key) {
                    Some(lambda) => format!("{} = {:.6}", format_key(dual_key), lambda[0]),
                    None => format_key(dual_key),
                }
            }
            None => String::new(),
        }
    }
}
