//! Active-set quadratic programming on sparse linear factor graphs.
//!
//! A [`QP`] minimizes a quadratic cost, given as a [`GaussianFactorGraph`] of
//! Jacobian and Hessian terms, subject to linear equalities and scalar linear
//! inequalities keyed by variable. [`QpSolver`] runs a primal active-set
//! method from a feasible starting point and returns the optimal values
//! together with the Lagrange multipliers of every binding constraint.
//!
//! Every linear subproblem is solved by a sparse direct factorization from
//! `faer` (Cholesky, QR or LU, see [`linalg`]).

pub mod core;
pub mod error;
pub mod factors;
pub mod linalg;
pub mod linear;
pub mod logger;
pub mod qp;

pub use crate::core::{Key, Symbol, VariableIndex, VectorValues};
pub use error::{QpError, QpResult};
pub use factors::{HessianFactor, JacobianFactor, LinearEquality, LinearFactor, LinearInequality};
pub use linalg::LinearSolverType;
pub use linear::GaussianFactorGraph;
pub use logger::{init_logger, init_logger_with_level};
pub use qp::{QP, QpSolver, QpSolverConfig, QpState, WorkingSet};
