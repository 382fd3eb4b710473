//! Quadratic programming over linear factor graphs
//!
//! - [`QP`]: cost graph plus equality and inequality constraints
//! - [`WorkingSet`]: which inequalities are currently held at their bound
//! - [`QpState`]: one snapshot of the active-set loop
//! - [`QpSolver`]: the primal active-set method
//! - [`QpSolverConfig`]: iteration cap, tolerances and linear back end

pub mod config;
pub mod problem;
pub mod solver;
pub mod state;
pub mod working_set;

pub use config::QpSolverConfig;
pub use problem::QP;
pub use solver::QpSolver;
pub use state::QpState;
pub use working_set::WorkingSet;
