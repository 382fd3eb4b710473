use crate::linalg::LinearSolverType;

/// Configuration for the active-set [`QpSolver`](super::QpSolver).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QpSolverConfig {
    /// Upper bound on calls to `iterate` before `optimize` gives up
    pub max_iterations: usize,
    /// `|aᵀx₀ − b|` below which a cold-started inequality counts as active
    pub feasibility_tolerance: f64,
    /// Per-entry tolerance under which a new solution equals the previous one
    pub convergence_tolerance: f64,
    /// Back end for systems without hard rows
    pub linear_solver_type: LinearSolverType,
}

impl Default for QpSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            feasibility_tolerance: 1e-7,
            convergence_tolerance: 1e-7,
            linear_solver_type: LinearSolverType::default(),
        }
    }
}

impl QpSolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tolerance: f64) -> Self {
        self.feasibility_tolerance = tolerance;
        self
    }

    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    pub fn with_linear_solver_type(mut self, linear_solver_type: LinearSolverType) -> Self {
        self.linear_solver_type = linear_solver_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QpSolverConfig::new();
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.feasibility_tolerance, 1e-7);
        assert_eq!(config.convergence_tolerance, 1e-7);
        assert_eq!(config.linear_solver_type, LinearSolverType::SparseCholesky);
    }

    #[test]
    fn test_builder() {
        let config = QpSolverConfig::new()
            .with_max_iterations(5)
            .with_feasibility_tolerance(1e-9)
            .with_convergence_tolerance(1e-10)
            .with_linear_solver_type(LinearSolverType::SparseQR);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.feasibility_tolerance, 1e-9);
        assert_eq!(config.convergence_tolerance, 1e-10);
        assert_eq!(config.linear_solver_type, LinearSolverType::SparseQR);
    }
}
