use std::fmt;

use super::WorkingSet;
use crate::core::VectorValues;

/// Snapshot of the active-set loop after some number of iterations.
///
/// `values` satisfies every equality and every active inequality exactly and
/// every inactive inequality non-strictly. `duals` is empty until the first
/// KKT check unless it was supplied for a warm start.
#[derive(Debug, Clone)]
pub struct QpState {
    pub values: VectorValues,
    pub duals: VectorValues,
    pub working_set: WorkingSet,
    pub converged: bool,
    pub iterations: usize,
}

impl QpState {
    pub fn new(values: VectorValues, duals: VectorValues, working_set: WorkingSet) -> Self {
        Self {
            values,
            duals,
            working_set,
            converged: false,
            iterations: 0,
        }
    }
}

impl fmt::Display for QpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "QpState: iteration {}, converged {}, working set {}",
            self.iterations, self.converged, self.working_set
        )?;
        write!(f, "{}", self.values)?;
        if !self.duals.is_empty() {
            write!(f, "duals {}", self.duals)?;
        }
        Ok(())
    }
}
