//! Linear factor graphs and their joint solve
//!
//! [`GaussianFactorGraph`] is the unit the active-set loop works with: the
//! cost plus equality constraints, optionally extended with the currently
//! active inequalities, or the per-variable stationarity equations whose
//! solution is the vector of Lagrange multipliers. Either way the graph is
//! assembled into one [`LinearSystem`] and solved by a sparse direct method.

pub mod graph;
pub mod system;

pub use graph::GaussianFactorGraph;
pub use system::{LinearSystem, Ordering};
