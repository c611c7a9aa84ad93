//! Iterative solvers built on the grid operators.

pub mod poisson;
pub use poisson::PoissonSolver;
