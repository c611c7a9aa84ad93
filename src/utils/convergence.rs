//! Convergence tracking & tolerance checks for iterative grid solvers.

/// Stopping criteria: absolute tolerance on the monitored quantity and an iteration cap.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Returns (should_stop, stats) given the current `residual` after iteration `i`.
    pub fn check(&self, residual: T, i: usize) -> (bool, SolveStats<T>) {
        let converged = residual <= self.tol;
        (
            converged || i >= self.max_iters,
            SolveStats {
                iterations: i,
                final_residual: residual,
                converged,
            },
        )
    }
}
