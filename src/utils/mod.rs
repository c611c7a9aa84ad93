pub mod convergence;
pub mod scratch;

pub use convergence::{Convergence, SolveStats};
pub use scratch::zeroed;
