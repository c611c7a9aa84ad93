//! Preconditioners for grid operators.
//!
//! This module defines the Preconditioner trait and the three-level multigrid
//! preconditioner for the kinetic-energy operator.

use crate::core::Scalar;
use crate::error::FdError;
use crate::halo::Phases;
use crate::parallel::Transport;

/// A preconditioner M ≈ A⁻¹ acting on a batch of distributed grids.
pub trait Preconditioner<T: Scalar, C: Transport<T>> {
    /// Apply M⁻¹ to the batch `r`, writing z = M⁻¹ r
    fn apply(&self, comm: &C, r: &[T], z: &mut [T], phases: &Phases<T>) -> Result<(), FdError>;
}

pub mod multigrid;

pub use multigrid::Multigrid;
