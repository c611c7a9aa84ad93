//! stencilmg: distributed finite-difference stencils with overlapped halo exchange
//!
//! This crate applies finite-difference, relaxation and grid-transfer operators to batches
//! of 3-D grids split across partitions, hiding the ghost-region exchange behind local
//! compute, and composes them into a multigrid preconditioner and a multigrid Poisson solver.

pub mod parallel;

pub mod config;
pub mod core;
pub mod error;
pub mod grid;
pub mod halo;
pub mod operator;
pub mod pipeline;
pub mod preconditioner;
pub mod solver;
pub mod stencil;
pub mod transfer;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use error::*;
pub use self::core::{Scalar, local_dot, local_norm_sqr};
pub use grid::{GridDescriptor, HIGH, LOW, Layout, PaddedGrid, Region};
pub use halo::{Boundary, Phases};
pub use operator::{FdOperator, WeightedFdOperator};
pub use parallel::{LocalTransport, Tag, TagSpace, Transport, partition};
pub use pipeline::{ChunkKernel, ChunkSchedule, DoubleBufferedPipeline};
pub use preconditioner::{Multigrid, Preconditioner};
pub use solver::PoissonSolver;
pub use stencil::{FlatStencil, Stencil, WeightedStencilSet};
pub use transfer::{Direction, Skip, Transformer};

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
