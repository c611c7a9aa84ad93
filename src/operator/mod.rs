//! Batched, distributed operators built from stencils and halo channels.

pub mod fd;
pub mod weighted;

pub use fd::FdOperator;
pub use weighted::WeightedFdOperator;
