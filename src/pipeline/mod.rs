//! Batched operator application with halo exchange overlapped against compute.

pub mod double_buffer;
pub mod schedule;

pub use double_buffer::DoubleBufferedPipeline;
pub use schedule::ChunkSchedule;

use crate::core::Scalar;
use crate::error::FdError;
use crate::halo::Boundary;

/// A per-grid computation that reads one padded grid and writes one unpadded result.
///
/// The pipeline owns exchange and scheduling; the kernel only sees grids whose halo
/// is complete.
pub trait ChunkKernel<T: Scalar>: Sync {
    /// Halo channel (and padded layout) of the input grids.
    fn boundary(&self) -> &Boundary;

    /// Scalars written per grid.
    fn output_len(&self) -> usize;

    /// Private scratch needed per worker.
    fn scratch_len(&self) -> usize {
        0
    }

    fn compute(&self, input: &[T], output: &mut [T], scratch: &mut [T]) -> Result<(), FdError>;
}
