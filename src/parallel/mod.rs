//! Point-to-point transport between partitions and batch partitioning across workers.
//!
//! The halo code only needs non-blocking sends and receives keyed by
//! (peer, tag) plus a sum reduction. Messages between a given pair of ranks with
//! the same tag are delivered in the order they were posted.

use crate::core::Scalar;
use crate::error::FdError;

pub mod local;
pub mod partition;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiTransport;

pub use local::LocalTransport;
pub use partition::{partition, worker_range};

/// Message tag of a halo slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u32);

/// Tag coordinates of a chunk in flight: the pipeline worker that owns it and the
/// buffer slot (0 or 1) it occupies. Concurrent chunks of one partition never share
/// a space, so their slabs never share a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagSpace {
    pub worker: usize,
    pub slot: usize,
}

impl TagSpace {
    pub fn new(worker: usize, slot: usize) -> Self {
        Self { worker, slot }
    }

    pub fn validate(&self) -> Result<(), FdError> {
        if self.slot > 1 {
            return Err(FdError::InvalidOptions(format!("tag slot {} out of range 0..2", self.slot)));
        }
        Ok(())
    }

    /// Tag for the slab sent along `axis`. `dir` is the direction of travel:
    /// 0 towards the lower neighbour, 1 towards the upper one.
    pub fn halo(self, axis: usize, dir: usize) -> Tag {
        debug_assert!(self.slot < 2 && axis < 3 && dir < 2);
        Tag((((self.worker * 2 + self.slot) * 3 + axis) * 2 + dir) as u32)
    }
}

pub trait Transport<T: Scalar> {
    /// Handle of a posted send, completed by `wait_send`.
    type SendRequest;
    /// Handle of a posted receive, completed by `wait_recv`.
    type RecvRequest;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Post a send of `buf` to `dest`. Returns without waiting for the receiver.
    fn post_send(&self, buf: Vec<T>, dest: usize, tag: Tag) -> Result<Self::SendRequest, FdError>;
    /// Post a receive of exactly `len` elements from `src`.
    fn post_recv(&self, len: usize, src: usize, tag: Tag) -> Result<Self::RecvRequest, FdError>;
    fn wait_send(&self, req: Self::SendRequest) -> Result<(), FdError>;
    /// Block until the message arrives. A message of the wrong length is a
    /// transport failure.
    fn wait_recv(&self, req: Self::RecvRequest) -> Result<Vec<T>, FdError>;

    fn barrier(&self);
    /// Sum of `x` over all ranks.
    fn all_reduce_sum(&self, x: f64) -> f64;
    /// Largest `x` over all ranks.
    fn all_reduce_max(&self, x: f64) -> f64;

    /// Global ⟨x, y⟩ real part.
    fn dot(&self, x: &[T], y: &[T]) -> f64 {
        self.all_reduce_sum(crate::core::local_dot(x, y).re())
    }
}
