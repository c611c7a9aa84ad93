//! MPI-based halo transport.
//!
//! This module provides an implementation of the `Transport` trait on top of the MPI
//! (Message Passing Interface) backend for distributed-memory runs. It is only
//! available when the `mpi` feature is enabled.
//!
//! # Usage
//!
//! - MPI is initialized with `MPI_THREAD_MULTIPLE`: pipeline workers post and wait
//!   on the communicator from several threads at once.
//! - Sends are posted as buffered sends, so posting never waits for the receiver;
//!   the attached buffer must hold every slab that can be in flight at once
//!   (two chunks per worker, both sides of one axis).
//! - Receives are matched by (source, tag) when waited on.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! #[cfg(feature = "mpi")]
//! {
//!     let comm = stencilmg::parallel::MpiTransport::new(64 << 20).unwrap();
//!     println!("Rank: {} / {}", comm.rank, comm.size);
//! }
//! ```

#[cfg(feature = "mpi")]
use mpi::datatype::Equivalence;
#[cfg(feature = "mpi")]
use mpi::environment::Universe;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;
#[cfg(feature = "mpi")]
use mpi::traits::*;
#[cfg(feature = "mpi")]
use mpi::Threading;

#[cfg(feature = "mpi")]
use super::{Tag, Transport};
#[cfg(feature = "mpi")]
use crate::core::Scalar;
#[cfg(feature = "mpi")]
use crate::error::FdError;

/// MPI communicator wrapper for distributed halo exchange.
///
/// Owns the MPI universe (MPI is finalized when this is dropped), the world
/// communicator, the rank of this process and the number of processes.
#[cfg(feature = "mpi")]
pub struct MpiTransport {
    universe: Universe,
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

/// Posted receive: matched when waited on.
#[cfg(feature = "mpi")]
pub struct MpiRecv {
    src: usize,
    tag: Tag,
    len: usize,
}

#[cfg(feature = "mpi")]
impl MpiTransport {
    /// Initializes MPI with full thread support and attaches a send buffer of `buffer_bytes`.
    pub fn new(buffer_bytes: usize) -> Result<Self, FdError> {
        let (mut universe, threading) = mpi::initialize_with_threading(Threading::Multiple)
            .ok_or_else(|| FdError::Transport("MPI already initialized".into()))?;
        if threading != Threading::Multiple {
            return Err(FdError::Transport(format!(
                "MPI provides {threading:?} threading, concurrent workers need Multiple"
            )));
        }
        universe.set_buffer_size(buffer_bytes);
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiTransport { universe, world, rank, size })
    }

    /// Size of the attached send buffer.
    pub fn buffer_size(&self) -> usize {
        self.universe.buffer_size()
    }
}

// SAFETY: `new` only succeeds under MPI_THREAD_MULTIPLE, where any thread may call
// into the communicator concurrently; `&self` methods never mutate Rust-side state.
#[cfg(feature = "mpi")]
unsafe impl Sync for MpiTransport {}

#[cfg(feature = "mpi")]
impl<T: Scalar + Equivalence> Transport<T> for MpiTransport {
    type SendRequest = ();
    type RecvRequest = MpiRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn post_send(&self, buf: Vec<T>, dest: usize, tag: Tag) -> Result<(), FdError> {
        if dest >= self.size {
            return Err(FdError::Transport(format!("send to rank {dest} of {}", self.size)));
        }
        self.world
            .process_at_rank(dest as i32)
            .buffered_send_with_tag(&buf[..], tag.0 as i32);
        Ok(())
    }

    fn post_recv(&self, len: usize, src: usize, tag: Tag) -> Result<MpiRecv, FdError> {
        if src >= self.size {
            return Err(FdError::Transport(format!("receive from rank {src} of {}", self.size)));
        }
        Ok(MpiRecv { src, tag, len })
    }

    fn wait_send(&self, _req: ()) -> Result<(), FdError> {
        Ok(())
    }

    fn wait_recv(&self, req: MpiRecv) -> Result<Vec<T>, FdError> {
        let (data, _status) = self
            .world
            .process_at_rank(req.src as i32)
            .receive_vec_with_tag::<T>(req.tag.0 as i32);
        if data.len() != req.len {
            return Err(FdError::Transport(format!(
                "message {:?} from rank {} has {} elements, expected {}",
                req.tag,
                req.src,
                data.len(),
                req.len
            )));
        }
        Ok(data)
    }

    /// Synchronizes all processes at a barrier.
    fn barrier(&self) {
        self.world.barrier();
    }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce_sum(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    fn all_reduce_max(&self, x: f64) -> f64 {
        use mpi::collective::SystemOperation;
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::max());
        y
    }
}
