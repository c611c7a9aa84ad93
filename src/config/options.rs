//! Tuning options for the halo pipeline, relaxation and the Poisson solver.
//!
//! These structs replace process-wide knobs: every value that changes how work is
//! chunked or scheduled is passed in explicitly by the caller. None of them change
//! results, except the relaxation parameters (which define the smoother).

use crate::error::FdError;

/// Scheduling options for the double-buffered halo pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Number of worker threads the batch is split across.
    pub workers: usize,

    /// Overlap the exchange of chunk i+1 with the compute of chunk i.
    /// When false, every grid is exchanged and computed in turn.
    pub double_buffering: bool,

    /// Preferred message size in KiB. The largest chunk holds as many grids as fit
    /// in one message of this size (at least one). `None` means one grid per chunk.
    pub optimal_msg_size: Option<usize>,

    /// Growth step of the chunk size. Defaults to the largest chunk.
    pub chunk_increment: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            double_buffering: true,
            optimal_msg_size: None,
            chunk_increment: None,
        }
    }
}

impl PipelineOptions {
    /// Single worker, default chunking.
    pub fn serial() -> Self {
        Self { workers: 1, ..Self::default() }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_double_buffering(mut self, flag: bool) -> Self {
        self.double_buffering = flag;
        self
    }

    pub fn with_optimal_msg_size(mut self, kib: usize) -> Self {
        self.optimal_msg_size = Some(kib);
        self
    }

    pub fn with_chunk_increment(mut self, inc: usize) -> Self {
        self.chunk_increment = Some(inc);
        self
    }

    pub fn validate(&self) -> Result<(), FdError> {
        if self.workers == 0 {
            return Err(FdError::InvalidOptions("workers must be >= 1".into()));
        }
        if self.chunk_increment == Some(0) {
            return Err(FdError::InvalidOptions("chunk_increment must be >= 1".into()));
        }
        Ok(())
    }

    /// Largest chunk (in grids) for a per-grid message of `send_bytes`,
    /// bounded by `ngrids`.
    pub fn max_chunk(&self, send_bytes: usize, ngrids: usize) -> usize {
        let chunk = match self.optimal_msg_size {
            Some(kib) if send_bytes > 0 => (kib * 1024) / send_bytes,
            _ => 1,
        };
        chunk.clamp(1, ngrids.max(1))
    }

    /// Chunk growth step for a given largest chunk.
    pub fn increment(&self, max_chunk: usize) -> usize {
        self.chunk_increment.unwrap_or(max_chunk).clamp(1, max_chunk.max(1))
    }
}

/// Relaxation scheme used by [`crate::stencil::relax`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxMethod {
    /// In-place lexicographic sweep.
    GaussSeidel,
    /// Weighted Jacobi on a snapshot.
    Jacobi,
}

/// When the halo is refreshed during a multi-sweep relaxation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HaloRefresh {
    /// Exchange once before the first sweep; later sweeps reuse that halo snapshot.
    #[default]
    Once,
    /// Exchange before every sweep.
    EverySweep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxOptions {
    pub method: RelaxMethod,
    pub sweeps: usize,
    /// Jacobi weight ω. Ignored by Gauss-Seidel.
    pub omega: f64,
    pub refresh: HaloRefresh,
}

impl Default for RelaxOptions {
    fn default() -> Self {
        Self {
            method: RelaxMethod::GaussSeidel,
            sweeps: 1,
            omega: 1.0,
            refresh: HaloRefresh::Once,
        }
    }
}

impl RelaxOptions {
    pub fn gauss_seidel(sweeps: usize) -> Self {
        Self { method: RelaxMethod::GaussSeidel, sweeps, ..Self::default() }
    }

    pub fn jacobi(sweeps: usize, omega: f64) -> Self {
        Self { method: RelaxMethod::Jacobi, sweeps, omega, ..Self::default() }
    }

    pub fn with_refresh(mut self, refresh: HaloRefresh) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Multigrid Poisson solver parameters.
#[derive(Debug, Clone)]
pub struct PoissonOptions {
    /// Central-difference order of the Laplacian (number of neighbours per side).
    pub nn: usize,
    /// Smoother used before and after the coarse correction on every level.
    pub relax: RelaxOptions,
    /// Sweeps of the same smoother on the coarsest level.
    pub coarse_sweeps: usize,
    /// Stop when the grid-integrated squared residual drops below this.
    pub eps: f64,
    pub max_iter: usize,
    /// Upper bound on the number of coarse levels.
    pub max_levels: usize,
    /// Transfer order between levels.
    pub transfer_order: usize,
}

impl Default for PoissonOptions {
    fn default() -> Self {
        Self {
            nn: 3,
            relax: RelaxOptions::gauss_seidel(2),
            coarse_sweeps: 4,
            eps: 2e-10,
            max_iter: 1000,
            max_levels: 4,
            transfer_order: 2,
        }
    }
}

impl PoissonOptions {
    pub fn validate(&self) -> Result<(), FdError> {
        if self.eps <= 0.0 || !self.eps.is_finite() {
            return Err(FdError::InvalidOptions(format!("tolerance {} must be positive", self.eps)));
        }
        Ok(())
    }
}
