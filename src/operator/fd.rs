//! Distributed finite-difference operator: one stencil, one halo channel.

use tracing::debug;

use crate::config::{HaloRefresh, PipelineOptions, RelaxMethod, RelaxOptions};
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::{GridDescriptor, Layout};
use crate::halo::{Boundary, Phases};
use crate::parallel::{TagSpace, Transport};
use crate::pipeline::{ChunkKernel, DoubleBufferedPipeline};
use crate::stencil::{FlatStencil, Stencil, gauss_seidel, jacobi};
use crate::utils::zeroed;

#[derive(Debug, Clone)]
pub struct FdOperator {
    stencil: Stencil,
    flat: FlatStencil,
    boundary: Boundary,
}

impl FdOperator {
    /// Operator on the local domain of `gd`, halo as wide as the stencil's range.
    pub fn new(gd: &GridDescriptor, stencil: Stencil, channels: usize) -> Result<Self, FdError> {
        let boundary = Boundary::symmetric(gd, stencil.range(), channels)?;
        let flat = stencil.bind(boundary.layout())?;
        Ok(Self { stencil, flat, boundary })
    }

    /// `scale · ∇²` of order `2·nn` at the spacing of `gd`.
    pub fn laplace(gd: &GridDescriptor, scale: f64, nn: usize, channels: usize) -> Result<Self, FdError> {
        Self::new(gd, Stencil::laplace(scale, gd.spacing(), nn)?, channels)
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn layout(&self) -> &Layout {
        self.boundary.layout()
    }

    /// Diagonal element of the operator.
    pub fn diagonal(&self) -> f64 {
        self.stencil.center()
    }

    /// `output = S input` for a batch of unpadded grids.
    pub fn apply<T: Scalar, C: Transport<T> + Sync>(
        &self,
        comm: &C,
        input: &[T],
        output: &mut [T],
        phases: &Phases<T>,
        opts: &PipelineOptions,
    ) -> Result<(), FdError> {
        DoubleBufferedPipeline::new(opts.clone())?.run(comm, self, input, output, phases)
    }

    /// `r = src − S x`.
    pub fn residual<T: Scalar, C: Transport<T> + Sync>(
        &self,
        comm: &C,
        x: &[T],
        src: &[T],
        r: &mut [T],
        phases: &Phases<T>,
        opts: &PipelineOptions,
    ) -> Result<(), FdError> {
        FdError::check_len("residual source", x.len(), src.len())?;
        self.apply(comm, x, r, phases, opts)?;
        for (ri, &si) in r.iter_mut().zip(src) {
            *ri = si - *ri;
        }
        Ok(())
    }

    /// Relax `S x = src` in place for every grid of the batch.
    ///
    /// With [`HaloRefresh::Once`] the halo is exchanged before the first sweep only;
    /// Jacobi refreshes the interior of its padded copy between sweeps and keeps the
    /// halo snapshot.
    pub fn relax<T: Scalar, C: Transport<T>>(
        &self,
        comm: &C,
        x: &mut [T],
        src: &[T],
        phases: &Phases<T>,
        opts: &RelaxOptions,
    ) -> Result<(), FdError> {
        if !(opts.omega.is_finite() && opts.omega > 0.0) {
            return Err(FdError::InvalidOptions(format!("relaxation weight {} must be positive", opts.omega)));
        }
        let layout = *self.boundary.layout();
        let ilen = layout.interior_len();
        let nbatch = x.len() / ilen;
        FdError::check_len("relax field", nbatch * ilen, x.len())?;
        FdError::check_len("relax source", x.len(), src.len())?;
        debug!(nbatch, sweeps = opts.sweeps, method = ?opts.method, "relax");
        if opts.sweeps == 0 {
            return Ok(());
        }
        let mut a = zeroed(layout.padded_len())?;
        for (xg, sg) in x.chunks_mut(ilen).zip(src.chunks(ilen)) {
            layout.paste(xg, &mut a);
            self.boundary.exchange(comm, &mut a, 1, phases, TagSpace::default())?;
            for sweep in 0..opts.sweeps {
                if sweep > 0 {
                    if opts.method == RelaxMethod::Jacobi {
                        layout.copy_interior(xg, &mut a);
                    }
                    if opts.refresh == HaloRefresh::EverySweep {
                        self.boundary.exchange(comm, &mut a, 1, phases, TagSpace::default())?;
                    }
                }
                match opts.method {
                    RelaxMethod::GaussSeidel => gauss_seidel(&self.flat, &mut a, sg, xg)?,
                    RelaxMethod::Jacobi => jacobi(&self.flat, &a, sg, xg, opts.omega)?,
                }
            }
        }
        Ok(())
    }
}

impl<T: Scalar> ChunkKernel<T> for FdOperator {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn output_len(&self) -> usize {
        self.boundary.layout().interior_len()
    }

    fn compute(&self, input: &[T], output: &mut [T], _scratch: &mut [T]) -> Result<(), FdError> {
        self.flat.apply(input, output)
    }
}
