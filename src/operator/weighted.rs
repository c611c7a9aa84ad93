//! Weighted finite-difference operator: Σ_s w_s(p) · (S_s a)(p) over a distributed grid.

use crate::config::PipelineOptions;
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::GridDescriptor;
use crate::halo::{Boundary, Phases};
use crate::parallel::Transport;
use crate::pipeline::{ChunkKernel, DoubleBufferedPipeline};
use crate::stencil::{Stencil, WeightedStencilSet};

#[derive(Debug, Clone)]
pub struct WeightedFdOperator {
    set: WeightedStencilSet,
    boundary: Boundary,
}

impl WeightedFdOperator {
    /// `terms` pairs each stencil with its weight grid over the local interior.
    pub fn new(gd: &GridDescriptor, terms: Vec<(Stencil, Vec<f64>)>, channels: usize) -> Result<Self, FdError> {
        let stencils: Vec<Stencil> = terms.iter().map(|(s, _)| s.clone()).collect();
        let boundary = Boundary::symmetric(gd, WeightedStencilSet::range(&stencils), channels)?;
        let set = WeightedStencilSet::new(*boundary.layout(), terms)?;
        Ok(Self { set, boundary })
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

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
}

impl<T: Scalar> ChunkKernel<T> for WeightedFdOperator {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn output_len(&self) -> usize {
        self.boundary.layout().interior_len()
    }

    fn compute(&self, input: &[T], output: &mut [T], _scratch: &mut [T]) -> Result<(), FdError> {
        self.set.apply(input, output)
    }
}
