//! Multigrid Poisson solver: V-cycles of relax → residual → restrict → recurse →
//! interpolate → relax on a hierarchy of coarsened grids.

use tracing::debug;

use crate::config::{PipelineOptions, PoissonOptions, RelaxOptions};
use crate::core::{Scalar, local_norm_sqr};
use crate::error::FdError;
use crate::grid::GridDescriptor;
use crate::halo::Phases;
use crate::operator::FdOperator;
use crate::parallel::Transport;
use crate::transfer::Transformer;
use crate::utils::convergence::{Convergence, SolveStats};
use crate::utils::zeroed;

#[derive(Debug, Clone)]
struct Level {
    op: FdOperator,
    dv: f64,
    /// Restriction to and interpolation from the next coarser level.
    down: Option<(Transformer, Transformer)>,
}

/// Per-level work arrays of one solve.
struct Work<T> {
    residual: Vec<T>,
    coarse_phi: Vec<T>,
    coarse_rho: Vec<T>,
}

/// Solves `∇²φ = ρ` with the central-difference Laplacian of order `2·nn` on every level.
#[derive(Debug, Clone)]
pub struct PoissonSolver {
    levels: Vec<Level>,
    opts: PoissonOptions,
    pipeline: PipelineOptions,
}

impl PoissonSolver {
    pub fn new(gd: &GridDescriptor, opts: PoissonOptions, pipeline: PipelineOptions) -> Result<Self, FdError> {
        opts.validate()?;
        pipeline.validate()?;
        let width = opts.nn.max(opts.transfer_order);
        let mut gds = vec![gd.clone()];
        while gds.len() <= opts.max_levels {
            match gds[gds.len() - 1].coarsen() {
                // Decided on the smallest domain so every rank builds the same hierarchy.
                Ok(c) if c.smallest_domain().iter().all(|&n| n >= width) => gds.push(c),
                _ => break,
            }
        }
        let mut levels = Vec::with_capacity(gds.len());
        for (i, g) in gds.iter().enumerate() {
            let down = match gds.get(i + 1) {
                Some(c) => Some((
                    Transformer::restrict(g, c, opts.transfer_order, 1)?,
                    Transformer::interpolate(c, g, opts.transfer_order, 1)?,
                )),
                None => None,
            };
            levels.push(Level { op: FdOperator::laplace(g, 1.0, opts.nn, 1)?, dv: g.dv(), down });
        }
        debug!(levels = levels.len(), nn = opts.nn, "poisson hierarchy");
        Ok(Self { levels, opts, pipeline })
    }

    /// Number of grid levels, the fine grid included.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    fn work<T: Scalar>(&self, nbatch: usize) -> Result<Vec<Work<T>>, FdError> {
        (0..self.levels.len())
            .map(|i| {
                let len = |l: &Level| nbatch * l.op.layout().interior_len();
                let coarse = self.levels.get(i + 1).map_or(0, len);
                Ok(Work {
                    residual: zeroed(len(&self.levels[i]))?,
                    coarse_phi: zeroed(coarse)?,
                    coarse_rho: zeroed(coarse)?,
                })
            })
            .collect()
    }

    /// One V-cycle. Returns ∫|∇²φ − ρ|² over the fine grid, measured after the
    /// first smoothing.
    pub fn iterate<T: Scalar, C: Transport<T> + Sync>(
        &self,
        comm: &C,
        phi: &mut [T],
        rho: &[T],
    ) -> Result<f64, FdError> {
        let ilen = self.levels[0].op.layout().interior_len();
        let nbatch = phi.len() / ilen;
        FdError::check_len("potential", nbatch * ilen, phi.len())?;
        FdError::check_len("density", phi.len(), rho.len())?;
        let mut work = self.work(nbatch)?;
        self.cycle(comm, 0, phi, rho, &mut work)
    }

    fn cycle<T: Scalar, C: Transport<T> + Sync>(
        &self,
        comm: &C,
        level: usize,
        phi: &mut [T],
        rho: &[T],
        work: &mut [Work<T>],
    ) -> Result<f64, FdError> {
        let lv = &self.levels[level];
        let phases = Phases::identity();
        let (w, rest) = work
            .split_first_mut()
            .ok_or(FdError::Unsupported("multigrid level without work arrays"))?;

        let Some((restrict, interp)) = &lv.down else {
            let coarse = RelaxOptions { sweeps: self.opts.coarse_sweeps, ..self.opts.relax };
            lv.op.relax(comm, phi, rho, &phases, &coarse)?;
            if level > 0 {
                return Ok(0.0);
            }
            lv.op.residual(comm, phi, rho, &mut w.residual, &phases, &self.pipeline)?;
            return Ok(lv.dv * comm.all_reduce_sum(local_norm_sqr(&w.residual)));
        };

        lv.op.relax(comm, phi, rho, &phases, &self.opts.relax)?;
        // residual = ∇²φ − ρ
        lv.op.residual(comm, phi, rho, &mut w.residual, &phases, &self.pipeline)?;
        for v in w.residual.iter_mut() {
            *v = -*v;
        }
        let error = if level == 0 {
            lv.dv * comm.all_reduce_sum(local_norm_sqr(&w.residual))
        } else {
            0.0
        };
        restrict.apply(comm, &w.residual, &mut w.coarse_rho, &phases, &self.pipeline)?;
        w.coarse_phi.fill(T::zero());
        self.cycle(comm, level + 1, &mut w.coarse_phi, &w.coarse_rho, rest)?;
        interp.apply(comm, &w.coarse_phi, &mut w.residual, &phases, &self.pipeline)?;
        for (p, &e) in phi.iter_mut().zip(&w.residual) {
            *p -= e;
        }
        lv.op.relax(comm, phi, rho, &phases, &self.opts.relax)?;
        Ok(error)
    }

    /// Iterate until the integrated squared residual drops below `eps` or
    /// `max_iter` cycles have run.
    pub fn solve<T: Scalar, C: Transport<T> + Sync>(
        &self,
        comm: &C,
        phi: &mut [T],
        rho: &[T],
    ) -> Result<SolveStats<f64>, FdError> {
        let conv = Convergence { tol: self.opts.eps, max_iters: self.opts.max_iter };
        let mut iteration = 0;
        loop {
            iteration += 1;
            let error = self.iterate(comm, phi, rho)?;
            debug!(iteration, error, "poisson cycle");
            let (stop, stats) = conv.check(error, iteration);
            if stop {
                return Ok(stats);
            }
        }
    }
}
