//! Three-level multigrid approximation of the inverse kinetic-energy operator.
//!
//! Level 0 is the fine grid with the caller's kinetic stencil; levels 1 and 2 are
//! its first and second coarsening with the nearest-neighbour −½∇². The cycle is a
//! fixed sequence of damped-Jacobi style corrections with step `0.66666666 / diag`,
//! scaled by 4 and 16 on the coarse levels.

use tracing::debug;

use super::Preconditioner;
use crate::config::PipelineOptions;
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::GridDescriptor;
use crate::halo::Phases;
use crate::operator::FdOperator;
use crate::parallel::Transport;
use crate::transfer::Transformer;
use crate::utils::zeroed;

/// Damping factor of every correction step.
const DAMPING: f64 = 0.66666666;

#[derive(Debug, Clone)]
pub struct Multigrid {
    kin0: FdOperator,
    kin1: FdOperator,
    kin2: FdOperator,
    restrict0: Transformer,
    restrict1: Transformer,
    interp2: Transformer,
    interp1: Transformer,
    step: f64,
    opts: PipelineOptions,
}

impl Multigrid {
    /// Build from the fine-grid kinetic operator `kin0` defined on `gd0`.
    pub fn new(
        gd0: &GridDescriptor,
        kin0: FdOperator,
        transfer_order: usize,
        opts: PipelineOptions,
    ) -> Result<Self, FdError> {
        opts.validate()?;
        if kin0.layout().n != gd0.n() {
            return Err(FdError::InvalidGrid(format!(
                "kinetic operator covers {:?} points, grid has {:?}",
                kin0.layout().n,
                gd0.n()
            )));
        }
        let channels = kin0.layout().channels;
        let gd1 = gd0.coarsen()?;
        let gd2 = gd1.coarsen()?;
        let kin1 = FdOperator::laplace(&gd1, -0.5, 1, channels)?;
        let kin2 = FdOperator::laplace(&gd2, -0.5, 1, channels)?;
        let step = DAMPING / kin0.diagonal();
        debug!(step, n0 = ?gd0.n(), n1 = ?gd1.n(), n2 = ?gd2.n(), "multigrid levels");
        Ok(Self {
            restrict0: Transformer::restrict(gd0, &gd1, transfer_order, channels)?,
            restrict1: Transformer::restrict(&gd1, &gd2, transfer_order, channels)?,
            interp2: Transformer::interpolate(&gd2, &gd1, transfer_order, channels)?,
            interp1: Transformer::interpolate(&gd1, gd0, transfer_order, channels)?,
            kin0,
            kin1,
            kin2,
            step,
            opts,
        })
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

/// `q = S d − r`.
fn defect<T: Scalar, C: Transport<T> + Sync>(
    op: &FdOperator,
    comm: &C,
    d: &[T],
    r: &[T],
    q: &mut [T],
    phases: &Phases<T>,
    opts: &PipelineOptions,
) -> Result<(), FdError> {
    op.apply(comm, d, q, phases, opts)?;
    for (qi, &ri) in q.iter_mut().zip(r) {
        *qi -= ri;
    }
    Ok(())
}

/// `y −= a · x`.
fn axpy_sub<T: Scalar>(y: &mut [T], a: f64, x: &[T]) {
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi -= xi * a;
    }
}

fn scaled<T: Scalar>(x: &[T], a: f64) -> Vec<T> {
    x.iter().map(|&v| v * a).collect()
}

impl<T: Scalar, C: Transport<T> + Sync> Preconditioner<T, C> for Multigrid {
    /// `d ≈ −kin0⁻¹ r`.
    fn apply(&self, comm: &C, r: &[T], d0: &mut [T], phases: &Phases<T>) -> Result<(), FdError> {
        let opts = &self.opts;
        let ilen0 = self.kin0.layout().interior_len();
        let nb = r.len() / ilen0;
        FdError::check_len("preconditioner residual", nb * ilen0, r.len())?;
        FdError::check_len("preconditioner output", r.len(), d0.len())?;
        let len1 = nb * self.kin1.layout().interior_len();
        let len2 = nb * self.kin2.layout().interior_len();
        let step = self.step;

        let mut r1 = zeroed(len1)?;
        let neg_r = scaled(r, -1.0);
        self.restrict0.apply(comm, &neg_r, &mut r1, phases, opts)?;
        let mut d1 = scaled(&r1, 4.0 * step);
        let mut q1 = zeroed(len1)?;
        defect(&self.kin1, comm, &d1, &r1, &mut q1, phases, opts)?;

        let mut r2 = zeroed(len2)?;
        self.restrict1.apply(comm, &q1, &mut r2, phases, opts)?;
        let mut d2 = scaled(&r2, 16.0 * step);
        let mut q2 = zeroed(len2)?;
        defect(&self.kin2, comm, &d2, &r2, &mut q2, phases, opts)?;
        axpy_sub(&mut d2, 16.0 * step, &q2);

        self.interp2.apply(comm, &d2, &mut q1, phases, opts)?;
        axpy_sub(&mut d1, 1.0, &q1);
        defect(&self.kin1, comm, &d1, &r1, &mut q1, phases, opts)?;
        axpy_sub(&mut d1, 4.0 * step, &q1);

        let neg_d1 = scaled(&d1, -1.0);
        self.interp1.apply(comm, &neg_d1, d0, phases, opts)?;
        let mut q0 = zeroed(r.len())?;
        defect(&self.kin0, comm, d0, r, &mut q0, phases, opts)?;
        axpy_sub(d0, step, &q0);
        for v in d0.iter_mut() {
            *v = -*v;
        }
        Ok(())
    }
}
