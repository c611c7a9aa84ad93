//! Three-pass separable transfer between a grid and its coarsened counterpart.

use tracing::debug;

use super::kernel::{self, Pass, Skip};
use crate::config::PipelineOptions;
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::{GridDescriptor, HIGH, LOW, Layout};
use crate::halo::{Boundary, Phases};
use crate::parallel::Transport;
use crate::pipeline::{ChunkKernel, DoubleBufferedPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Fine → coarse.
    Restrict,
    /// Coarse → fine.
    Interpolate,
}

/// Restriction or interpolation operator between two descriptors of the same
/// process grid, the coarse one being `fine.coarsen()`.
#[derive(Debug, Clone)]
pub struct Transformer {
    direction: Direction,
    order: usize,
    w: &'static [f64],
    boundary: Boundary,
    n_out: [usize; 3],
    skip: [Skip; 3],
}

fn check_pair(fine: &GridDescriptor, coarse: &GridDescriptor) -> Result<(), FdError> {
    if fine.parsize() != coarse.parsize() || fine.rank() != coarse.rank() || fine.periodic() != coarse.periodic() {
        return Err(FdError::InvalidGrid(
            "transfer grids must share process grid, rank and periodicity".into(),
        ));
    }
    for a in 0..3 {
        let (fbeg, fend) = (fine.beg(a), fine.end(a));
        let (cbeg, cend) = (coarse.beg(a), coarse.end(a));
        let aligned = fbeg == 2 * cbeg || (!fine.periodic()[a] && fbeg == 1 && cbeg == 1);
        if fine.global()[a] != 2 * coarse.global()[a] || fend != 2 * cend || !aligned {
            return Err(FdError::InvalidGrid(format!(
                "axis {a}: fine range [{fbeg}, {fend}) is not the refinement of coarse [{cbeg}, {cend})"
            )));
        }
    }
    Ok(())
}

fn non_negative(x: isize, what: &str) -> Result<usize, FdError> {
    usize::try_from(x).map_err(|_| FdError::InvalidGrid(format!("negative transfer {what} {x}")))
}

impl Transformer {
    pub fn restrict(
        fine: &GridDescriptor,
        coarse: &GridDescriptor,
        order: usize,
        channels: usize,
    ) -> Result<Self, FdError> {
        let w = kernel::weights(order)?;
        check_pair(fine, coarse)?;
        let k = order as isize;
        let mut pad = [[0; 2]; 3];
        let mut npad = [[0; 2]; 3];
        for a in 0..3 {
            let (fbeg, fend) = (fine.beg(a) as isize, fine.end(a) as isize);
            let (cbeg, cend) = (coarse.beg(a) as isize, coarse.end(a) as isize);
            pad[a][LOW] = non_negative(k - 1 - 2 * cbeg + fbeg, "pad")?;
            pad[a][HIGH] = non_negative(k - 2 + 2 * cend - fend, "pad")?;
            npad[a][LOW] = non_negative(k - 2 + 2 * cbeg - fbeg, "neighbour pad")?;
            npad[a][HIGH] = non_negative(k - 1 - 2 * cend + fend, "neighbour pad")?;
        }
        let boundary = Boundary::new(fine, pad, npad, channels)?;
        debug!(order, ?pad, n_in = ?fine.n(), n_out = ?coarse.n(), "restriction");
        Ok(Self {
            direction: Direction::Restrict,
            order,
            w,
            boundary,
            n_out: coarse.n(),
            skip: [Skip::empty(); 3],
        })
    }

    pub fn interpolate(
        coarse: &GridDescriptor,
        fine: &GridDescriptor,
        order: usize,
        channels: usize,
    ) -> Result<Self, FdError> {
        let w = kernel::weights(order)?;
        check_pair(fine, coarse)?;
        let h = (order / 2) as isize;
        let mut pad = [[0; 2]; 3];
        let mut npad = [[0; 2]; 3];
        let mut skip = [Skip::empty(); 3];
        for a in 0..3 {
            let (fbeg, fend) = (fine.beg(a) as isize, fine.end(a) as isize);
            let (cbeg, cend) = (coarse.beg(a) as isize, coarse.end(a) as isize);
            let (flo, fhi) = (fbeg.div_euclid(2), (fend + 1).div_euclid(2));
            pad[a][LOW] = non_negative(h - 1 - flo + cbeg, "pad")?;
            pad[a][HIGH] = non_negative(h + fhi - cend, "pad")?;
            npad[a][LOW] = non_negative(h + (fbeg + 1).div_euclid(2) - cbeg, "neighbour pad")?;
            npad[a][HIGH] = non_negative(h - 1 - fend.div_euclid(2) + cend, "neighbour pad")?;
            skip[a].set(Skip::LOW, fbeg % 2 == 1);
            skip[a].set(Skip::HIGH, fend % 2 == 1);
        }
        let boundary = Boundary::new(coarse, pad, npad, channels)?;
        debug!(order, ?pad, n_in = ?coarse.n(), n_out = ?fine.n(), "interpolation");
        Ok(Self {
            direction: Direction::Interpolate,
            order,
            w,
            boundary,
            n_out: fine.n(),
            skip,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Padded layout of one input grid.
    pub fn input_layout(&self) -> &Layout {
        self.boundary.layout()
    }

    pub fn output_shape(&self) -> [usize; 3] {
        self.n_out
    }

    /// Scalars written per transferred grid.
    pub fn output_len(&self) -> usize {
        self.n_out.iter().product::<usize>() * self.boundary.layout().channels
    }

    fn passes(&self) -> [Pass; 3] {
        let p = self.boundary.layout().padded();
        let n = self.n_out;
        let ch = self.boundary.layout().channels;
        [
            Pass { rows: p[0] * p[1], len: p[2], out: n[2], ch },
            Pass { rows: n[2] * p[0], len: p[1], out: n[1], ch },
            Pass { rows: n[1] * n[2], len: p[0], out: n[0], ch },
        ]
    }

    fn run_pass<T: Scalar>(&self, axis: usize, pass: Pass, a: &[T], b: &mut [T]) {
        match self.direction {
            Direction::Restrict => kernel::restrict(self.w, pass, a, b),
            Direction::Interpolate => kernel::interpolate(self.w, self.skip[axis], pass, a, b),
        }
    }

    /// Transfer one padded grid (halo filled) into `out`.
    pub fn transfer<T: Scalar>(&self, input: &[T], out: &mut [T], scratch: &mut [T]) -> Result<(), FdError> {
        let layout = self.boundary.layout();
        FdError::check_len("transfer input", layout.padded_len(), input.len())?;
        FdError::check_len("transfer output", self.output_len(), out.len())?;
        let [p2, p1, p0] = self.passes();
        let len1 = p2.rows * p2.out * p2.ch;
        let len2 = p1.rows * p1.out * p1.ch;
        if scratch.len() < len1 + len2 {
            return Err(FdError::ShapeMismatch {
                what: "transfer scratch",
                expected: len1 + len2,
                got: scratch.len(),
            });
        }
        let (s1, rest) = scratch.split_at_mut(len1);
        let s2 = &mut rest[..len2];
        self.run_pass(2, p2, input, s1);
        self.run_pass(1, p1, s1, s2);
        self.run_pass(0, p0, s2, out);
        Ok(())
    }

    /// Transfer a batch of unpadded grids.
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

impl<T: Scalar> ChunkKernel<T> for Transformer {
    fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn output_len(&self) -> usize {
        Transformer::output_len(self)
    }

    fn scratch_len(&self) -> usize {
        let [p2, p1, _] = self.passes();
        (p2.rows * p2.out + p1.rows * p1.out) * p2.ch
    }

    fn compute(&self, input: &[T], output: &mut [T], scratch: &mut [T]) -> Result<(), FdError> {
        self.transfer(input, output, scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::LocalTransport;
    use approx::assert_abs_diff_eq;

    #[test]
    fn restriction_keeps_constants_on_periodic_grid() {
        let fine = GridDescriptor::new([8, 8, 8], [true; 3], [0.25; 3]).unwrap();
        let coarse = fine.coarsen().unwrap();
        for order in [2, 4, 6] {
            let r = Transformer::restrict(&fine, &coarse, order, 1).unwrap();
            let comm = LocalTransport::solo();
            let input = vec![3.0; 512];
            let mut out = vec![0.0; 64];
            r.apply(&comm, &input, &mut out, &Phases::identity(), &PipelineOptions::serial())
                .unwrap();
            for v in out {
                assert_abs_diff_eq!(v, 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn interpolation_is_exact_for_linear_fields_inside() {
        // Zero boundaries: the linear profile along axis 2 is exact away from the edges.
        let fine = GridDescriptor::new([4, 4, 16], [true, true, false], [1.0; 3]).unwrap();
        let coarse = fine.coarsen().unwrap();
        let i = Transformer::interpolate(&coarse, &fine, 2, 1).unwrap();
        let cn = coarse.n();
        let fnn = fine.n();
        assert_eq!(fnn, [4, 4, 15]);
        let input: Vec<f64> = (0..cn.iter().product::<usize>())
            .map(|p| (coarse.beg(2) + p % cn[2]) as f64)
            .collect();
        let mut out = vec![0.0; fnn.iter().product()];
        let comm = LocalTransport::solo();
        i.apply(&comm, &input, &mut out, &Phases::identity(), &PipelineOptions::serial())
            .unwrap();
        for (p, v) in out.iter().enumerate() {
            let g = (fine.beg(2) + p % fnn[2]) as f64;
            if g < 14.0 {
                assert_abs_diff_eq!(*v, g / 2.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn single_grid_transfer_checks_output_length() {
        let fine = GridDescriptor::new([8, 8, 8], [true; 3], [1.0; 3]).unwrap();
        let coarse = fine.coarsen().unwrap();
        let r = Transformer::restrict(&fine, &coarse, 2, 2).unwrap();
        assert_eq!(r.output_len(), 2 * 64);
        let input = vec![1.0; r.input_layout().padded_len()];
        let mut scratch = vec![0.0; <Transformer as ChunkKernel<f64>>::scratch_len(&r)];
        let mut short = vec![0.0; r.output_len() - 1];
        assert!(matches!(
            r.transfer(&input, &mut short, &mut scratch),
            Err(FdError::ShapeMismatch { .. })
        ));
        let mut out = vec![0.0; r.output_len()];
        r.transfer(&input, &mut out, &mut scratch).unwrap();
        for v in out {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn mismatched_grids_rejected() {
        let fine = GridDescriptor::new([8, 8, 8], [true; 3], [1.0; 3]).unwrap();
        let other = GridDescriptor::new([4, 4, 2], [true; 3], [2.0; 3]).unwrap();
        assert!(matches!(
            Transformer::restrict(&fine, &other, 2, 1),
            Err(FdError::InvalidGrid(_))
        ));
        let coarse = fine.coarsen().unwrap();
        assert!(matches!(
            Transformer::restrict(&fine, &coarse, 5, 1),
            Err(FdError::UnsupportedOrder(5))
        ));
    }
}
