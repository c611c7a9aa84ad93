//! Finite-difference stencils and the kernels that apply them to padded grids.
//!
//! A [`Stencil`] is a list of (3-D offset, real coefficient) pairs with the centre
//! first. Binding it to a [`Layout`] flattens the offsets once; the resulting
//! [`FlatStencil`] is what every kernel iterates over.

pub mod relax;
pub mod weighted;

pub use relax::{gauss_seidel, jacobi};
pub use weighted::WeightedStencilSet;

use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::Layout;

/// Central second-derivative coefficients, indexed by `nn` (neighbours per side):
/// entry 0 is the centre, entry d the weight of the points at distance d.
const LAPLACE: [&[f64]; 3] = [
    &[-2.0, 1.0],
    &[-5.0 / 2.0, 4.0 / 3.0, -1.0 / 12.0],
    &[-49.0 / 18.0, 3.0 / 2.0, -3.0 / 20.0, 1.0 / 90.0],
];

#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    points: Vec<([isize; 3], f64)>,
}

impl Stencil {
    /// Stencil from (offset, coefficient) pairs. The first pair must be the centre.
    pub fn new(points: Vec<([isize; 3], f64)>) -> Result<Self, FdError> {
        match points.first() {
            Some(([0, 0, 0], c)) if *c != 0.0 => Ok(Self { points }),
            Some(([0, 0, 0], _)) => Err(FdError::InvalidOptions("stencil centre coefficient is zero".into())),
            _ => Err(FdError::InvalidOptions("stencil must start with its centre point".into())),
        }
    }

    /// `scale · ∇²` with central differences of order `2·nn` on a grid of the given spacing.
    pub fn laplace(scale: f64, spacing: [f64; 3], nn: usize) -> Result<Self, FdError> {
        let table = match nn {
            1..=3 => LAPLACE[nn - 1],
            _ => {
                return Err(FdError::InvalidOptions(format!(
                    "Laplacian order nn={nn} not tabulated (1, 2 or 3)"
                )));
            }
        };
        let inv_h2 = spacing.map(|h| scale / (h * h));
        let centre = table[0] * inv_h2.iter().sum::<f64>();
        let mut points = vec![([0, 0, 0], centre)];
        for (axis, &f) in inv_h2.iter().enumerate() {
            for (d, &w) in table.iter().enumerate().skip(1) {
                for sign in [-1, 1] {
                    let mut off = [0isize; 3];
                    off[axis] = sign * d as isize;
                    points.push((off, w * f));
                }
            }
        }
        Self::new(points)
    }

    /// Kinetic-energy operator −½∇².
    pub fn kinetic(spacing: [f64; 3], nn: usize) -> Result<Self, FdError> {
        Self::laplace(-0.5, spacing, nn)
    }

    pub fn points(&self) -> &[([isize; 3], f64)] {
        &self.points
    }

    /// Centre (diagonal) coefficient.
    pub fn center(&self) -> f64 {
        self.points[0].1
    }

    /// Halo width needed per axis.
    pub fn range(&self) -> [usize; 3] {
        let mut r = [0usize; 3];
        for (off, _) in &self.points {
            for a in 0..3 {
                r[a] = r[a].max(off[a].unsigned_abs());
            }
        }
        r
    }

    pub fn coefficient_sum(&self) -> f64 {
        self.points.iter().map(|(_, c)| c).sum()
    }

    /// Flatten the offsets for grids stored with `layout`.
    pub fn bind(&self, layout: &Layout) -> Result<FlatStencil, FdError> {
        let range = self.range();
        for a in 0..3 {
            if layout.pad[a][0] < range[a] || layout.pad[a][1] < range[a] {
                return Err(FdError::InvalidGrid(format!(
                    "halo {:?} on axis {a} narrower than stencil range {}",
                    layout.pad[a], range[a]
                )));
            }
        }
        Ok(FlatStencil {
            layout: *layout,
            offsets: self.points.iter().map(|(o, _)| layout.flat_offset(*o)).collect(),
            coefs: self.points.iter().map(|(_, c)| *c).collect(),
        })
    }
}

/// A stencil bound to a padded layout.
#[derive(Debug, Clone)]
pub struct FlatStencil {
    layout: Layout,
    offsets: Vec<isize>,
    coefs: Vec<f64>,
}

impl FlatStencil {
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn center(&self) -> f64 {
        self.coefs[0]
    }

    /// Σ coef·a[p + off] at flat padded index `p`, starting from point `first`.
    #[inline]
    pub(crate) fn sum_from<T: Scalar>(&self, a: &[T], p: usize, first: usize) -> T {
        let mut x = T::zero();
        for (&o, &c) in self.offsets[first..].iter().zip(&self.coefs[first..]) {
            x += a[(p as isize + o) as usize] * c;
        }
        x
    }

    /// `out = S a` for one grid: `a` padded (halo already filled), `out` interior-sized.
    pub fn apply<T: Scalar>(&self, a: &[T], out: &mut [T]) -> Result<(), FdError> {
        FdError::check_len("stencil input", self.layout.padded_len(), a.len())?;
        FdError::check_len("stencil output", self.layout.interior_len(), out.len())?;
        let plane = self.layout.n[1] * self.layout.n[2] * self.layout.channels;
        if plane == 0 {
            return Ok(());
        }
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            out.par_chunks_mut(plane)
                .enumerate()
                .for_each(|(i0, chunk)| self.apply_plane(a, i0, chunk));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (i0, chunk) in out.chunks_mut(plane).enumerate() {
                self.apply_plane(a, i0, chunk);
            }
        }
        Ok(())
    }

    fn apply_plane<T: Scalar>(&self, a: &[T], i0: usize, out: &mut [T]) {
        for_each_point(&self.layout, i0, |k, p| out[k] = self.sum_from(a, p, 0));
    }
}

/// Visit every interior point of plane `i0` in storage order, passing the index
/// within the unpadded plane and the flat padded index.
#[inline]
pub(crate) fn for_each_point(layout: &Layout, i0: usize, mut f: impl FnMut(usize, usize)) {
    let row = layout.n[2] * layout.channels;
    let mut k = 0;
    for i1 in 0..layout.n[1] {
        let base = layout.index(i0 + layout.pad[0][0], i1 + layout.pad[1][0], layout.pad[2][0], 0);
        for j in 0..row {
            f(k, base + j);
            k += 1;
        }
    }
}
