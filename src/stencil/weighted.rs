//! Weighted stencil set: Σ_s w_s(p) · (S_s a)(p).

use super::{FlatStencil, Stencil, for_each_point};
use crate::core::Scalar;
use crate::error::FdError;
use crate::grid::Layout;

/// Stencils sharing one padded layout, each paired with a real weight per interior
/// point. Weights are shared by all channels of a point.
#[derive(Debug, Clone)]
pub struct WeightedStencilSet {
    layout: Layout,
    terms: Vec<(FlatStencil, Vec<f64>)>,
}

impl WeightedStencilSet {
    pub fn new(layout: Layout, terms: Vec<(Stencil, Vec<f64>)>) -> Result<Self, FdError> {
        if terms.is_empty() {
            return Err(FdError::InvalidOptions("weighted stencil set is empty".into()));
        }
        let npoints: usize = layout.n.iter().product();
        let terms = terms
            .into_iter()
            .map(|(s, w)| {
                FdError::check_len("stencil weights", npoints, w.len())?;
                Ok((s.bind(&layout)?, w))
            })
            .collect::<Result<Vec<_>, FdError>>()?;
        Ok(Self { layout, terms })
    }

    /// Union of the halo widths of all member stencils.
    pub fn range(stencils: &[Stencil]) -> [usize; 3] {
        stencils.iter().fold([0; 3], |acc, s| {
            let r = s.range();
            [0, 1, 2].map(|a| acc[a].max(r[a]))
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `out = Σ_s w_s · S_s a` for one padded grid `a`.
    pub fn apply<T: Scalar>(&self, a: &[T], out: &mut [T]) -> Result<(), FdError> {
        FdError::check_len("weighted stencil input", self.layout.padded_len(), a.len())?;
        FdError::check_len("weighted stencil output", self.layout.interior_len(), out.len())?;
        let ch = self.layout.channels;
        let plane = self.layout.n[1] * self.layout.n[2] * ch;
        if plane == 0 {
            return Ok(());
        }
        let kernel = |i0: usize, chunk: &mut [T]| {
            for_each_point(&self.layout, i0, |k, p| {
                let point = (i0 * plane + k) / ch;
                let mut x = T::zero();
                for (s, w) in &self.terms {
                    x += s.sum_from(a, p, 0) * w[point];
                }
                chunk[k] = x;
            });
        };
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            out.par_chunks_mut(plane).enumerate().for_each(|(i0, chunk)| kernel(i0, chunk));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (i0, chunk) in out.chunks_mut(plane).enumerate() {
                kernel(i0, chunk);
            }
        }
        Ok(())
    }
}
