//! Single-sweep relaxation kernels for `S x = src`.
//!
//! Both kernels work on one grid: `a` is the padded copy of the field `x` whose halo
//! is already filled. Sweeping and halo refresh are driven by the caller.

use super::{FlatStencil, for_each_point};
use crate::core::Scalar;
use crate::error::FdError;

fn check<T>(s: &FlatStencil, a: &[T], src: &[T], x: &[T]) -> Result<(), FdError> {
    let layout = s.layout();
    FdError::check_len("relax padded field", layout.padded_len(), a.len())?;
    FdError::check_len("relax source", layout.interior_len(), src.len())?;
    FdError::check_len("relax field", layout.interior_len(), x.len())
}

/// One lexicographic Gauss-Seidel sweep. Each updated value is written to both the
/// padded buffer (so later points see it) and the field.
pub fn gauss_seidel<T: Scalar>(s: &FlatStencil, a: &mut [T], src: &[T], x: &mut [T]) -> Result<(), FdError> {
    check(s, a, src, x)?;
    let inv = 1.0 / s.center();
    let layout = *s.layout();
    let plane = layout.n[1] * layout.n[2] * layout.channels;
    for i0 in 0..layout.n[0] {
        for_each_point(&layout, i0, |k, p| {
            let q = i0 * plane + k;
            let v = (src[q] - s.sum_from(a, p, 1)) * inv;
            a[p] = v;
            x[q] = v;
        });
    }
    Ok(())
}

/// One weighted-Jacobi sweep: `x = (1 − ω)·x + ω·(src − Σ_{c≥1} coef_c·a[p+off_c]) / coef_0`.
/// `a` is only read, so planes are updated in parallel.
pub fn jacobi<T: Scalar>(s: &FlatStencil, a: &[T], src: &[T], x: &mut [T], omega: f64) -> Result<(), FdError> {
    check(s, a, src, x)?;
    let inv = 1.0 / s.center();
    let layout = *s.layout();
    let plane = layout.n[1] * layout.n[2] * layout.channels;
    if plane == 0 {
        return Ok(());
    }
    let sweep = |i0: usize, xs: &mut [T]| {
        let src = &src[i0 * plane..(i0 + 1) * plane];
        for_each_point(&layout, i0, |k, p| {
            xs[k] = xs[k] * (1.0 - omega) + (src[k] - s.sum_from(a, p, 1)) * (omega * inv);
        });
    };
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_chunks_mut(plane).enumerate().for_each(|(i0, xs)| sweep(i0, xs));
    }
    #[cfg(not(feature = "rayon"))]
    {
        for (i0, xs) in x.chunks_mut(plane).enumerate() {
            sweep(i0, xs);
        }
    }
    Ok(())
}
