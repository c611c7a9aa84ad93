//! One-dimensional restriction and interpolation passes.
//!
//! A pass reads `rows` contiguous padded rows (each `len` points of `ch` scalars)
//! and writes its results transposed: output point `j` of row `r` lands at
//! `(j * rows + r) * ch`. Three passes along the last axis therefore visit axes
//! 2, 1, 0 and leave the result in the original axis order.

use bitflags::bitflags;

use crate::core::Scalar;
use crate::error::FdError;

bitflags! {
    /// Interpolation outputs to drop at the edges of a processed row.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct Skip: u8 {
        /// The first output (an even fine point left of the local range).
        const LOW  = 0b01;
        /// The last output (an odd fine point right of the local range).
        const HIGH = 0b10;
    }
}

/// Half-weights of the symmetric interpolation kernel of order `k`.
pub fn weights(k: usize) -> Result<&'static [f64], FdError> {
    match k {
        2 => Ok(&[0.5]),
        4 => Ok(&[0.5625, -0.0625]),
        6 => Ok(&[0.5859375, -0.09765625, 0.01171875]),
        8 => Ok(&[0.59814453125, -0.11962890625, 0.02392578125, -0.00244140625]),
        _ => Err(FdError::UnsupportedOrder(k)),
    }
}

/// Geometry of one pass.
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    pub rows: usize,
    /// Padded input points per row.
    pub len: usize,
    /// Output points per row.
    pub out: usize,
    pub ch: usize,
}

/// `b[j] = ½ (a[c] + Σ_l w_l (a[c + 2l − 1] + a[c − 2l + 1]))` with `c = k − 1 + 2j`.
pub fn restrict<T: Scalar>(w: &[f64], pass: Pass, a: &[T], b: &mut [T]) {
    let k = 2 * w.len();
    let Pass { rows, len, out, ch } = pass;
    debug_assert!(a.len() >= rows * len * ch && b.len() >= rows * out * ch);
    debug_assert!(k - 1 + 2 * out.saturating_sub(1) + k - 1 < len || out == 0);
    for r in 0..rows {
        let row = &a[r * len * ch..(r + 1) * len * ch];
        for j in 0..out {
            let c = k - 1 + 2 * j;
            for q in 0..ch {
                let mut x = row[c * ch + q];
                for (l, &wl) in w.iter().enumerate() {
                    let d = 2 * l + 1;
                    x += (row[(c + d) * ch + q] + row[(c - d) * ch + q]) * wl;
                }
                b[(j * rows + r) * ch + q] = x * 0.5;
            }
        }
    }
}

/// Interpolate `out` fine points per row. Coarse point `t` of the processed range
/// sits at padded index `h − 1 + t`; it yields the fine point on top of it and the
/// midpoint to its right, less the edges dropped by `skip`.
pub fn interpolate<T: Scalar>(w: &[f64], skip: Skip, pass: Pass, a: &[T], b: &mut [T]) {
    let h = w.len();
    let Pass { rows, len, out, ch } = pass;
    debug_assert!(a.len() >= rows * len * ch && b.len() >= rows * out * ch);
    let drop_lo = usize::from(skip.contains(Skip::LOW));
    let nproc = (out + drop_lo + usize::from(skip.contains(Skip::HIGH))) / 2;
    for r in 0..rows {
        let row = &a[r * len * ch..(r + 1) * len * ch];
        let mut j = 0;
        for t in 0..nproc {
            let c = h - 1 + t;
            if !(t == 0 && drop_lo == 1) {
                for q in 0..ch {
                    b[(j * rows + r) * ch + q] = row[c * ch + q];
                }
                j += 1;
            }
            if j < out {
                for q in 0..ch {
                    let mut x = T::zero();
                    for (l, &wl) in w.iter().enumerate() {
                        x += (row[(c - l) * ch + q] + row[(c + l + 1) * ch + q]) * wl;
                    }
                    b[(j * rows + r) * ch + q] = x;
                }
                j += 1;
            }
        }
        debug_assert_eq!(j, out);
    }
}
