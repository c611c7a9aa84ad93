//! Padded storage layout.
//!
//! Every kernel reads from a buffer that embeds the interior block inside a halo.
//! All index arithmetic on such buffers lives here; kernels only ask for strides
//! and flattened offsets.

use crate::core::Scalar;
use crate::error::FdError;
use crate::utils::zeroed;

/// Shape of one padded grid: interior extent, per-side halo width, and the number
/// of scalars stored per point (innermost).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub n: [usize; 3],
    pub pad: [[usize; 2]; 3],
    pub channels: usize,
}

impl Layout {
    pub fn new(n: [usize; 3], pad: [[usize; 2]; 3], channels: usize) -> Self {
        Self { n, pad, channels }
    }

    /// Same halo width on both sides of every axis.
    pub fn symmetric(n: [usize; 3], halo: [usize; 3], channels: usize) -> Self {
        Self::new(n, halo.map(|h| [h, h]), channels)
    }

    /// Padded extent per axis.
    pub fn padded(&self) -> [usize; 3] {
        [0, 1, 2].map(|c| self.pad[c][0] + self.n[c] + self.pad[c][1])
    }

    /// Strides (in scalars) of the padded buffer.
    pub fn strides(&self) -> [usize; 3] {
        let p = self.padded();
        [p[1] * p[2] * self.channels, p[2] * self.channels, self.channels]
    }

    pub fn padded_len(&self) -> usize {
        self.padded().iter().product::<usize>() * self.channels
    }

    pub fn interior_len(&self) -> usize {
        self.n.iter().product::<usize>() * self.channels
    }

    /// Flat index of padded coordinate `(i0, i1, i2)` and channel `c`.
    #[inline]
    pub fn index(&self, i0: usize, i1: usize, i2: usize, c: usize) -> usize {
        let s = self.strides();
        debug_assert!(i0 < self.padded()[0] && i1 < self.padded()[1] && i2 < self.padded()[2]);
        debug_assert!(c < self.channels);
        i0 * s[0] + i1 * s[1] + i2 * s[2] + c
    }

    /// Flat index of the first interior point.
    pub fn origin(&self) -> usize {
        self.index(self.pad[0][0], self.pad[1][0], self.pad[2][0], 0)
    }

    /// Flattened displacement of a 3-D offset.
    pub fn flat_offset(&self, d: [isize; 3]) -> isize {
        let s = self.strides();
        d[0] * s[0] as isize + d[1] * s[1] as isize + d[2] * s[2] as isize
    }

    /// Copy an unpadded grid into the interior of `dst` and zero the halo.
    pub fn paste<T: Scalar>(&self, src: &[T], dst: &mut [T]) {
        dst.fill(T::zero());
        self.copy_interior(src, dst);
    }

    /// Overwrite the interior of `dst` with an unpadded grid, leaving the halo as is.
    pub fn copy_interior<T: Scalar>(&self, src: &[T], dst: &mut [T]) {
        debug_assert_eq!(src.len(), self.interior_len());
        debug_assert_eq!(dst.len(), self.padded_len());
        let row = self.n[2] * self.channels;
        for i0 in 0..self.n[0] {
            for i1 in 0..self.n[1] {
                let from = (i0 * self.n[1] + i1) * row;
                let to = self.index(i0 + self.pad[0][0], i1 + self.pad[1][0], self.pad[2][0], 0);
                dst[to..to + row].copy_from_slice(&src[from..from + row]);
            }
        }
    }

    /// Copy the interior of a padded grid into an unpadded one.
    pub fn extract<T: Scalar>(&self, src: &[T], dst: &mut [T]) {
        debug_assert_eq!(src.len(), self.padded_len());
        debug_assert_eq!(dst.len(), self.interior_len());
        let row = self.n[2] * self.channels;
        for i0 in 0..self.n[0] {
            for i1 in 0..self.n[1] {
                let from = self.index(i0 + self.pad[0][0], i1 + self.pad[1][0], self.pad[2][0], 0);
                let to = (i0 * self.n[1] + i1) * row;
                dst[to..to + row].copy_from_slice(&src[from..from + row]);
            }
        }
    }
}

/// A rectangular block of a padded grid, in padded coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub start: [usize; 3],
    pub size: [usize; 3],
}

impl Region {
    pub fn points(&self) -> usize {
        self.size.iter().product()
    }

    /// Copy the region of `grid` into `out` (row-major, channels innermost).
    pub fn pack<T: Scalar>(&self, layout: &Layout, grid: &[T], out: &mut Vec<T>) {
        let row = self.size[2] * layout.channels;
        for i0 in 0..self.size[0] {
            for i1 in 0..self.size[1] {
                let at = layout.index(self.start[0] + i0, self.start[1] + i1, self.start[2], 0);
                out.extend_from_slice(&grid[at..at + row]);
            }
        }
    }

    /// Write `data` (as produced by `pack`) into the region of `grid`, scaled by `phase`.
    pub fn unpack<T: Scalar>(&self, layout: &Layout, data: &[T], grid: &mut [T], phase: T) {
        let row = self.size[2] * layout.channels;
        let unit = phase == T::one();
        for i0 in 0..self.size[0] {
            for i1 in 0..self.size[1] {
                let at = layout.index(self.start[0] + i0, self.start[1] + i1, self.start[2], 0);
                let from = (i0 * self.size[1] + i1) * row;
                let dst = &mut grid[at..at + row];
                if unit {
                    dst.copy_from_slice(&data[from..from + row]);
                } else {
                    for (d, &s) in dst.iter_mut().zip(&data[from..from + row]) {
                        *d = s * phase;
                    }
                }
            }
        }
    }
}

/// A single padded grid with centralised, debug-checked indexing.
#[derive(Debug, Clone)]
pub struct PaddedGrid<T> {
    layout: Layout,
    data: Vec<T>,
}

impl<T: Scalar> PaddedGrid<T> {
    /// Zero-filled grid.
    pub fn zeros(layout: Layout) -> Result<Self, FdError> {
        Ok(Self { data: zeroed(layout.padded_len())?, layout })
    }

    /// Grid holding `interior` with a zero halo.
    pub fn from_interior(layout: Layout, interior: &[T]) -> Result<Self, FdError> {
        FdError::check_len("interior grid", layout.interior_len(), interior.len())?;
        let mut grid = Self::zeros(layout)?;
        layout.paste(interior, &mut grid.data);
        Ok(grid)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Value at interior-relative coordinates; negative or past-the-end indices
    /// address the halo.
    #[inline]
    pub fn at(&self, i0: isize, i1: isize, i2: isize, c: usize) -> T {
        self.data[self.flat(i0, i1, i2, c)]
    }

    #[inline]
    pub fn at_mut(&mut self, i0: isize, i1: isize, i2: isize, c: usize) -> &mut T {
        let k = self.flat(i0, i1, i2, c);
        &mut self.data[k]
    }

    #[inline]
    fn flat(&self, i0: isize, i1: isize, i2: isize, c: usize) -> usize {
        let p = &self.layout.pad;
        let q = [i0 + p[0][0] as isize, i1 + p[1][0] as isize, i2 + p[2][0] as isize];
        debug_assert!(q.iter().all(|&x| x >= 0), "index {q:?} before the halo");
        self.layout.index(q[0] as usize, q[1] as usize, q[2] as usize, c)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Unpadded copy of the interior.
    pub fn interior(&self) -> Result<Vec<T>, FdError> {
        let mut out = zeroed(self.layout.interior_len())?;
        self.layout.extract(&self.data, &mut out);
        Ok(out)
    }
}
