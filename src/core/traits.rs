//! Core numeric traits for stencilmg.

use num_complex::Complex64;
use num_traits::{One, Zero};
use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Element type of a grid: `f64` or `Complex64`.
///
/// Stencil and transfer coefficients are always real, so every kernel only needs
/// `Scalar * f64` on top of the ring operations.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Mul<f64, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + Sum
{
    /// Embed a real number.
    fn from_real(x: f64) -> Self;
    /// Complex conjugate (identity for reals).
    fn conj(self) -> Self;
    /// Real part.
    fn re(self) -> f64;
    /// |x|².
    fn abs_sqr(self) -> f64;
}

impl Scalar for f64 {
    #[inline]
    fn from_real(x: f64) -> Self {
        x
    }
    #[inline]
    fn conj(self) -> Self {
        self
    }
    #[inline]
    fn re(self) -> f64 {
        self
    }
    #[inline]
    fn abs_sqr(self) -> f64 {
        self * self
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn from_real(x: f64) -> Self {
        Complex64::new(x, 0.0)
    }
    #[inline]
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }
    #[inline]
    fn re(self) -> f64 {
        self.re
    }
    #[inline]
    fn abs_sqr(self) -> f64 {
        self.norm_sqr()
    }
}

/// Local part of ⟨x, y⟩ = Σ conj(x)·y. Callers reduce across partitions.
pub fn local_dot<T: Scalar>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| xi.conj() * *yi)
            .reduce(T::zero, |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().zip(y).map(|(xi, yi)| xi.conj() * *yi).sum()
    }
}

/// Local part of ‖x‖².
pub fn local_norm_sqr<T: Scalar>(x: &[T]) -> f64 {
    x.iter().map(|v| v.abs_sqr()).sum()
}
