//! Phase factors applied to halo data that crosses the periodic cell boundary.

use crate::core::Scalar;
use crate::grid::{HIGH, LOW};
use num_complex::Complex64;
use std::f64::consts::PI;

/// One factor per axis and side. Only sides that wrap the global periodic boundary
/// use their factor; all other sides copy unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phases<T> {
    pub factor: [[T; 2]; 3],
}

impl<T: Scalar> Phases<T> {
    /// No phase: plain periodic copy.
    pub fn identity() -> Self {
        Self { factor: [[T::one(); 2]; 3] }
    }

    #[inline]
    pub fn get(&self, axis: usize, side: usize) -> T {
        self.factor[axis][side]
    }
}

impl<T: Scalar> Default for Phases<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl Phases<Complex64> {
    /// Bloch phases for a wave vector `k` in units of the reciprocal cell:
    /// ψ(r + L_a) = e^{2πi k_a} ψ(r).
    pub fn bloch(k: [f64; 3]) -> Self {
        let mut factor = [[Complex64::new(1.0, 0.0); 2]; 3];
        for (axis, f) in factor.iter_mut().enumerate() {
            let theta = 2.0 * PI * k[axis];
            f[LOW] = Complex64::from_polar(1.0, -theta);
            f[HIGH] = Complex64::from_polar(1.0, theta);
        }
        Self { factor }
    }
}
