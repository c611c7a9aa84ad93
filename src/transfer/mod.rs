//! Restriction (fine → coarse) and interpolation (coarse → fine) between grids whose
//! global extents differ by a factor of two.

pub mod kernel;
pub mod transformer;

pub use kernel::{Skip, weights};
pub use transformer::{Direction, Transformer};
