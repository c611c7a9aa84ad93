//! Core numeric traits shared by every kernel.

pub mod traits;
pub use traits::{Scalar, local_dot, local_norm_sqr};
