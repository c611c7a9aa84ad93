//! Halo (ghost region) exchange between neighbouring partitions.

pub mod boundary;
pub mod phases;

pub use boundary::{AxisExchange, Boundary};
pub use phases::Phases;
