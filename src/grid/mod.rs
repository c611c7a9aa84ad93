//! Grid geometry: global decomposition and padded local storage.

pub mod descriptor;
pub mod layout;

pub use descriptor::{GridDescriptor, HIGH, LOW};
pub use layout::{Layout, PaddedGrid, Region};
