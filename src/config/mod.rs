pub mod options;
pub use options::{HaloRefresh, PipelineOptions, PoissonOptions, RelaxMethod, RelaxOptions};
