use thiserror::Error;

// Unified error type for stencilmg

#[derive(Error, Debug)]
pub enum FdError {
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("unsupported transfer order {0} (expected 2, 4, 6 or 8)")]
    UnsupportedOrder(usize),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("halo transport failure: {0}")]
    Transport(String),
    #[error("scratch allocation failed: {0}")]
    Allocation(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl FdError {
    /// Shorthand used by the eager shape checks in front of every kernel.
    pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), FdError> {
        if expected == got {
            Ok(())
        } else {
            Err(FdError::ShapeMismatch { what, expected, got })
        }
    }
}
