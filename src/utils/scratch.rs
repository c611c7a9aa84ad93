//! Fallible scratch allocation.

use crate::error::FdError;
use num_traits::Zero;

/// Allocate `len` zeroed elements, reporting exhaustion instead of aborting.
pub fn zeroed<T: Zero + Clone>(len: usize) -> Result<Vec<T>, FdError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|e| {
        FdError::Allocation(format!(
            "{len} elements of {} bytes: {e}",
            std::mem::size_of::<T>()
        ))
    })?;
    v.resize(len, T::zero());
    Ok(v)
}
