mod base;
mod builder;

pub use base::*;
pub use builder::*;

use alloc::vec::Vec;

/// Maps every element of a fixed size array, stopping at the first error.
pub fn try_map_array<T, U, E, const N: usize>(
    items: &[T; N],
    func: impl FnMut(&T) -> Result<U, E>,
) -> Result<[U; N], E> {
    let mapped = items.iter().map(func).collect::<Result<Vec<U>, E>>()?;

    match mapped.try_into() {
        Ok(array) => Ok(array),
        Err(_) => unreachable!("Mapping preserves the array length"),
    }
}
