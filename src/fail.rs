//! General error handling.

use alloc::collections::TryReserveError;

use core::{fmt, result};

/// A planning error.
///
/// Every failure in this crate is terminal for the call that raised it: no partially built map or
/// move sequence is ever handed back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Storage for a region or descriptor entry could not be obtained.
    ///
    /// This is for the case where the system is unable to hand us memory for bookkeeping, not
    /// for the case where the _physical_ memory being planned is too scarce (see
    /// `InsufficientMemory`).
    OutOfMemory,
    /// The relocation cannot be planned.
    ///
    /// No free (or last resort) memory can accommodate a required range, even after searching
    /// for an evictable occupant.
    InsufficientMemory,
    /// The move sequence does not fit in the descriptor table.
    TooManyDescriptors,
}

/// The result type used throughout the crate.
pub type Result<T> = result::Result<T, Error>;

impl From<TryReserveError> for Error {
    #[cold]
    fn from(_: TryReserveError) -> Error {
        Error::OutOfMemory
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::OutOfMemory => f.write_str("out of memory for bookkeeping"),
            Error::InsufficientMemory => f.write_str("insufficient memory to plan the relocation"),
            Error::TooManyDescriptors => f.write_str("too many shuffle descriptors"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use alloc::vec::Vec;

    #[test]
    fn test_try_reserve_maps_to_oom() {
        let mut vec: Vec<u64> = Vec::new();
        let err = vec.try_reserve(usize::max_value()).unwrap_err();

        assert_eq!(Error::from(err), Error::OutOfMemory);
    }
}
