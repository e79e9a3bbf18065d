//! Fallible vector primitives.

use alloc::vec::Vec;

use fail::Result;

/// Growth operations which report allocation failure instead of aborting.
///
/// Every structure in the crate grows through this trait, so that exhaustion of the bookkeeping
/// storage surfaces as `Error::OutOfMemory` rather than taking the boot loader down.
pub trait TryPush<T> {
    /// Push an element to the end of this vector.
    ///
    /// On failure (the buffer could not be grown), the vector is left untouched.
    fn try_push(&mut self, elem: T) -> Result<()>;
}

impl<T> TryPush<T> for Vec<T> {
    #[inline]
    fn try_push(&mut self, elem: T) -> Result<()> {
        self.try_reserve(1)?;
        self.push(elem);

        Ok(())
    }
}
