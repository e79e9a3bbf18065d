//! Address blocks.
//!
//! Blocks are the main unit of the planner's arithmetic. A block is a simple construct with a
//! start address and a size, living in the 32-bit physical address space. Empty blocks are
//! represented by a zero size.
//!
//! The address space ends at exactly `2^32`, which a `u32` cannot hold. Every computation in here
//! is therefore done in terms of the _last_ byte of a block (`start + size - 1`), or in a widened
//! integer, never in terms of the exclusive end.

use core::{cmp, fmt};

/// A physical address.
pub type Addr = u32;

/// Align `addr` upwards to `align`.
///
/// `align` must be zero, one, or a power of two; zero and one both mean byte alignment. Returns
/// `None` if the aligned address would roll over the top of the address space.
#[inline]
pub fn align_up(addr: Addr, align: u32) -> Option<Addr> {
    if align <= 1 {
        return Some(addr);
    }

    debug_assert!(align.is_power_of_two(), "Alignment {} is not a power of two.", align);

    addr.checked_add(align - 1).map(|x| x & !(align - 1))
}

/// Align `addr` downwards to `align`.
///
/// See `align_up` for the accepted alignments.
#[inline]
pub fn align_down(addr: Addr, align: u32) -> Addr {
    if align <= 1 {
        return addr;
    }

    debug_assert!(align.is_power_of_two(), "Alignment {} is not a power of two.", align);

    addr & !(align - 1)
}

/// A contiguous span of the address space.
///
/// Guarantees: a non-empty block never extends past the top of the address space, that is,
/// `start + size - 1` always fits in an `Addr`. This is enforced by the constructors.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    /// The start of this block.
    start: Addr,
    /// The size of this block, in bytes.
    size: u32,
}

impl Block {
    /// Construct a block from its start and size.
    ///
    /// Returns `None` if the block would extend past the top of the address space.
    #[inline]
    pub fn new(start: Addr, size: u32) -> Option<Block> {
        if size != 0 && start.checked_add(size - 1).is_none() {
            None
        } else {
            Some(Block {
                start: start,
                size: size,
            })
        }
    }

    /// Construct a block from its first and last byte (both inclusive).
    ///
    /// The size of the block is truncated to `u32::MAX` if it spans the entire address space.
    #[inline]
    pub fn from_last(start: Addr, last: Addr) -> Block {
        debug_assert!(start <= last, "Block ends ({:#x}) before it starts ({:#x}).", last, start);

        Block {
            start: start,
            size: cmp::min(u64::from(last) - u64::from(start) + 1, u64::from(u32::max_value()))
                as u32,
        }
    }

    /// Create an empty block starting at `start`.
    #[inline]
    pub fn empty(start: Addr) -> Block {
        Block {
            start: start,
            size: 0,
        }
    }

    /// Is this block empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the start of the block.
    #[inline]
    pub fn start(&self) -> Addr {
        self.start
    }

    /// Get the size of the block.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Get the last byte of the block.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the block is empty, since it has no last byte.
    #[inline]
    pub fn last(&self) -> Addr {
        debug_assert!(!self.is_empty(), "Empty block {:?} has no last byte.", self);

        // This cannot overflow, due to the guarantee on construction.
        self.start + (self.size - 1)
    }

    /// Get the (exclusive) end of the block, widened so that `2^32` can be represented.
    #[inline]
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.size)
    }

    /// Does this block contain the byte `addr`?
    #[inline]
    pub fn contains(&self, addr: Addr) -> bool {
        !self.is_empty() && self.start <= addr && addr <= self.last()
    }

    /// Does this block share any byte with `other`?
    #[inline]
    pub fn overlaps(&self, other: &Block) -> bool {
        !self.is_empty() && !other.is_empty()
            && self.start <= other.last() && other.start <= self.last()
    }

    /// Is this block placed left to the given other block?
    #[inline]
    pub fn left_to(&self, to: &Block) -> bool {
        self.end() == u64::from(to.start)
    }

    /// Is this block aligned to `align`?
    #[inline]
    pub fn aligned_to(&self, align: u32) -> bool {
        align <= 1 || self.start % align == 0
    }

    /// Split the block at some position.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bound.
    #[inline]
    pub fn split(self, pos: u32) -> (Block, Block) {
        assert!(pos <= self.size, "Split {} out of bound (size is {})!", pos, self.size);

        (
            Block {
                start: self.start,
                size: pos,
            },
            Block {
                start: self.start.wrapping_add(pos),
                size: self.size - pos,
            }
        )
    }
}

impl PartialOrd for Block {
    #[inline]
    fn partial_cmp(&self, other: &Block) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare the blocks address.
impl Ord for Block {
    #[inline]
    fn cmp(&self, other: &Block) -> cmp::Ordering {
        (self.start, self.size).cmp(&(other.start, other.size))
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}[0x{:x}]", self.start, self.size)
    }
}
