//! Move descriptors and sequences.

use alloc::vec::Vec;

use block::{Addr, Block};

use core::{cmp, fmt, ops};

/// A primitive operation for the executor.
///
/// This is either a copy of `len` bytes from `src` to `dst`, or (when `src` is `None`) a zero-fill
/// of `len` bytes at `dst`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    /// The destination.
    pub dst: Addr,
    /// The source, or `None` for a zero-fill.
    pub src: Option<Addr>,
    /// The number of bytes.
    pub len: u32,
}

impl Move {
    /// Create a copy.
    #[inline]
    pub fn copy(dst: Addr, src: Addr, len: u32) -> Move {
        Move {
            dst: dst,
            src: Some(src),
            len: len,
        }
    }

    /// Create a zero-fill.
    #[inline]
    pub fn zero(dst: Addr, len: u32) -> Move {
        Move {
            dst: dst,
            src: None,
            len: len,
        }
    }

    /// Is this a zero-fill?
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.src.is_none()
    }

    /// Does this move leave memory as it is?
    ///
    /// This is true for empty moves and for copies onto themselves.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.len == 0 || self.src == Some(self.dst)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.src {
            Some(src) => write!(f, "{:#010x} <- {:#010x} len {:#010x}", self.dst, src, self.len),
            None => write!(f, "{:#010x} <- {:10} len {:#010x}", self.dst, "zero", self.len),
        }
    }
}

/// An ordered sequence of moves.
///
/// The order is load-bearing: the moves must be executed strictly one after another.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveSequence {
    /// The moves.
    moves: Vec<Move>,
}

impl MoveSequence {
    /// Create an empty sequence.
    #[inline]
    pub fn new() -> MoveSequence {
        MoveSequence::default()
    }

    /// Wrap a vector of moves.
    #[inline]
    pub(crate) fn from_vec(moves: Vec<Move>) -> MoveSequence {
        MoveSequence {
            moves: moves,
        }
    }

    /// Take the underlying vector.
    #[inline]
    pub fn into_vec(self) -> Vec<Move> {
        self.moves
    }
}

impl ops::Deref for MoveSequence {
    type Target = [Move];

    #[inline]
    fn deref(&self) -> &[Move] {
        &self.moves
    }
}

impl<'a> IntoIterator for &'a MoveSequence {
    type Item = &'a Move;
    type IntoIter = ::core::slice::Iter<'a, Move>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

/// Dump the sequence, one move per line.
impl fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in &self.moves {
            writeln!(f, "{}", i)?;
        }

        Ok(())
    }
}

/// A pending copy.
///
/// Guarantees: `len` is non-zero, and neither the source nor the destination runs past the top of
/// the address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Frag {
    /// The destination.
    pub dst: Addr,
    /// The (current) source.
    pub src: Addr,
    /// The number of bytes.
    pub len: u32,
}

/// The range a fragment must claim before it can be moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Need {
    /// The range.
    pub block: Block,
    /// Is the critical byte at the top of the range?
    pub top: bool,
}

impl Need {
    /// The byte which must be claimable before any progress can be made.
    #[inline]
    pub fn critical(&self) -> Addr {
        if self.top {
            self.block.last()
        } else {
            self.block.start()
        }
    }
}

impl Frag {
    /// Create a new fragment.
    ///
    /// Returns `None` if either range would run past the top of the address space.
    pub fn new(dst: Addr, src: Addr, len: u32) -> Option<Frag> {
        debug_assert!(len != 0, "Empty fragment.");

        if Block::new(dst, len).is_some() && Block::new(src, len).is_some() {
            Some(Frag {
                dst: dst,
                src: src,
                len: len,
            })
        } else { None }
    }

    /// The last byte of the source.
    #[inline]
    pub fn src_last(&self) -> Addr {
        self.src + (self.len - 1)
    }

    /// The last byte of the destination.
    #[inline]
    pub fn dst_last(&self) -> Addr {
        self.dst + (self.len - 1)
    }

    /// The source range.
    #[inline]
    pub fn src_block(&self) -> Block {
        Block::from_last(self.src, self.src_last())
    }

    /// The destination range.
    #[inline]
    pub fn dst_block(&self) -> Block {
        Block::from_last(self.dst, self.dst_last())
    }

    /// Is this fragment already in place?
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.src == self.dst
    }

    /// Compute the range this fragment needs claimed.
    ///
    /// If the destination overlaps the source, only the part of the destination outside the source
    /// must be claimed; the executor moves the rest in the safe direction.
    ///
    /// ```notrust
    ///     shift up:    src |======|
    ///                  dst    |======|
    ///                  need          |~~|
    ///
    ///     shift down:  src    |======|
    ///                  dst |======|
    ///                  need |~~|
    /// ```
    pub fn need(&self) -> Need {
        if self.src < self.dst && self.dst - self.src < self.len {
            Need {
                block: Block::from_last(self.src + self.len, self.dst_last()),
                top: true,
            }
        } else if self.src > self.dst && self.src - self.dst < self.len {
            Need {
                block: Block::from_last(self.dst, self.src - 1),
                top: false,
            }
        } else {
            Need {
                block: self.dst_block(),
                top: false,
            }
        }
    }

    /// Compute the range this fragment vacates once it is moved.
    pub fn freed(&self) -> Block {
        if self.dst > self.src {
            Block::from_last(self.src, self.src + (cmp::min(self.dst - self.src, self.len) - 1))
        } else if self.src - self.dst >= self.len {
            self.src_block()
        } else {
            Block::from_last(self.dst + self.len, self.src_last())
        }
    }

    /// Split the fragment at `pos` bytes.
    ///
    /// # Panics
    ///
    /// Panics if either half would be empty.
    pub fn split(self, pos: u32) -> (Frag, Frag) {
        assert!(pos != 0 && pos < self.len, "Split {} out of bound (len is {}).", pos, self.len);

        (
            Frag {
                dst: self.dst,
                src: self.src,
                len: pos,
            },
            Frag {
                dst: self.dst + pos,
                src: self.src + pos,
                len: self.len - pos,
            },
        )
    }

    /// The move which performs this fragment.
    #[inline]
    pub fn to_move(&self) -> Move {
        Move::copy(self.dst, self.src, self.len)
    }
}
