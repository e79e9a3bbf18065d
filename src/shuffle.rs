//! Shuffle descriptor tables.
//!
//! The trampoline performing the final moves reads a flat table of `(dst, src, len)` triples from
//! a fixed 64 KiB bounce buffer. This module lowers a move sequence into that table.

use alloc::vec::Vec;

use block::Addr;
use fail::{Error, Result};
use movelist::MoveSequence;
use vec::TryPush;

/// The source of a descriptor zeroing its destination.
pub const ZERO_SOURCE: Addr = 0xFFFF_FFFF;
/// The size of an encoded descriptor, in bytes.
pub const DESCRIPTOR_SIZE: usize = 12;
/// The number of descriptors fitting in the bounce buffer.
pub const MAX_DESCRIPTORS: usize = 65536 / DESCRIPTOR_SIZE;

/// A trampoline descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor {
    /// The destination.
    pub dst: Addr,
    /// The source, or `ZERO_SOURCE`.
    pub src: Addr,
    /// The number of bytes.
    pub len: u32,
}

impl Descriptor {
    /// Does this descriptor zero its destination?
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.src == ZERO_SOURCE
    }

    /// Encode the descriptor in its wire format.
    ///
    /// This is the destination, the source, and the length, each little-endian.
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut res = [0; DESCRIPTOR_SIZE];
        res[0..4].copy_from_slice(&self.dst.to_le_bytes());
        res[4..8].copy_from_slice(&self.src.to_le_bytes());
        res[8..12].copy_from_slice(&self.len.to_le_bytes());

        res
    }
}

/// Lower a move sequence into trampoline descriptors.
///
/// # Errors
///
/// `Error::TooManyDescriptors` is returned if the table would overflow the bounce buffer.
pub fn prepare(sequence: &MoveSequence) -> Result<Vec<Descriptor>> {
    if sequence.len() > MAX_DESCRIPTORS {
        return Err(Error::TooManyDescriptors);
    }

    let mut res = Vec::new();
    res.try_reserve_exact(sequence.len())?;

    for i in sequence {
        res.push(Descriptor {
            dst: i.dst,
            src: i.src.unwrap_or(ZERO_SOURCE),
            len: i.len,
        });
    }

    Ok(res)
}

/// Encode a descriptor table into the bounce buffer layout.
pub fn encode(table: &[Descriptor]) -> Result<Vec<u8>> {
    if table.len() > MAX_DESCRIPTORS {
        return Err(Error::TooManyDescriptors);
    }

    let mut res = Vec::new();
    res.try_reserve_exact(table.len() * DESCRIPTOR_SIZE)?;

    for i in table {
        res.extend_from_slice(&i.to_bytes());
    }

    Ok(res)
}

/// Push a descriptor onto a table under construction, respecting the bounce buffer limit.
///
/// This is for callers adding descriptors of their own (e.g. a final jump record) after
/// `prepare`.
pub fn push(table: &mut Vec<Descriptor>, desc: Descriptor) -> Result<()> {
    if table.len() >= MAX_DESCRIPTORS {
        return Err(Error::TooManyDescriptors);
    }

    table.try_push(desc)
}

#[cfg(test)]
mod test {
    use super::*;

    use movelist::Move;

    #[test]
    fn test_to_bytes() {
        let desc = Descriptor {
            dst: 0x0010_0000,
            src: ZERO_SOURCE,
            len: 0x1234,
        };

        assert!(desc.is_zero());
        assert_eq!(desc.to_bytes(), [0x00, 0x00, 0x10, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
                                     0x34, 0x12, 0x00, 0x00]);
    }

    #[test]
    fn test_prepare() {
        let seq = MoveSequence::from_vec(vec![Move::copy(0x1000, 0x2000, 0x10),
                                              Move::zero(0x3000, 0x20)]);
        let table = prepare(&seq).unwrap();

        assert_eq!(table, [
            Descriptor { dst: 0x1000, src: 0x2000, len: 0x10 },
            Descriptor { dst: 0x3000, src: ZERO_SOURCE, len: 0x20 },
        ]);
        assert_eq!(encode(&table).unwrap().len(), 2 * DESCRIPTOR_SIZE);
    }

    #[test]
    fn test_limit() {
        let full = MoveSequence::from_vec(vec![Move::zero(0, 1); MAX_DESCRIPTORS]);
        let mut table = prepare(&full).unwrap();
        assert_eq!(push(&mut table, Descriptor { dst: 0, src: 0, len: 0 }),
                   Err(Error::TooManyDescriptors));

        let over = MoveSequence::from_vec(vec![Move::zero(0, 1); MAX_DESCRIPTORS + 1]);
        assert_eq!(prepare(&over), Err(Error::TooManyDescriptors));
    }
}
