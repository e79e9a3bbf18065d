//! Region types.

use block::Addr;

use core::fmt;

/// The type of a region of the address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionType {
    /// Nothing is known about this memory. This is the background state of a fresh map.
    Undefined,
    /// Memory which is free for use.
    Free,
    /// Memory which is free for use, and which is zeroed once all moves are done.
    ZeroFill,
    /// Memory which is claimed, either by source material or by data already in place.
    Allocated,
    /// Memory which must never be touched.
    Reserved,
    /// Memory which may only be used as a last resort (e.g. PXE or option-ROM memory).
    Terminal,
    /// The sentinel terminating a map.
    End,
    /// Not a real region type. Returned by queries spanning incompatible types.
    Error,
}

impl RegionType {
    /// Can data be placed in a region of this type?
    ///
    /// This holds for `Free` and `Terminal` regions, which together form the domain of last
    /// resort searches.
    #[inline]
    pub fn is_placeable(self) -> bool {
        match self {
            RegionType::Free | RegionType::Terminal => true,
            _ => false,
        }
    }

    /// The single character used for this type in log output.
    pub fn glyph(self) -> char {
        match self {
            RegionType::Undefined => 'U',
            RegionType::Free => 'F',
            RegionType::ZeroFill => 'Z',
            RegionType::Allocated => 'A',
            RegionType::Reserved => 'R',
            RegionType::Terminal => 'T',
            RegionType::End => '$',
            RegionType::Error => '!',
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            RegionType::Undefined => "undefined",
            RegionType::Free => "free",
            RegionType::ZeroFill => "zero",
            RegionType::Allocated => "allocated",
            RegionType::Reserved => "reserved",
            RegionType::Terminal => "terminal",
            RegionType::End => "end",
            RegionType::Error => "error",
        })
    }
}

/// A region map entry.
///
/// The region spans from `start` up to (but excluding) the start of the following entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// The first byte of the region.
    pub start: Addr,
    /// The type of the region.
    pub kind: RegionType,
}

impl Region {
    /// Create a new region entry.
    #[inline]
    pub fn new(start: Addr, kind: RegionType) -> Region {
        Region {
            start: start,
            kind: kind,
        }
    }
}
