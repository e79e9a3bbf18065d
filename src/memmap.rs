//! Region maps.
//!
//! A region map is a sorted list of typed memory ranges, with the guarantee that no two adjacent
//! entries have the same type. All memory which has not been described yet has the type
//! `Undefined`.

use alloc::vec::Vec;

use block::{self, Addr, Block};
use fail::Result;
use region::{Region, RegionType};

use core::{cmp, fmt};

/// Constraints for `RegionMap::find`.
///
/// The `end_*` bounds are exclusive ends, widened so that `2^32` can be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// May the data be placed somewhere other than the requested base?
    pub relocate: bool,
    /// The alignment of a relocated base. Zero and one both mean byte alignment.
    pub align: u32,
    /// The lowest acceptable relocated base.
    pub start_min: Addr,
    /// The highest acceptable relocated base.
    pub start_max: Addr,
    /// Only free regions ending above this are considered, so that placement moves upwards.
    pub end_min: u64,
    /// Relocated data must end at or below this.
    pub end_max: u64,
}

impl Placement {
    /// A placement which only accepts the requested base.
    pub fn fixed() -> Placement {
        Placement {
            relocate: false,
            align: 1,
            start_min: 0,
            start_max: Addr::max_value(),
            end_min: 0,
            end_max: 1 << 32,
        }
    }

    /// A placement which may move anywhere in free memory.
    pub fn relocatable() -> Placement {
        Placement {
            relocate: true,
            ..Placement::fixed()
        }
    }
}

impl Default for Placement {
    fn default() -> Placement {
        Placement::fixed()
    }
}

/// A map of the physical address space.
///
/// This keeps track of what every byte of the 32-bit address space is used for. The map is
/// exclusively owned by whoever created it: when two parties need an independent view of the same
/// memory, the map is duplicated through [`dup`](#method.dup), never shared.
#[derive(PartialEq, Eq, Debug)]
pub struct RegionMap {
    /// The entries of the map.
    ///
    /// Guarantees
    /// ==========
    ///
    /// Certain guarantees are made:
    ///
    /// 1. The first entry starts at address zero.
    /// 2. The list is strictly sorted with respect to the entries' starts, except for the last
    ///    entry.
    /// 3. The last entry, and only the last entry, is the `End` sentinel. Its start is zero,
    ///    standing for `2^32` (the address space wraps around).
    /// 4. No two consecutive entries have the same type.
    /// 5. No entry has the type `Error`.
    ///
    /// These are invariants assuming that only the public methods are used.
    regions: Vec<Region>,
}

impl RegionMap {
    /// Create a new map, describing the whole address space as `Undefined`.
    pub fn new() -> Result<RegionMap> {
        let mut regions = Vec::new();
        regions.try_reserve(2)?;

        regions.push(Region::new(0, RegionType::Undefined));
        // Wrap around.
        regions.push(Region::new(0, RegionType::End));

        Ok(RegionMap {
            regions: regions,
        })
    }

    /// Duplicate this map.
    ///
    /// The result is a deep copy which evolves independently from `self`.
    pub fn dup(&self) -> Result<RegionMap> {
        let mut regions = Vec::new();
        regions.try_reserve_exact(self.regions.len())?;
        regions.extend_from_slice(&self.regions);

        Ok(RegionMap {
            regions: regions,
        })
    }

    /// Get the number of regions in the map, not counting the sentinel.
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len() - 1
    }

    /// Iterate over the regions of the map, in ascending order.
    ///
    /// Every region is paired with its last byte. The sentinel is not yielded.
    #[inline]
    pub fn iter(&self) -> Iter {
        Iter {
            map: self,
            ind: 0,
        }
    }

    /// Get the raw entries, sentinel included.
    #[cfg(feature = "log")]
    #[inline]
    pub(crate) fn entries(&self) -> &[Region] {
        &self.regions
    }

    /// Add a region to the map, overwriting what is already there.
    ///
    /// This marks the `len` bytes starting at `start` with `kind`. A zero-sized region is a no-op.
    /// A region running past the top of the address space is truncated at the top.
    ///
    /// The only possible failure is running out of storage for the new entries, in which case the
    /// map is left unmodified.
    ///
    /// # Example
    ///
    /// We start with a map of three regions, and want to insert the span denoted by the tildes.
    ///
    /// ```notrust
    ///    Address space
    ///   I-----F-----I--R--I------F------I
    ///         I~~~~~~~~~~~~~~~I
    /// ```
    ///
    /// Every entry starting inside the span is deleted, and a new entry is spliced in at its
    /// start:
    ///
    /// ```notrust
    ///    Address space
    ///   I-----F-----I
    ///         I~~~~~~~~~~~~~~~I
    /// ```
    ///
    /// A trailing entry restores the type which used to occupy the byte past the span:
    ///
    /// ```notrust
    ///    Address space
    ///   I--F--I~~~~~~~A~~~~~~~I--F--I
    /// ```
    ///
    /// Finally, neighbours of the same type are merged.
    pub fn insert(&mut self, start: Addr, len: u32, kind: RegionType) -> Result<()> {
        // Remove this to make len == 0 mean all of memory.
        if len == 0 {
            return Ok(());
        }

        // Last byte -- to avoid rollover.
        let last = start.saturating_add(len - 1);

        self.insert_last(start, last, kind)
    }

    /// Add a region given by its first and last byte (both inclusive).
    ///
    /// See [`insert`](#method.insert) for details.
    pub(crate) fn insert_last(&mut self, start: Addr, last: Addr, kind: RegionType) -> Result<()> {
        debug_assert!(start <= last, "Inserting a region ending before it starts.");
        debug_assert!(kind != RegionType::End && kind != RegionType::Error,
                      "Inserting a region of type {:?}.", kind);

        // The type which used to follow the span. This must be restored behind it.
        let tail = if last == Addr::max_value() {
            None
        } else {
            Some(self.type_at(last + 1))
        };

        // At most two entries are added (the span itself and the tail), so reserve them upfront.
        // After this no step can fail, so the map is never left half-modified.
        self.regions.try_reserve(2)?;

        let (lo, hi) = {
            let body = self.body();
            (body.partition_point(|x| x.start < start), body.partition_point(|x| x.start <= last))
        };

        // Every entry starting inside the span is covered by it.
        self.regions.drain(lo..hi);
        self.regions.insert(lo, Region::new(start, kind));

        if let Some(tail) = tail {
            let next = self.regions[lo + 1];
            if next.kind == RegionType::End || next.start != last + 1 {
                // Need a new end token.
                self.regions.insert(lo + 1, Region::new(last + 1, tail));
            }
        }

        self.coalesce();

        log!(self;lo, "Inserted {:#x}..={:#x} as {}.", start, last, kind);

        // Check consistency.
        self.check();

        Ok(())
    }

    /// Get the type of the byte at `addr`.
    #[inline]
    pub fn type_at(&self, addr: Addr) -> RegionType {
        self.regions[self.index_of(addr)].kind
    }

    /// Verify what type a certain memory span is.
    ///
    /// This returns `RegionType::Error` if the span has multiple types, except that a span made
    /// up of `Free` and `Terminal` regions only is demoted to `Terminal`. A span which would run
    /// past the top of the address space is an `Error` as well.
    ///
    /// A zero-sized span has the type of the byte at `start`.
    pub fn type_of(&self, start: Addr, len: u32) -> RegionType {
        if len == 0 {
            return self.type_at(start);
        }

        let last = match start.checked_add(len - 1) {
            Some(last) => last,
            None => return RegionType::Error,
        };

        let mut ind = self.index_of(start);
        if self.last_of(ind) >= last {
            // Region has a well-defined type.
            return self.regions[ind].kind;
        }

        // Crosses region boundary. The last body region always reaches the top of the address
        // space, so this terminates before hitting the sentinel.
        loop {
            if !self.regions[ind].kind.is_placeable() {
                return RegionType::Error;
            }

            if self.last_of(ind) >= last {
                return RegionType::Terminal;
            }

            ind += 1;
        }
    }

    /// Find the first (lowest address) region of a specific type and of a certain minimum size.
    ///
    /// The candidate start is the higher of `min_start` and the region's start, aligned up to
    /// `align`. On success, the returned block runs from the candidate start to the end of its
    /// region (that is, it is _at least_ `min_len` bytes long).
    pub fn find_lowest(&self, kind: RegionType, min_start: Addr, min_len: u32, align: u32)
        -> Option<Block> {
        for (region, last) in self.iter() {
            if region.kind != kind {
                continue;
            }

            let start = match block::align_up(cmp::max(min_start, region.start), align) {
                Some(start) => start,
                None => continue,
            };

            if start > last {
                continue;
            }

            if u64::from(last) - u64::from(start) + 1 >= u64::from(min_len) {
                return Some(Block::from_last(start, last));
            }
        }

        None
    }

    /// Find the largest region of a specific type.
    ///
    /// On ties, the lowest region wins.
    pub fn find_largest(&self, kind: RegionType) -> Option<Block> {
        let mut best: Option<(Addr, Addr)> = None;

        for (region, last) in self.iter() {
            if region.kind != kind {
                continue;
            }

            let size = u64::from(last) - u64::from(region.start);
            if best.map_or(true, |(start, end)| size > u64::from(end) - u64::from(start)) {
                best = Some((region.start, last));
            }
        }

        best.map(|(start, last)| Block::from_last(start, last))
    }

    /// Find the highest address at which `len` bytes fit inside a region of a specific type.
    ///
    /// The returned start is aligned to `align`, is at least `hint`, and the placed data ends at
    /// or below `max_end` (inclusive). A zero `len` is treated as a single byte.
    pub fn find_highest(&self, kind: RegionType, hint: Addr, len: u32, max_end: Addr, align: u32)
        -> Option<Addr> {
        self.find_highest_in(|x| x == kind, hint, len, max_end, align)
    }

    /// Find the highest placement, using `Terminal` memory as a last resort.
    ///
    /// This behaves like [`find_highest`](#method.find_highest) for `Free` memory, except that
    /// runs of adjoining `Free` and `Terminal` regions are treated as a single search domain.
    pub fn find_highest_last_resort(&self, hint: Addr, len: u32, max_end: Addr, align: u32)
        -> Option<Addr> {
        self.find_highest_in(RegionType::is_placeable, hint, len, max_end, align)
    }

    /// Find a memory region for `size` bytes wanted at `base`, given a set of heuristics.
    ///
    /// If the requested base is usable as-is (it is `Free`, or `Terminal` since we get the exact
    /// address), it is returned. Otherwise, if the placement allows relocation, the lowest
    /// suitable spot in `Free` memory is returned. A zero-sized request always succeeds with
    /// `base` itself.
    pub fn find(&self, base: Addr, size: u32, placement: &Placement) -> Option<Addr> {
        if size == 0 {
            return Some(base);
        }

        // This assumes terminal memory is OK if we can get the exact address.
        if self.type_of(base, size).is_placeable() {
            return Some(base);
        }

        if !placement.relocate {
            log!(self, "Cannot relocate {:#x}[{:#x}].", base, size);
            return None;
        }

        for (region, last) in self.iter() {
            if region.kind != RegionType::Free {
                continue;
            }

            let end = u64::from(last) + 1;
            if end <= placement.end_min {
                // Only relocate upwards.
                continue;
            }

            let end = cmp::min(end, placement.end_max);
            let start = match block::align_up(cmp::max(region.start, placement.start_min),
                                              placement.align) {
                Some(start) => start,
                None => continue,
            };

            if start > placement.start_max || u64::from(start) >= end {
                continue;
            }

            if end - u64::from(start) >= u64::from(size) {
                return Some(start);
            }
        }

        None
    }

    /// Count the placeable bytes starting at `start`, up to `max`.
    pub(crate) fn placeable_from(&self, start: Addr, max: u32) -> u32 {
        let want = u64::from(max);
        let mut size = 0;
        let mut ind = self.index_of(start);

        // The sentinel is not placeable, which stops the walk.
        while size < want && self.regions[ind].kind.is_placeable() {
            size = u64::from(self.last_of(ind)) - u64::from(start) + 1;
            ind += 1;
        }

        cmp::min(size, want) as u32
    }

    /// Count the placeable bytes ending at `last` (inclusive), up to `max`.
    pub(crate) fn placeable_until(&self, last: Addr, max: u32) -> u32 {
        let want = u64::from(max);
        let mut size = 0;
        let mut ind = self.index_of(last);

        while self.regions[ind].kind.is_placeable() {
            size = u64::from(last) - u64::from(self.regions[ind].start) + 1;

            if size >= want || ind == 0 {
                break;
            }

            ind -= 1;
        }

        cmp::min(size, want) as u32
    }

    /// Give every region of type `from` the type `to`.
    pub(crate) fn retype(&mut self, from: RegionType, to: RegionType) {
        debug_assert!(to != RegionType::End && to != RegionType::Error, "Retyping to {:?}.", to);

        let len = self.len();
        for region in &mut self.regions[..len] {
            if region.kind == from {
                region.kind = to;
            }
        }

        self.coalesce();

        // Check consistency.
        self.check();
    }

    /// The generic highest-fit search.
    ///
    /// Maximal runs of adjoining accepted regions are treated as single candidates.
    fn find_highest_in<F>(&self, accept: F, hint: Addr, len: u32, max_end: Addr, align: u32)
        -> Option<Addr> where F: Fn(RegionType) -> bool {
        let want = cmp::max(len, 1);
        let body = self.len();
        let mut best = None;
        let mut ind = 0;

        while ind < body {
            if !accept(self.regions[ind].kind) {
                ind += 1;
                continue;
            }

            let run_start = self.regions[ind].start;
            while ind + 1 < body && accept(self.regions[ind + 1].kind) {
                ind += 1;
            }
            let run_last = self.last_of(ind);
            ind += 1;

            let top = cmp::min(run_last, max_end);
            let floor = cmp::max(run_start, hint);
            if top < floor || u64::from(top) - u64::from(floor) + 1 < u64::from(want) {
                continue;
            }

            let start = block::align_down(top - (want - 1), align);
            if start >= floor {
                // The runs are ascending, so a later fit is always higher.
                best = Some(start);
            }
        }

        best
    }

    /// The entries excluding the sentinel.
    #[inline]
    fn body(&self) -> &[Region] {
        &self.regions[..self.regions.len() - 1]
    }

    /// Find the index of the region containing `addr`.
    #[inline]
    fn index_of(&self, addr: Addr) -> usize {
        // The first region starts at zero, so the partition point is at least one.
        self.body().partition_point(|x| x.start <= addr) - 1
    }

    /// Get the last byte of the region at `ind`.
    #[inline]
    fn last_of(&self, ind: usize) -> Addr {
        // The sentinel starts at zero, making the last region end at the top.
        self.regions[ind + 1].start.wrapping_sub(1)
    }

    /// Merge adjacent entries of the same type.
    #[inline]
    fn coalesce(&mut self) {
        self.regions.dedup_by(|next, prev| next.kind == prev.kind);
    }

    /// No-op in release mode.
    #[cfg(not(debug_assertions))]
    #[inline]
    fn check(&self) {}

    /// Perform consistency checks.
    ///
    /// This will check for the following conditions:
    ///
    /// 1. The map starts at zero and ends with exactly one sentinel.
    /// 2. The list is sorted.
    /// 3. No two adjacent regions share a type.
    #[cfg(debug_assertions)]
    fn check(&self) {
        let len = self.regions.len();

        assert!(len >= 2, "The map has no body ({} entries).", len);
        assert!(self.regions[0].start == 0, "The map starts at {:#x}.", self.regions[0].start);
        assert!(self.regions[len - 1] == Region::new(0, RegionType::End),
                "The map is not terminated by a sentinel ({:?}).", self.regions[len - 1]);

        for (n, i) in self.body().iter().enumerate() {
            assert!(i.kind != RegionType::End && i.kind != RegionType::Error,
                    "Invalid region type at index {} ({:?}).", n, i);
        }

        for (n, pair) in self.body().windows(2).enumerate() {
            // Check if sorted.
            assert!(pair[0].start < pair[1].start, "The map is not sorted at index {} ({:?} >= \
                    {:?})", n + 1, pair[0], pair[1]);
            // Make sure no neighbours are mergeable.
            assert!(pair[0].kind != pair[1].kind, "Unmerged regions at index {} ({:?} and \
                    {:?})", n + 1, pair[0], pair[1]);
        }
    }
}

/// Dump the map, one region per line.
impl fmt::Display for RegionMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (region, last) in self.iter() {
            writeln!(f, "{:#010x} {:#010x} {}", region.start, last, region.kind)?;
        }

        Ok(())
    }
}

/// An iterator over the regions of a map.
pub struct Iter<'a> {
    /// The map.
    map: &'a RegionMap,
    /// The index of the next region.
    ind: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Region, Addr);

    fn next(&mut self) -> Option<(Region, Addr)> {
        if self.ind < self.map.len() {
            let res = (self.map.regions[self.ind], self.map.last_of(self.ind));
            self.ind += 1;

            Some(res)
        } else { None }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use region::RegionType::*;

    fn kinds(map: &RegionMap) -> Vec<(Addr, RegionType)> {
        map.iter().map(|(x, _)| (x.start, x.kind)).collect()
    }

    #[test]
    fn test_fresh() {
        let map = RegionMap::new().unwrap();

        assert_eq!(kinds(&map), [(0, Undefined)]);
        assert_eq!(map.type_of(0, u32::max_value()), Undefined);
        assert_eq!(map.iter().next().unwrap().1, 0xFFFF_FFFF);
    }

    #[test]
    fn test_insert_split_and_merge() {
        let mut map = RegionMap::new().unwrap();

        map.insert(0x1000, 0x1000, Free).unwrap();
        assert_eq!(kinds(&map), [(0, Undefined), (0x1000, Free), (0x2000, Undefined)]);

        // Punch a hole.
        map.insert(0x1800, 0x100, Reserved).unwrap();
        assert_eq!(kinds(&map), [(0, Undefined), (0x1000, Free), (0x1800, Reserved),
                                 (0x1900, Free), (0x2000, Undefined)]);

        // Cover the hole again, merging the free regions.
        map.insert(0x1800, 0x100, Free).unwrap();
        assert_eq!(kinds(&map), [(0, Undefined), (0x1000, Free), (0x2000, Undefined)]);

        // Extend to the right, merging with nothing.
        map.insert(0x2000, 0x800, Free).unwrap();
        assert_eq!(kinds(&map), [(0, Undefined), (0x1000, Free), (0x2800, Undefined)]);

        // Swallow several regions at once.
        map.insert(0x1800, 0x100, Terminal).unwrap();
        map.insert(0x1A00, 0x100, Reserved).unwrap();
        map.insert(0x800, 0x3000, Allocated).unwrap();
        assert_eq!(kinds(&map), [(0, Undefined), (0x800, Allocated), (0x3800, Undefined)]);
    }

    #[test]
    fn test_insert_at_boundaries() {
        let mut map = RegionMap::new().unwrap();

        map.insert(0, 0x100, Reserved).unwrap();
        assert_eq!(kinds(&map), [(0, Reserved), (0x100, Undefined)]);

        map.insert(0xFFFF_F000, 0x1000, Free).unwrap();
        assert_eq!(kinds(&map), [(0, Reserved), (0x100, Undefined), (0xFFFF_F000, Free)]);
        assert_eq!(map.iter().last().unwrap().1, 0xFFFF_FFFF);

        // Running past the top of the address space is truncated.
        map.insert(0xFFFF_FF00, 0x1000, Terminal).unwrap();
        assert_eq!(kinds(&map), [(0, Reserved), (0x100, Undefined), (0xFFFF_F000, Free),
                                 (0xFFFF_FF00, Terminal)]);

        // Zero-sized insertions are no-ops.
        map.insert(0x5000, 0, Free).unwrap();
        assert_eq!(map.len(), 4);

        // Everything.
        map.insert(0, u32::max_value(), Free).unwrap();
        assert_eq!(kinds(&map), [(0, Free), (0xFFFF_FFFF, Terminal)]);
    }

    #[test]
    fn test_dup_is_independent() {
        let mut map = RegionMap::new().unwrap();
        map.insert(0x1000, 0x1000, Free).unwrap();

        let mut copy = map.dup().unwrap();
        assert_eq!(copy, map);

        copy.insert(0x1000, 0x10, Allocated).unwrap();
        assert_eq!(map.type_at(0x1000), Free);
        assert_eq!(copy.type_at(0x1000), Allocated);
    }

    #[test]
    fn test_type_of() {
        let mut map = RegionMap::new().unwrap();
        map.insert(0x1000, 0x1000, Free).unwrap();
        map.insert(0x2000, 0x1000, Terminal).unwrap();
        map.insert(0x3000, 0x1000, Reserved).unwrap();

        assert_eq!(map.type_of(0x1000, 0x1000), Free);
        assert_eq!(map.type_of(0x1800, 0x1000), Terminal);
        assert_eq!(map.type_of(0x2800, 0x1000), Error);
        assert_eq!(map.type_of(0x800, 0x1000), Error);
        assert_eq!(map.type_of(0x3000, 0), Reserved);
        assert_eq!(map.type_of(0xFFFF_FFFF, 2), Error);
    }

    #[test]
    fn test_retype() {
        let mut map = RegionMap::new().unwrap();
        map.insert(0x1000, 0x1000, Free).unwrap();
        map.insert(0x2000, 0x1000, ZeroFill).unwrap();
        map.insert(0x3000, 0x1000, Reserved).unwrap();
        map.insert(0x4000, 0x1000, ZeroFill).unwrap();

        map.retype(ZeroFill, Free);
        assert_eq!(kinds(&map), [(0, Undefined), (0x1000, Free), (0x3000, Reserved),
                                 (0x4000, Free), (0x5000, Undefined)]);
    }

    #[test]
    fn test_placeable_runs() {
        let mut map = RegionMap::new().unwrap();
        map.insert(0x1000, 0x1000, Free).unwrap();
        map.insert(0x2000, 0x1000, Terminal).unwrap();

        assert_eq!(map.placeable_from(0x1800, 0x10000), 0x1800);
        assert_eq!(map.placeable_from(0x1800, 0x10), 0x10);
        assert_eq!(map.placeable_from(0x3000, 0x10), 0);
        assert_eq!(map.placeable_until(0x2FFF, 0x10000), 0x2000);
        assert_eq!(map.placeable_until(0x17FF, 0x100), 0x100);
        assert_eq!(map.placeable_until(0xFFF, 0x100), 0);
    }

    #[test]
    fn test_find_lowest_and_largest() {
        let mut map = RegionMap::new().unwrap();
        map.insert(0x1000, 0x100, Free).unwrap();
        map.insert(0x2000, 0x1000, Free).unwrap();
        map.insert(0x4000, 0x800, Free).unwrap();

        assert_eq!(map.find_lowest(Free, 0, 0x200, 1), Block::new(0x2000, 0x1000));
        assert_eq!(map.find_lowest(Free, 0x1010, 0x10, 0x100), Block::new(0x2000, 0x1000));
        assert_eq!(map.find_lowest(Free, 0x1001, 0x10, 0x10), Block::new(0x1010, 0xF0));
        assert_eq!(map.find_lowest(Free, 0, 0x2000, 1), None);
        assert_eq!(map.find_largest(Free), Block::new(0x2000, 0x1000));
        assert_eq!(map.find_largest(Reserved), None);
    }
}
