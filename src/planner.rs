//! The relocation planner.
//!
//! This turns a set of wanted copies into an ordered sequence of primitive moves, which can be
//! executed one by one without any copy clobbering bytes another copy has yet to read.

use alloc::vec::Vec;

use block::{Addr, Block};
use dealias::dealias;
use fail::{Error, Result};
use memmap::RegionMap;
use movelist::{Frag, Move, MoveSequence};
use region::RegionType;
use vec::TryPush;

use core::cmp;

/// The outcome of planning.
#[derive(Debug)]
pub struct Plan {
    /// The moves to execute, in order.
    pub sequence: MoveSequence,
    /// The memory map as seen by the executor once the sequence has run.
    ///
    /// Every final destination is `Allocated`, and the ranges zeroed by the tail of the sequence
    /// are `ZeroFill`.
    pub memmap: RegionMap,
}

/// Compute the move sequence performing `moves` within the memory described by `memmap`.
///
/// This is a shorthand for [`plan`](fn.plan.html), discarding the final map.
pub fn compute_move_sequence(moves: &[Move], memmap: &RegionMap) -> Result<MoveSequence> {
    plan(moves, memmap).map(|x| x.sequence)
}

/// Plan the moves.
///
/// `memmap` describes which memory may be used: `Free` and `ZeroFill` memory is fair game for
/// staging, `Terminal` memory is used for staging only when no free memory is left, and everything
/// else is off limits (except as a destination explicitly requested by a move).
///
/// Sequence layout
/// ===============
///
/// The resulting sequence consists of three parts:
///
/// 1. The main plan, in which every copy is moved into place, possibly by way of some staging
///    memory.
/// 2. The post-copies, which duplicate bytes that more than one move wanted to read.
/// 3. The zero-fills.
///
/// Zero-sized moves and copies onto themselves produce no output.
///
/// # Errors
///
/// `Error::InsufficientMemory` is returned if some destination can be neither claimed nor freed by
/// evicting the source occupying it. `Error::OutOfMemory` is returned if the bookkeeping itself
/// cannot grow. Nothing is returned but the error in either case.
pub fn plan(moves: &[Move], memmap: &RegionMap) -> Result<Plan> {
    let mut frags = Vec::new();
    let mut zeros = Vec::new();

    for i in moves {
        if i.len == 0 {
            continue;
        }

        match i.src {
            Some(src) => frags.try_push(Frag::new(i.dst, src, i.len)
                                            .ok_or(Error::InsufficientMemory)?)?,
            None => {
                if Block::new(i.dst, i.len).is_none() {
                    return Err(Error::InsufficientMemory);
                }

                zeros.try_push(*i)?;
            },
        }
    }

    let postcopy = dealias(&mut frags)?;

    // Memory which is to be zeroed anyway makes for fine staging space.
    let mut avail = memmap.dup()?;
    avail.retype(RegionType::ZeroFill, RegionType::Free);
    for i in &frags {
        avail.insert(i.src, i.len, RegionType::Allocated)?;
    }

    let mut mmap = memmap.dup()?;
    for i in &zeros {
        mmap.insert(i.dst, i.len, RegionType::ZeroFill)?;
    }

    let mut planner = Planner {
        frags: frags,
        avail: avail,
        mmap: mmap,
        out: Vec::new(),
    };

    planner.run()?;
    planner.finish(postcopy)
}

/// The state of a planning call.
struct Planner {
    /// The pending copies.
    ///
    /// No two sources overlap.
    frags: Vec<Frag>,
    /// The working map.
    ///
    /// Pending sources and claimed destinations are `Allocated`. Memory which may be written is
    /// `Free` (or `Terminal`).
    avail: RegionMap,
    /// The executor's map.
    mmap: RegionMap,
    /// The emitted moves.
    out: Vec<Move>,
}

impl Planner {
    /// Move every pending copy into place.
    ///
    /// Every iteration either commits at least one byte, or evicts the occupant of a critical
    /// byte, which makes the next iteration commit. Hence this terminates.
    fn run(&mut self) -> Result<()> {
        loop {
            self.drop_noops()?;

            if self.frags.is_empty() {
                return Ok(());
            }

            if let Some(ind) = self.find_ready() {
                let len = self.frags[ind].len;
                self.commit(ind, len)?;
            } else {
                self.resolve_first()?;
            }
        }
    }

    /// Remove the copies which are already in place.
    fn drop_noops(&mut self) -> Result<()> {
        let mut ind = 0;
        while ind < self.frags.len() {
            let frag = self.frags[ind];

            if frag.is_noop() {
                // Logging.
                log!(self.avail, "Dropping {:#x}[{:#x}] (already in place).", frag.dst, frag.len);

                self.mmap.insert(frag.dst, frag.len, RegionType::Allocated)?;
                self.frags.remove(ind);
            } else {
                ind += 1;
            }
        }

        Ok(())
    }

    /// Can `block` be claimed right now?
    #[inline]
    fn claimable(&self, block: Block) -> bool {
        self.avail.type_of(block.start(), block.size()).is_placeable()
    }

    /// Find the first copy which can be moved in one go.
    fn find_ready(&self) -> Option<usize> {
        self.frags.iter().position(|x| self.claimable(x.need().block))
    }

    /// Make progress on the first pending copy.
    ///
    /// This moves as much of it as can be claimed right away, or if nothing can, evicts whatever
    /// occupies its critical byte.
    fn resolve_first(&mut self) -> Result<()> {
        let need = self.frags[0].need();

        let run = if need.top {
            self.avail.placeable_until(need.block.last(), need.block.size())
        } else {
            self.avail.placeable_from(need.block.start(), need.block.size())
        };

        if run != 0 {
            return self.commit(0, run);
        }

        let critical = need.critical();
        let occupant = self.frags.iter().position(|x| x.src_block().contains(critical));
        match occupant {
            Some(ind) => self.evict(ind, need.block, critical),
            None => {
                // Logging.
                log!(self.avail, "Nothing can free {:#x}.", critical);

                Err(Error::InsufficientMemory)
            },
        }
    }

    /// Move `size` bytes of the copy at `ind` into place.
    ///
    /// If the copy is shifting upwards over itself, the top `size` bytes are moved. Otherwise the
    /// bottom `size` bytes are. The rest (if any) stays pending.
    ///
    /// The claimed destination must be placeable.
    fn commit(&mut self, ind: usize, size: u32) -> Result<()> {
        let frag = self.frags[ind];
        let need = frag.need();

        let (piece, claim, rest) = if size == frag.len {
            (frag, need.block, None)
        } else if need.top {
            let (rest, piece) = frag.split(frag.len - size);
            (piece, piece.dst_block(), Some(rest))
        } else {
            let (piece, rest) = frag.split(size);
            (piece, piece.dst_block(), Some(rest))
        };

        self.out.try_reserve(1)?;
        self.avail.insert(claim.start(), claim.size(), RegionType::Allocated)?;
        self.mmap.insert(piece.dst, piece.len, RegionType::Allocated)?;

        let freed = piece.freed();
        self.avail.insert(freed.start(), freed.size(), RegionType::Free)?;

        // Logging.
        log!(self.avail, "Committed {}.", piece.to_move());

        self.out.push(piece.to_move());
        match rest {
            Some(rest) => self.frags[ind] = rest,
            None => {
                self.frags.remove(ind);
            },
        }

        Ok(())
    }

    /// Get the copy at `ind` out of the way of `critical`.
    ///
    /// The copy is moved to its own destination if possible. Otherwise (part of) its source is
    /// staged in scratch memory, always including the critical byte.
    ///
    /// # Example
    ///
    /// When the scratch space is too small for the whole occupant, only a piece is staged:
    ///
    /// ```notrust
    ///     occupant |head|~~piece~~|tail|
    ///                      ^
    ///                   critical
    /// ```
    ///
    /// The head and tail stay pending as separate copies.
    fn evict(&mut self, ind: usize, blocked: Block, critical: Addr) -> Result<()> {
        let occ = self.frags[ind];

        if self.claimable(occ.need().block) {
            return self.commit(ind, occ.len);
        }

        let scratch = self.scratch(blocked)?;
        let size = cmp::min(scratch.size(), occ.len);
        let start = if size == occ.len {
            occ.src
        } else {
            cmp::min(critical, occ.src + (occ.len - size))
        };

        let mut piece = occ;
        let mut head = None;
        let mut tail = None;
        if start > piece.src {
            let (a, b) = piece.split(start - piece.src);
            head = Some(a);
            piece = b;
        }
        if size < piece.len {
            let (a, b) = piece.split(size);
            piece = a;
            tail = Some(b);
        }

        self.out.try_reserve(1)?;
        self.frags.try_reserve(2)?;
        self.avail.insert(scratch.start(), size, RegionType::Allocated)?;
        self.avail.insert(piece.src, size, RegionType::Free)?;

        // Logging.
        log!(self.avail, "Staging {:#x}[{:#x}] at {:#x} to free {:#x}.", piece.src, size,
             scratch.start(), critical);

        self.out.push(Move::copy(scratch.start(), piece.src, size));
        piece.src = scratch.start();

        self.frags[ind] = piece;
        if let Some(tail) = tail {
            self.frags.insert(ind + 1, tail);
        }
        if let Some(head) = head {
            self.frags.insert(ind, head);
        }

        Ok(())
    }

    /// Find staging memory.
    ///
    /// Free memory outside `blocked` is preferred, then any free memory. Terminal memory is only
    /// used when no free memory is left at all.
    fn scratch(&self, blocked: Block) -> Result<Block> {
        let mut fenced = self.avail.dup()?;
        fenced.insert(blocked.start(), blocked.size(), RegionType::Allocated)?;

        for &kind in &[RegionType::Free, RegionType::Terminal] {
            let found = fenced.find_largest(kind).or_else(|| self.avail.find_largest(kind));
            if let Some(block) = found {
                return Ok(block);
            }
        }

        // Logging.
        log!(self.avail, "No staging memory left.");

        Err(Error::InsufficientMemory)
    }

    /// Append the post-copies and zero-fills, and hand out the plan.
    fn finish(mut self, postcopy: Vec<Frag>) -> Result<Plan> {
        for i in &postcopy {
            self.mmap.insert(i.dst, i.len, RegionType::Allocated)?;

            if !i.is_noop() {
                self.out.try_push(i.to_move())?;
            }
        }

        for (region, last) in self.mmap.iter() {
            if region.kind != RegionType::ZeroFill {
                continue;
            }

            // A region can span all of memory, which one move cannot express.
            let mut start = region.start;
            let mut size = u64::from(last) - u64::from(start) + 1;
            while size != 0 {
                let len = cmp::min(size, u64::from(u32::max_value())) as u32;
                self.out.try_push(Move::zero(start, len))?;

                start = start.wrapping_add(len);
                size -= u64::from(len);
            }
        }

        Ok(Plan {
            sequence: MoveSequence::from_vec(self.out),
            memmap: self.mmap,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use region::RegionType::{Allocated, Free, ZeroFill};

    fn map(regions: &[(Addr, u32, RegionType)]) -> RegionMap {
        let mut map = RegionMap::new().unwrap();
        for &(start, len, kind) in regions {
            map.insert(start, len, kind).unwrap();
        }

        map
    }

    #[test]
    fn test_empty() {
        let plan = plan(&[], &map(&[(0x1000, 0x1000, Free)])).unwrap();

        assert!(plan.sequence.is_empty());
        assert_eq!(plan.memmap, map(&[(0x1000, 0x1000, Free)]));
    }

    #[test]
    fn test_noop() {
        let moves = [Move::copy(0x1000, 0x1000, 0x100), Move::copy(0x1800, 0x4000, 0)];
        let plan = plan(&moves, &map(&[(0x1000, 0x1000, Free)])).unwrap();

        assert!(plan.sequence.is_empty());
        assert_eq!(plan.memmap.type_of(0x1000, 0x100), Allocated);
        assert_eq!(plan.memmap.type_at(0x1100), Free);
    }

    #[test]
    fn test_disjoint() {
        let moves = [Move::copy(0x1000, 0x8000, 0x100)];
        let plan = plan(&moves, &map(&[(0x1000, 0x1000, Free)])).unwrap();

        assert_eq!(&*plan.sequence, [Move::copy(0x1000, 0x8000, 0x100)]);
        assert_eq!(plan.memmap.type_of(0x1000, 0x100), Allocated);
    }

    #[test]
    fn test_shift() {
        let memmap = map(&[(0x1000, 0x2000, Free)]);

        let up = [Move::copy(0x1100, 0x1000, 0x200)];
        assert_eq!(&*compute_move_sequence(&up, &memmap).unwrap(), up);

        let down = [Move::copy(0x1000, 0x1100, 0x200)];
        assert_eq!(&*compute_move_sequence(&down, &memmap).unwrap(), down);
    }

    #[test]
    fn test_swap() {
        let memmap = map(&[(0x1000, 0x200, Free), (0x4000, 0x1000, Free)]);
        let moves = [Move::copy(0x1000, 0x1100, 0x100), Move::copy(0x1100, 0x1000, 0x100)];

        assert_eq!(&*compute_move_sequence(&moves, &memmap).unwrap(), [
            Move::copy(0x4000, 0x1000, 0x100),
            Move::copy(0x1000, 0x1100, 0x100),
            Move::copy(0x1100, 0x4000, 0x100),
        ]);
    }

    #[test]
    fn test_postcopy_and_zero() {
        let memmap = map(&[(0x1000, 0x4000, Free), (0x6000, 0x100, ZeroFill)]);
        let moves = [
            Move::zero(0x3000, 0x80),
            Move::copy(0x1000, 0x8000, 0x100),
            Move::copy(0x2000, 0x8000, 0x100),
        ];

        let plan = plan(&moves, &memmap).unwrap();
        assert_eq!(&*plan.sequence, [
            Move::copy(0x1000, 0x8000, 0x100),
            Move::copy(0x2000, 0x1000, 0x100),
            Move::zero(0x3000, 0x80),
            Move::zero(0x6000, 0x100),
        ]);
        assert_eq!(plan.memmap.type_of(0x2000, 0x100), Allocated);
    }

    #[test]
    fn test_insufficient() {
        let memmap = map(&[(0x1000, 0x1000, Free)]);

        // Out of the map.
        assert_eq!(compute_move_sequence(&[Move::copy(0x1800, 0x8000, 0x1000)], &memmap),
                   Err(Error::InsufficientMemory));
        // Past the top of the address space.
        assert_eq!(compute_move_sequence(&[Move::copy(0xFFFF_FFF0, 0x1000, 0x20)], &memmap),
                   Err(Error::InsufficientMemory));
        assert_eq!(compute_move_sequence(&[Move::zero(0xFFFF_FFF0, 0x20)], &memmap),
                   Err(Error::InsufficientMemory));
    }
}
