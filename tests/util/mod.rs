//! Test automation.

#![allow(dead_code)]

use bootshuffle::{self, Addr, Move, MoveSequence, RegionMap, RegionType};

/// Build a region map from `(start, len, type)` triples, inserted in order.
pub fn build_map(entries: &[(Addr, u32, RegionType)]) -> RegionMap {
    let mut map = RegionMap::new().unwrap();
    for &(start, len, kind) in entries {
        map.insert(start, len, kind).unwrap();
    }

    map
}

/// A pseudorandom number generator based on `xorshift+`.
pub struct Rng {
    /// The state.
    state: [u64; 2],
}

impl Rng {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Rng {
        Rng {
            state: [0xBADF00D1 ^ seed, 0xDEADBEEF],
        }
    }

    /// Get a pseudorandom integer.
    pub fn get(&mut self) -> u64 {
        // Store the first and second part.
        let mut x = self.state[0];
        let y = self.state[1];

        // Put the second part into the first slot.
        self.state[0] = y;
        // Twist the first slot.
        x ^= x << 23;
        // Update the second slot.
        self.state[1] = x ^ y ^ (x >> 17) ^ (y >> 26);

        // Generate the final integer.
        self.state[1].wrapping_add(y)
    }

    /// Get a pseudorandom integer in `[lo, hi)`.
    pub fn range(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.get() % u64::from(hi - lo)) as u32
    }
}

/// A byte-addressable model of physical memory.
pub struct Memory {
    /// The bytes, starting at address zero.
    bytes: Vec<u8>,
}

impl Memory {
    /// Create `size` bytes of memory, filled with a non-zero pattern.
    pub fn new(size: usize) -> Memory {
        Memory {
            bytes: (0..size).map(|x| (x ^ (x >> 7) ^ (x >> 13)) as u8 | 1).collect(),
        }
    }

    /// Get a slice of memory.
    pub fn get(&self, start: Addr, len: u32) -> &[u8] {
        &self.bytes[start as usize..start as usize + len as usize]
    }

    /// Execute a sequence in order, the way the trampoline does.
    pub fn execute(&mut self, seq: &MoveSequence) {
        for i in seq {
            let dst = i.dst as usize;
            let len = i.len as usize;

            match i.src {
                Some(src) => self.bytes.copy_within(src as usize..src as usize + len, dst),
                None => {
                    for b in &mut self.bytes[dst..dst + len] {
                        *b = 0;
                    }
                },
            }
        }
    }

    /// Perform all of `moves` at once, reading every source from the current contents.
    ///
    /// Zero-fills are applied after the copies.
    pub fn ideal(&self, moves: &[Move]) -> Memory {
        let mut res = Memory {
            bytes: self.bytes.clone(),
        };

        for i in moves {
            let dst = i.dst as usize;
            let len = i.len as usize;

            if let Some(src) = i.src {
                let src = src as usize;
                res.bytes[dst..dst + len].copy_from_slice(&self.bytes[src..src + len]);
            }
        }
        for i in moves.iter().filter(|x| x.is_zero()) {
            for b in &mut res.bytes[i.dst as usize..i.dst as usize + i.len as usize] {
                *b = 0;
            }
        }

        res
    }
}

/// Plan `moves`, run the plan on `size` bytes of memory, and compare every destination against
/// the ideal outcome.
///
/// The sequence is returned for further inspection.
pub fn assert_executes(moves: &[Move], map: &RegionMap, size: usize) -> MoveSequence {
    let seq = bootshuffle::compute_move_sequence(moves, map)
        .unwrap_or_else(|e| panic!("Planning {:?} failed: {}", moves, e));

    let mut mem = Memory::new(size);
    let ideal = mem.ideal(moves);
    mem.execute(&seq);

    for i in moves {
        assert!(mem.get(i.dst, i.len) == ideal.get(i.dst, i.len),
                "Destination of {} corrupted by plan:\n{}", i, seq);
    }

    seq
}

/// Does `seq` write anywhere in `[start, start + len)`?
pub fn writes_to(seq: &MoveSequence, start: Addr, len: u32) -> bool {
    let end = u64::from(start) + u64::from(len);

    seq.iter().any(|x| {
        u64::from(x.dst) < end && u64::from(x.dst) + u64::from(x.len) > u64::from(start)
    })
}
