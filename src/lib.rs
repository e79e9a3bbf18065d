//! **Bootshuffle:** memory bookkeeping and relocation planning for boot loaders.
//!
//! Before a boot loader jumps into an operating system image, it must put the kernel, the initial
//! ramdisk, the command line, and various tables exactly where the target expects them. The
//! source and destination ranges frequently overlap each other, and free memory to stage through
//! is scarce.
//!
//! This crate provides the two pieces needed to sort this out: a typed map of the 32-bit physical
//! address space (`RegionMap`), and a planner turning a set of wanted copies into an ordered
//! sequence of primitive moves, which a dumb copy engine can execute (`plan`). The sequence can be
//! lowered into the descriptor table of the real-mode trampoline with the `shuffle` module.

#![no_std]

#![warn(missing_docs)]

extern crate alloc;
#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(all(feature = "write", not(target_os = "redox")))]
extern crate libc;

#[macro_use]
mod log;
#[cfg(feature = "write")]
mod write;

mod block;
mod dealias;
mod memmap;
mod movelist;
mod planner;
mod region;
#[cfg(feature = "write")]
mod sys;
mod vec;
pub mod fail;
pub mod shuffle;

pub use block::{align_down, align_up, Addr, Block};
pub use fail::{Error, Result};
pub use memmap::{Iter, Placement, RegionMap};
pub use movelist::{Move, MoveSequence};
pub use planner::{compute_move_sequence, plan, Plan};
pub use region::{Region, RegionType};
