//! Direct shim-based write for internal debugging.
//!
//! This is a non-allocating writing primitive, so it can be used while the planner is in the
//! middle of reshaping its own bookkeeping.

use core::fmt;

use sys;

/// A log writer.
///
/// This writes to `sys::log`. Planning is single-threaded, so no lock is taken around a line.
pub struct LogWriter {
    _private: (),
}

impl LogWriter {
    /// Standard error output.
    pub fn new() -> LogWriter {
        LogWriter {
            _private: (),
        }
    }
}

impl fmt::Write for LogWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if sys::log(s).is_err() {
            Err(fmt::Error)
        } else { Ok(()) }
    }
}
