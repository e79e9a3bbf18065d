//! System primitives.

/// The file descriptor log lines are written to.
#[cfg(not(target_os = "redox"))]
const LOG_TARGET: i32 = 2;

/// Write text to the log.
///
/// This points to stderr. Short writes are retried until the whole string is out.
#[cfg(not(target_os = "redox"))]
pub fn log(s: &str) -> Result<(), ()> {
    let mut bytes = s.as_bytes();

    while !bytes.is_empty() {
        let res = unsafe {
            ::libc::write(LOG_TARGET, bytes.as_ptr() as *const ::libc::c_void, bytes.len())
        };

        if res <= 0 {
            return Err(());
        }

        bytes = &bytes[res as usize..];
    }

    Ok(())
}

/// Write text to the log.
///
/// There is no log target on this platform, so this always fails.
#[cfg(target_os = "redox")]
pub fn log(_s: &str) -> Result<(), ()> {
    Err(())
}
