//! Lock-free stderr writer for use inside a signal handler
//!
//! `std::io::stderr()` takes a reentrant lock that the faulting thread may
//! already hold. This writer goes straight to fd 2 instead.

use std::io;

pub(crate) struct RawStderr;

impl io::Write for RawStderr {
    #[cfg(unix)]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: write(2) is async-signal-safe and `buf` is valid for
        // `buf.len()` bytes.
        let n = unsafe {
            libc::write(
                libc::STDERR_FILENO,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    #[cfg(not(unix))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use std::io::Write;
        io::stderr().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
