//! Fault signal registration and the handler itself
//!
//! Everything reachable from `handle_fault` runs in signal context. It writes
//! to fd 2 through `RawStderr`, reads the configuration by taking it out of
//! its atomic slot, and never returns: the process always ends in `_exit`.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering::SeqCst;

use libc::c_int;

use super::stacktrace::{self, StackOptions};
use super::state;
use super::stderr::RawStderr;

/// Signals the crash guard intercepts
#[cfg(unix)]
pub const FAULT_SIGNALS: &[c_int] = &[
    libc::SIGSEGV,
    libc::SIGABRT,
    libc::SIGFPE,
    libc::SIGILL,
    libc::SIGBUS,
];

/// Signals the crash guard intercepts
#[cfg(windows)]
pub const FAULT_SIGNALS: &[c_int] = &[libc::SIGSEGV, libc::SIGABRT, libc::SIGFPE, libc::SIGILL];

/// Signals the crash guard intercepts
#[cfg(not(any(unix, windows)))]
pub const FAULT_SIGNALS: &[c_int] = &[];

/// Exit status used after a fault
pub fn exit_code(signum: c_int) -> i32 {
    128 + signum
}

/// Human readable name of a fault signal
pub fn signal_name(signum: c_int) -> &'static str {
    #[cfg(unix)]
    if signum == libc::SIGBUS {
        return "SIGBUS";
    }
    match signum {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGABRT => "SIGABRT",
        libc::SIGFPE => "SIGFPE",
        libc::SIGILL => "SIGILL",
        _ => "unknown signal",
    }
}

/// Usable size of the alternate signal stack mapped by [`install`].
///
/// Resolving symbols needs far more than the `SIGSTKSZ` bytes Rust gives
/// each thread. The mapping is lazily backed, so only touched pages count.
#[cfg(unix)]
pub const ALT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Install `handle_fault` for every signal in [`FAULT_SIGNALS`].
///
/// Best-effort: a signal the platform refuses is logged and skipped. The
/// large alternate stack only covers the calling thread; faults on other
/// threads run on Rust's default one.
pub(crate) fn install() {
    #[cfg(unix)]
    // SAFETY: the mapping is never unmapped, so the stack stays valid for
    // as long as the thread can take a signal.
    if let Err(e) = unsafe { create_alt_stack() } {
        log::warn!("Failed to set up the crash handler stack: {}", e);
    }

    for &signum in FAULT_SIGNALS {
        // SAFETY: `handle_fault` only performs the operations listed in the
        // module docs and never returns into the faulting code.
        match unsafe { register(signum) } {
            Ok(()) => log::trace!("Crash handler installed for {}", signal_name(signum)),
            Err(e) => log::warn!(
                "Failed to install crash handler for {}: {}",
                signal_name(signum),
                e
            ),
        }
    }
}

/// Map [`ALT_STACK_SIZE`] bytes plus a guard page and make them the calling
/// thread's signal stack. Replaces the stack std installed, which std still
/// frees on thread exit.
#[cfg(unix)]
pub(crate) unsafe fn create_alt_stack() -> io::Result<()> {
    let page_size = match libc::sysconf(libc::_SC_PAGESIZE) {
        n if n > 0 => n as usize,
        _ => 4096,
    };
    let size = std::cmp::max(libc::SIGSTKSZ, ALT_STACK_SIZE);
    let base = libc::mmap(
        std::ptr::null_mut(),
        size + page_size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANON,
        -1,
        0,
    );
    if base == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    // Stacks grow down: the lowest page catches an overflow
    if libc::mprotect(base, page_size, libc::PROT_NONE) != 0 {
        let err = io::Error::last_os_error();
        libc::munmap(base, size + page_size);
        return Err(err);
    }

    let stack = libc::stack_t {
        ss_sp: (base as *mut u8).add(page_size) as *mut libc::c_void,
        ss_flags: 0,
        ss_size: size,
    };
    if libc::sigaltstack(&stack, std::ptr::null_mut()) != 0 {
        let err = io::Error::last_os_error();
        libc::munmap(base, size + page_size);
        return Err(err);
    }
    Ok(())
}

#[cfg(unix)]
unsafe fn register(signum: c_int) -> io::Result<()> {
    let mut action: libc::sigaction = std::mem::zeroed();
    action.sa_sigaction = handle_fault as extern "C" fn(c_int) as libc::sighandler_t;
    // SA_NODEFER lets a nested fault of the same signal re-enter the handler
    // and take the fast exit, instead of the kernel killing us while the
    // signal is blocked. SA_ONSTACK runs it on the thread's alternate stack,
    // so stack overflows are still reported.
    action.sa_flags = libc::SA_NODEFER | libc::SA_ONSTACK;
    libc::sigemptyset(&mut action.sa_mask);
    if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
unsafe fn register(signum: c_int) -> io::Result<()> {
    // Only signal() is available here
    let previous = libc::signal(signum, handle_fault as extern "C" fn(c_int) as libc::sighandler_t);
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
unsafe fn register(_signum: c_int) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "fault signals are not supported on this platform",
    ))
}

extern "C" fn handle_fault(signum: c_int) {
    if state::HANDLING.swap(true, SeqCst) {
        // Fault while reporting an earlier one
        terminate(signum);
    }
    report(signum);
    terminate(signum);
}

fn report(signum: c_int) {
    let mut err = RawStderr;
    let _ = writeln!(
        err,
        "\n[hert-dump] crash signal: {} ({})",
        signum,
        signal_name(signum)
    );

    // SAFETY: HANDLING admits a single thread, and nothing else in the
    // process walks stacks while it is crashing.
    let _ = unsafe { stacktrace::write_stacktrace_unsynchronized(&mut err, &StackOptions::default()) };

    if let Some(dir) = state::take_core_dump_dir() {
        let _ = writeln!(
            err,
            "[hert-dump] core dump path: {}/core_{}",
            dir.display,
            std::process::id()
        );
    }

    if let Some(callback) = state::take_crash_callback() {
        if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
            let _ = err.write_all(b"[hert-dump] crash callback panicked\n");
        }
    }
}

fn terminate(signum: c_int) -> ! {
    // SAFETY: _exit is async-signal-safe. It skips atexit handlers and stdio
    // flushing, neither of which is sound mid-fault.
    unsafe { libc::_exit(exit_code(signum)) }
}
