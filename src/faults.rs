//! Deliberate faults for exercising the crash guard

use std::os::raw::c_int;

use crate::cli::{CallbackKind, CrashKind};
use hert_core::CrashCallback;

fn signal_for(kind: CrashKind) -> Option<c_int> {
    match kind {
        CrashKind::Segv => Some(libc::SIGSEGV),
        CrashKind::Abort => Some(libc::SIGABRT),
        CrashKind::Fpe => Some(libc::SIGFPE),
        CrashKind::Ill => Some(libc::SIGILL),
        #[cfg(unix)]
        CrashKind::Bus => Some(libc::SIGBUS),
        #[cfg(not(unix))]
        CrashKind::Bus => Some(libc::SIGSEGV),
        CrashKind::Panic => None,
    }
}

/// Crash the way `kind` asks for. Panics for [`CrashKind::Panic`].
#[inline(never)]
pub fn trigger(kind: CrashKind) {
    log::warn!("Triggering {:?} crash", kind);
    match signal_for(kind) {
        Some(signum) => unsafe {
            libc::raise(signum);
        },
        None => panic!("requested panic in event loop"),
    }
}

/// Build the crash callback for `kind`
pub fn crash_callback(kind: CallbackKind) -> Option<CrashCallback> {
    match kind {
        CallbackKind::None => None,
        CallbackKind::Print => Some(Box::new(|| eprintln!("crash callback invoked"))),
        CallbackKind::Panic => Some(Box::new(|| panic!("crash callback failed"))),
        CallbackKind::Fault => Some(Box::new(|| unsafe {
            libc::raise(libc::SIGSEGV);
        })),
    }
}
