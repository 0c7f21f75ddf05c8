//! Process-wide crash guard state
//!
//! Values the fault handler reads live behind `AtomicPtr`s holding
//! `Box::into_raw` pointers (or null). Mutexes cannot be used inside the
//! handler, so ordinary threads serialize on `SLOT_LOCK` and free the value
//! they replace, while the handler removes the current value with
//! `swap(null)` and never frees it. Either the writer sees the old value and
//! the handler sees the new one, or the handler owns the value and the writer
//! finds the slot empty.
//!
//! The state is never torn down; it lives until the process exits.

use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::atomic::{AtomicBool, AtomicPtr};

use parking_lot::Mutex;

/// Callback invoked once while handling a fault, right before the process exits
pub type CrashCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// A recorded core dump directory
pub(crate) struct CoreDumpDir {
    pub path: PathBuf,
    /// Rendered once so the handler can print it without allocating
    pub display: String,
}

impl CoreDumpDir {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            display: path.display().to_string(),
        }
    }
}

/// Set by the first `init`
pub(crate) static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Set by the first fault to reach the handler
pub(crate) static HANDLING: AtomicBool = AtomicBool::new(false);

static CORE_DUMP_DIR: AtomicPtr<CoreDumpDir> = AtomicPtr::new(ptr::null_mut());
static CRASH_CALLBACK: AtomicPtr<CrashCallback> = AtomicPtr::new(ptr::null_mut());

static SLOT_LOCK: Mutex<()> = parking_lot::const_mutex(());

fn replace<T>(slot: &AtomicPtr<T>, value: Option<T>) {
    let _guard = SLOT_LOCK.lock();
    let new = value.map_or(ptr::null_mut(), |v| Box::into_raw(Box::new(v)));
    let old = slot.swap(new, SeqCst);
    if !old.is_null() {
        // SAFETY: non-null slot values come from `Box::into_raw` above. The
        // handler only ever removes values, so nobody else can free `old`.
        drop(unsafe { Box::from_raw(old) });
    }
}

/// Take the current value out of a slot, leaking it. Handler use only.
fn take<T>(slot: &AtomicPtr<T>) -> Option<&'static T> {
    let p = slot.swap(ptr::null_mut(), SeqCst);
    // SAFETY: the pointer came from `Box::into_raw` and is now owned by us;
    // it is never freed.
    unsafe { p.as_ref() }
}

pub(crate) fn replace_core_dump_dir(dir: Option<CoreDumpDir>) {
    replace(&CORE_DUMP_DIR, dir);
}

pub(crate) fn replace_crash_callback(callback: Option<CrashCallback>) {
    replace(&CRASH_CALLBACK, callback);
}

pub(crate) fn core_dump_dir() -> Option<PathBuf> {
    let _guard = SLOT_LOCK.lock();
    // SAFETY: writers free values only while holding SLOT_LOCK
    unsafe { CORE_DUMP_DIR.load(SeqCst).as_ref() }.map(|dir| dir.path.clone())
}

pub(crate) fn has_crash_callback() -> bool {
    !CRASH_CALLBACK.load(SeqCst).is_null()
}

pub(crate) fn take_core_dump_dir() -> Option<&'static CoreDumpDir> {
    take(&CORE_DUMP_DIR)
}

pub(crate) fn take_crash_callback() -> Option<&'static CrashCallback> {
    take(&CRASH_CALLBACK)
}

#[cfg(test)]
pub(crate) fn reset() {
    INITIALIZED.store(false, SeqCst);
    HANDLING.store(false, SeqCst);
    replace_core_dump_dir(None);
    replace_crash_callback(None);
}
