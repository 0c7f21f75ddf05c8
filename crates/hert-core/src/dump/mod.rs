//! Crash guard
//!
//! Installs handlers for fatal signals (SIGSEGV, SIGABRT, SIGFPE, SIGILL and
//! SIGBUS where it exists). When one arrives the handler:
//! 1. Exits immediately with `128 + signal` if a fault is already being handled
//! 2. Prints a banner and a stack trace to stderr
//! 3. Prints the conventional core file path if a directory was recorded
//! 4. Runs the crash callback, if any
//! 5. Exits with `128 + signal` without running destructors or flushing stdio
//!
//! The core dump directory is informational: it is created eagerly but the
//! guard never writes into it.

mod handler;
mod stacktrace;
mod state;
mod stderr;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering::SeqCst;

pub use handler::{exit_code, signal_name, FAULT_SIGNALS};
pub use stacktrace::{print_stacktrace, write_stacktrace, StackOptions, MAX_FRAMES, SNIPPET_CONTEXT};
pub use state::CrashCallback;

use state::{CoreDumpDir, INITIALIZED};

/// Record `core_dump_dir` and install the fault handlers.
///
/// Only the first call has any effect. Later calls neither reinstall the
/// handlers nor change the directory, whatever they pass; use
/// [`set_core_dump_dir`] to change it afterwards. Pass `""` to record no
/// directory.
pub fn init(core_dump_dir: impl AsRef<Path>) {
    if INITIALIZED
        .compare_exchange(false, true, SeqCst, SeqCst)
        .is_err()
    {
        return;
    }
    set_core_dump_dir(core_dump_dir);
    handler::install();
    log::debug!("Crash guard initialized");
}

/// Whether [`init`] has run
pub fn is_initialized() -> bool {
    INITIALIZED.load(SeqCst)
}

/// Replace the recorded core dump directory.
///
/// An empty path clears it. A non-empty path is created along with its
/// parents; failures are logged, never returned.
pub fn set_core_dump_dir(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        state::replace_core_dump_dir(None);
        return;
    }

    state::replace_core_dump_dir(Some(CoreDumpDir::new(dir)));
    if let Err(e) = fs::create_dir_all(dir) {
        log::warn!(
            "Failed to create core dump directory {}: {}",
            dir.display(),
            e
        );
    }
}

/// The recorded core dump directory, if any
pub fn core_dump_dir() -> Option<PathBuf> {
    state::core_dump_dir()
}

/// Where a core file for this process would conventionally go: `<dir>/core_<pid>`
pub fn core_dump_path() -> Option<PathBuf> {
    core_dump_dir().map(|dir| dir.join(format!("core_{}", std::process::id())))
}

/// Replace the crash callback; `None` removes it.
///
/// The callback is not invoked here. On a fault it runs once, after the
/// stack trace has been printed. A panic inside it is caught and the process
/// still exits with the signal status.
pub fn set_crash_callback(callback: Option<CrashCallback>) {
    state::replace_crash_callback(callback);
}

/// Whether a crash callback is currently set
pub fn has_crash_callback() -> bool {
    state::has_crash_callback()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    // The guard is process-wide; tests touching it run one at a time
    static GUARD_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn counting_callback(counter: &Arc<AtomicUsize>) -> CrashCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, SeqCst);
        })
    }

    #[test]
    fn test_init_is_idempotent() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");

        init(&first);
        assert!(is_initialized());
        init(&second);
        init("");

        assert_eq!(core_dump_dir(), Some(first.clone()));
        assert!(first.is_dir());
        assert!(!second.exists());
    }

    #[test]
    fn test_init_without_directory() {
        let _lock = GUARD_LOCK.lock();
        state::reset();

        init("");
        assert!(is_initialized());
        assert_eq!(core_dump_dir(), None);
        assert_eq!(core_dump_path(), None);
    }

    #[test]
    fn test_set_core_dump_dir_creates_parents() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();
        let deep = tmp.path().join("very/deep/nonexistent/path/for/cores");

        set_core_dump_dir(&deep);
        assert!(deep.is_dir());
        assert_eq!(core_dump_dir(), Some(deep));
    }

    #[test]
    fn test_set_core_dump_dir_empty_clears() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();

        set_core_dump_dir(tmp.path());
        assert!(core_dump_dir().is_some());
        set_core_dump_dir("");
        assert_eq!(core_dump_dir(), None);
    }

    #[test]
    fn test_set_core_dump_dir_after_init() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();
        let later = tmp.path().join("later");

        init(tmp.path().join("initial"));
        set_core_dump_dir(&later);
        assert_eq!(core_dump_dir(), Some(later));
    }

    #[test]
    fn test_set_core_dump_dir_unicode_and_spaces() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();
        let special = tmp.path().join("dir with spaces_特殊字符");

        set_core_dump_dir(&special);
        assert!(special.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_core_dump_dir_failure_is_not_fatal() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();
        let below_file = file.join("cores");

        set_core_dump_dir(&below_file);
        assert!(!below_file.exists());
        // Still recorded, the directory is informational
        assert_eq!(core_dump_dir(), Some(below_file));
    }

    #[test]
    fn test_core_dump_path_uses_pid() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let tmp = tempfile::tempdir().unwrap();

        set_core_dump_dir(tmp.path());
        let expected = tmp.path().join(format!("core_{}", std::process::id()));
        assert_eq!(core_dump_path(), Some(expected));
    }

    #[test]
    fn test_crash_callback_last_write_wins() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        set_crash_callback(Some(counting_callback(&first)));
        set_crash_callback(Some(counting_callback(&second)));
        assert!(has_crash_callback());

        let callback = state::take_crash_callback().unwrap();
        callback();
        assert_eq!(first.load(SeqCst), 0);
        assert_eq!(second.load(SeqCst), 1);
    }

    #[test]
    fn test_crash_callback_replacement_drops_previous() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let counter = Arc::new(AtomicUsize::new(0));

        set_crash_callback(Some(counting_callback(&counter)));
        assert_eq!(Arc::strong_count(&counter), 2);
        set_crash_callback(None);
        assert_eq!(Arc::strong_count(&counter), 1);
    }

    #[test]
    fn test_crash_callback_none_clears() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let counter = Arc::new(AtomicUsize::new(0));

        set_crash_callback(Some(counting_callback(&counter)));
        set_crash_callback(None);
        assert!(!has_crash_callback());
        assert!(state::take_crash_callback().is_none());
        assert_eq!(counter.load(SeqCst), 0);
    }

    #[test]
    fn test_crash_callback_is_not_invoked_on_set() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let counter = Arc::new(AtomicUsize::new(0));

        set_crash_callback(Some(counting_callback(&counter)));
        assert_eq!(counter.load(SeqCst), 0);
        set_crash_callback(None);
    }

    #[test]
    fn test_crash_callback_set_from_many_threads() {
        let _lock = GUARD_LOCK.lock();
        state::reset();
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        set_crash_callback(Some(counting_callback(&counter)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(has_crash_callback());
        // Exactly one callback survives, the rest were dropped
        assert_eq!(Arc::strong_count(&counter), 2);
        set_crash_callback(None);
    }

    #[test]
    fn test_print_stacktrace_repeatedly() {
        for _ in 0..20 {
            print_stacktrace();
        }
    }

    #[inline(never)]
    fn capture_from_here() -> String {
        let mut out = Vec::new();
        let options = StackOptions {
            snippets: false,
            ..StackOptions::default()
        };
        write_stacktrace(&mut out, &options).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_stacktrace_starts_at_caller() {
        let text = capture_from_here();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Stack trace (most recent call first):"));

        let first = lines.find(|l| l.starts_with('#')).unwrap();
        assert!(first.starts_with("#0"));
        assert!(!first.contains("backtrace::"), "{}", first);
        assert!(text.contains("capture_from_here"), "{}", text);
    }

    #[test]
    fn test_stacktrace_repeated_capture_is_stable() {
        let first = capture_from_here();
        for _ in 0..50 {
            let again = capture_from_here();
            assert!(again.starts_with("Stack trace"));
            assert_eq!(
                again.lines().filter(|l| l.starts_with('#')).count(),
                first.lines().filter(|l| l.starts_with('#')).count()
            );
        }
    }
}
