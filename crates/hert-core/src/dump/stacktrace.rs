//! Stack capture and rendering
//!
//! Frames are resolved and written one at a time while the stack is being
//! walked, so nothing is collected up front. The same renderer serves manual
//! `print_stacktrace()` calls and the fault handler; the handler uses the
//! unsynchronized walker because the faulting thread may hold the
//! backtrace lock.
//!
//! Output looks like:
//!
//! ```text
//! Stack trace (most recent call first):
//! #0   0x000055d4c3a1b2c0 in hello_hert::faults::trigger
//!          at src/faults.rs:41:9
//!                39 | ...
//!          >     41 | ...
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Upper bound on the number of entries printed
pub const MAX_FRAMES: usize = 128;

/// Lines of source shown on each side of the reported line
pub const SNIPPET_CONTEXT: u32 = 2;

/// Symbol prefixes that belong to the capture machinery itself. Leading
/// frames matching these are skipped.
const MACHINERY_PREFIXES: &[&str] = &[
    "backtrace::",
    "<backtrace::",
    "core::ops::function::",
    "<&mut F as core::ops::function::",
    "hert_core::dump::stacktrace::",
    "<hert_core::dump::stacktrace::",
    "hert_core::dump::handler::",
];

/// Options for rendering a stack trace
#[derive(Debug, Clone)]
pub struct StackOptions {
    /// Print source lines around each resolved location when the file is readable
    pub snippets: bool,
    /// Stop after this many entries
    pub max_frames: usize,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            snippets: true,
            max_frames: MAX_FRAMES,
        }
    }
}

/// Capture the current stack and print it to stderr
pub fn print_stacktrace() {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    let _ = write_stacktrace(&mut out, &StackOptions::default());
    let _ = out.flush();
}

/// Capture the current stack and write it to `out`
pub fn write_stacktrace<W: Write>(out: &mut W, options: &StackOptions) -> io::Result<()> {
    render(out, options, true)
}

/// Like [`write_stacktrace`], without taking the backtrace lock.
///
/// # Safety
///
/// No other thread may be walking or resolving a stack through the
/// `backtrace` crate at the same time. The fault handler guarantees this for
/// itself by only ever running once.
pub(crate) unsafe fn write_stacktrace_unsynchronized<W: Write>(
    out: &mut W,
    options: &StackOptions,
) -> io::Result<()> {
    render(out, options, false)
}

fn render<W: Write>(out: &mut W, options: &StackOptions, synchronized: bool) -> io::Result<()> {
    writeln!(out, "Stack trace (most recent call first):")?;

    let mut printer = FramePrinter {
        out,
        options,
        synchronized,
        index: 0,
        skipping: true,
        error: None,
    };
    let mut visit = |frame: &backtrace::Frame| printer.visit(frame);
    if synchronized {
        backtrace::trace(&mut visit);
    } else {
        // SAFETY: forwarded from write_stacktrace_unsynchronized
        unsafe { backtrace::trace_unsynchronized(&mut visit) };
    }

    match printer.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct FramePrinter<'a, W> {
    out: &'a mut W,
    options: &'a StackOptions,
    synchronized: bool,
    index: usize,
    skipping: bool,
    error: Option<io::Error>,
}

impl<W: Write> FramePrinter<'_, W> {
    /// Handle one frame; returns false to stop the walk
    fn visit(&mut self, frame: &backtrace::Frame) -> bool {
        let ip = frame.ip() as usize;
        let synchronized = self.synchronized;
        let mut resolved = false;
        let mut first_symbol = true;

        let mut on_symbol = |symbol: &backtrace::Symbol| {
            resolved = true;
            if self.error.is_some() || self.index >= self.options.max_frames {
                return;
            }
            if self.skipping && is_machinery(symbol) {
                return;
            }
            self.skipping = false;
            let inlined = !first_symbol;
            first_symbol = false;
            if let Err(e) = self.write_symbol(ip, symbol, inlined) {
                self.error = Some(e);
            }
        };

        if synchronized {
            backtrace::resolve_frame(frame, &mut on_symbol);
        } else {
            // SAFETY: only reached from the unsynchronized walk
            unsafe { backtrace::resolve_frame_unsynchronized(frame, &mut on_symbol) };
        }

        if !resolved && self.error.is_none() && self.index < self.options.max_frames {
            self.skipping = false;
            if let Err(e) = self.write_unknown(ip) {
                self.error = Some(e);
            }
        }

        self.error.is_none() && self.index < self.options.max_frames
    }

    fn write_symbol(&mut self, ip: usize, symbol: &backtrace::Symbol, inlined: bool) -> io::Result<()> {
        if inlined {
            write!(self.out, "#{:<3} {:>18} in ", self.index, "(inlined)")?;
        } else {
            write!(self.out, "#{:<3} {:#018x} in ", self.index, ip)?;
        }
        match symbol.name() {
            Some(name) => writeln!(self.out, "{:#}", name)?,
            None => writeln!(self.out, "<unknown>")?,
        }
        self.index += 1;

        let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
            return Ok(());
        };
        match symbol.colno() {
            Some(col) => writeln!(self.out, "         at {}:{}:{}", file.display(), line, col)?,
            None => writeln!(self.out, "         at {}:{}", file.display(), line)?,
        }
        if self.options.snippets {
            write_snippet(&mut *self.out, file, line, SNIPPET_CONTEXT)?;
        }
        Ok(())
    }

    fn write_unknown(&mut self, ip: usize) -> io::Result<()> {
        writeln!(self.out, "#{:<3} {:#018x} in <unknown>", self.index, ip)?;
        self.index += 1;
        Ok(())
    }
}

fn is_machinery(symbol: &backtrace::Symbol) -> bool {
    let Some(name) = symbol.name() else {
        return false;
    };
    let mut buf = NameBuf::new();
    let _ = fmt::write(&mut buf, format_args!("{:#}", name));
    let name = buf.as_str();
    MACHINERY_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Fixed-size buffer for symbol prefixes; truncates instead of allocating
struct NameBuf {
    buf: [u8; 128],
    len: usize,
}

impl NameBuf {
    fn new() -> Self {
        Self {
            buf: [0; 128],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        let bytes = &self.buf[..self.len];
        match std::str::from_utf8(bytes) {
            Ok(s) => s,
            // Truncation may split a character
            Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl fmt::Write for NameBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let n = s.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

/// Write the lines around `line` (1-based) from `path`.
///
/// Unreadable files are skipped silently: source is often not shipped with
/// the binary.
pub(crate) fn write_snippet<W: Write + ?Sized>(
    out: &mut W,
    path: &Path,
    line: u32,
    context: u32,
) -> io::Result<()> {
    let Ok(file) = File::open(path) else {
        return Ok(());
    };
    let first = line.saturating_sub(context).max(1);
    let last = line.saturating_add(context);

    let mut reader = BufReader::new(file);
    let mut text = Vec::new();
    let mut current = 0u32;
    loop {
        text.clear();
        match reader.read_until(b'\n', &mut text) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        current += 1;
        if current < first {
            continue;
        }
        if current > last {
            break;
        }
        while matches!(text.last(), Some(b'\n' | b'\r')) {
            text.pop();
        }
        let marker = if current == line { '>' } else { ' ' };
        write!(out, "         {} {:>5} | ", marker, current)?;
        out.write_all(&text)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_file(lines: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 1..=lines {
            writeln!(file, "line {}", i).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_snippet_marks_target_line() {
        let file = numbered_file(10);
        let mut out = Vec::new();
        write_snippet(&mut out, file.path(), 5, 2).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("3 | line 3"));
        assert!(lines[2].contains('>'));
        assert!(lines[2].ends_with("5 | line 5"));
        assert!(!lines[1].contains('>'));
        assert!(lines[4].ends_with("7 | line 7"));
    }

    #[test]
    fn test_snippet_clamps_at_file_start() {
        let file = numbered_file(10);
        let mut out = Vec::new();
        write_snippet(&mut out, file.path(), 1, 2).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains('>'));
        assert!(lines[0].ends_with("1 | line 1"));
    }

    #[test]
    fn test_snippet_clamps_at_file_end() {
        let file = numbered_file(4);
        let mut out = Vec::new();
        write_snippet(&mut out, file.path(), 4, 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_snippet_missing_file_is_silent() {
        let mut out = Vec::new();
        write_snippet(&mut out, Path::new("/nonexistent/hert/source.rs"), 3, 2).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_name_buf_truncates() {
        let mut buf = NameBuf::new();
        let long = "x".repeat(300);
        fmt::write(&mut buf, format_args!("{}", long)).unwrap();
        assert_eq!(buf.as_str().len(), 128);
    }

    #[test]
    fn test_name_buf_truncates_on_char_boundary() {
        let mut buf = NameBuf::new();
        let text = format!("{}é", "a".repeat(127));
        fmt::write(&mut buf, format_args!("{}", text)).unwrap();
        assert_eq!(buf.as_str(), "a".repeat(127));
    }

    #[test]
    fn test_max_frames_bounds_output() {
        let mut out = Vec::new();
        let options = StackOptions {
            snippets: false,
            max_frames: 2,
        };
        write_stacktrace(&mut out, &options).unwrap();
        let text = String::from_utf8(out).unwrap();
        let entries = text.lines().filter(|l| l.starts_with('#')).count();
        assert!(entries <= 2);
    }
}
