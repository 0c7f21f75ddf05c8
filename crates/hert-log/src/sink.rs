//! Log outputs
//!
//! Sinks are owned by the worker thread, so they are `Send` but never shared.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::level::LogLevel;
use crate::pattern::Pattern;
use crate::record::LogRecord;

/// A destination for formatted records
pub(crate) trait Sink: Send {
    fn set_pattern(&mut self, pattern: Pattern);

    /// Write one record; records below the sink's own level are skipped
    fn log(&mut self, record: &LogRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Writes to stdout, colouring the `%^..%$` range when stdout is a terminal
pub(crate) struct ConsoleSink {
    level: LogLevel,
    pattern: Pattern,
    color: bool,
    line: String,
}

impl ConsoleSink {
    pub(crate) fn new(level: LogLevel, pattern: Pattern) -> Self {
        Self {
            level,
            pattern,
            color: io::stdout().is_terminal(),
            line: String::with_capacity(256),
        }
    }
}

impl Sink for ConsoleSink {
    fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    fn log(&mut self, record: &LogRecord) -> io::Result<()> {
        if record.level < self.level {
            return Ok(());
        }
        self.line.clear();
        self.pattern.format(record, self.color, &mut self.line);
        self.line.push('\n');
        io::stdout().lock().write_all(self.line.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Writes to a file, rotating it by size.
///
/// With `max_files = 3` and base `hert.log`, a rotation moves `hert.2.log` to
/// `hert.3.log`, `hert.1.log` to `hert.2.log`, `hert.log` to `hert.1.log`
/// (dropping the previous `hert.3.log`) and reopens an empty `hert.log`.
pub(crate) struct RotatingFileSink {
    level: LogLevel,
    pattern: Pattern,
    path: PathBuf,
    max_size: u64,
    max_files: usize,
    file: BufWriter<File>,
    size: u64,
    line: String,
}

impl RotatingFileSink {
    pub(crate) fn new(
        path: &Path,
        level: LogLevel,
        pattern: Pattern,
        max_size: u64,
        max_files: usize,
    ) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            level,
            pattern,
            path: path.to_path_buf(),
            max_size,
            max_files,
            file: BufWriter::new(file),
            size,
            line: String::with_capacity(256),
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        for index in (1..=self.max_files).rev() {
            let src = if index == 1 {
                self.path.clone()
            } else {
                rotated_path(&self.path, index - 1)
            };
            if !src.exists() {
                continue;
            }
            let dst = rotated_path(&self.path, index);
            if dst.exists() {
                fs::remove_file(&dst)?;
            }
            fs::rename(&src, &dst)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file = BufWriter::new(file);
        self.size = 0;
        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    fn log(&mut self, record: &LogRecord) -> io::Result<()> {
        if record.level < self.level {
            return Ok(());
        }
        self.line.clear();
        self.pattern.format(record, false, &mut self.line);
        self.line.push('\n');

        let len = self.line.len() as u64;
        if self.size > 0 && self.size + len > self.max_size {
            self.rotate()?;
        }
        self.file.write_all(self.line.as_bytes())?;
        self.size += len;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// `dir/base.ext` -> `dir/base.N.ext`
pub(crate) fn rotated_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}.{}", stem, index),
    };
    path.with_file_name(name)
}
