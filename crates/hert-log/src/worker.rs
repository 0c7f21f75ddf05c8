//! Background writer thread
//!
//! Every command travels through one bounded FIFO queue, so a flush or
//! shutdown observes all records queued before it.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::level::LogLevel;
use crate::pattern::Pattern;
use crate::record::LogRecord;
use crate::sink::Sink;

/// Queue depth; producers block when it is full
pub(crate) const QUEUE_CAPACITY: usize = 8192;

/// Records at or above this level flush the sinks right after writing
const FLUSH_LEVEL: LogLevel = LogLevel::Error;

enum Command {
    Record(LogRecord),
    SetPattern(Pattern),
    Flush(Sender<()>),
    Shutdown,
}

pub(crate) struct Worker {
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn start(sinks: Vec<Box<dyn Sink>>) -> io::Result<Self> {
        let (sender, receiver) = channel::bounded(QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("hert-log".into())
            .spawn(move || run(sinks, receiver))?;

        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    pub(crate) fn send(&self, record: LogRecord) {
        let _ = self.sender.send(Command::Record(record));
    }

    pub(crate) fn set_pattern(&self, pattern: Pattern) {
        let _ = self.sender.send(Command::SetPattern(pattern));
    }

    /// Block until everything queued so far is written and flushed
    pub(crate) fn flush(&self) {
        let (ack, done) = channel::bounded(1);
        if self.sender.send(Command::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Drain the queue and join the thread
    pub(crate) fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut sinks: Vec<Box<dyn Sink>>, receiver: Receiver<Command>) {
    for command in receiver.iter() {
        match command {
            Command::Record(record) => {
                for sink in sinks.iter_mut() {
                    if let Err(e) = sink.log(&record) {
                        eprintln!("[hert-log] failed to write record: {}", e);
                    }
                }
                if record.level >= FLUSH_LEVEL {
                    flush_all(&mut sinks);
                }
            }
            Command::SetPattern(pattern) => {
                for sink in sinks.iter_mut() {
                    sink.set_pattern(pattern.clone());
                }
            }
            Command::Flush(ack) => {
                flush_all(&mut sinks);
                let _ = ack.send(());
            }
            Command::Shutdown => break,
        }
    }
    flush_all(&mut sinks);
}

fn flush_all(sinks: &mut [Box<dyn Sink>]) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.flush() {
            eprintln!("[hert-log] failed to flush sink: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Captured {
        lines: Vec<String>,
        flushes: usize,
    }

    struct MemorySink {
        pattern: Pattern,
        out: Arc<Mutex<Captured>>,
    }

    impl Sink for MemorySink {
        fn set_pattern(&mut self, pattern: Pattern) {
            self.pattern = pattern;
        }

        fn log(&mut self, record: &LogRecord) -> io::Result<()> {
            let mut line = String::new();
            self.pattern.format(record, false, &mut line);
            self.out.lock().lines.push(line);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.out.lock().flushes += 1;
            Ok(())
        }
    }

    fn worker() -> (Worker, Arc<Mutex<Captured>>) {
        let out = Arc::new(Mutex::new(Captured::default()));
        let sink = MemorySink {
            pattern: Pattern::parse("%v").unwrap(),
            out: out.clone(),
        };
        (Worker::start(vec![Box::new(sink)]).unwrap(), out)
    }

    #[test]
    fn test_flush_waits_for_queued_records() {
        let (worker, out) = worker();
        for i in 0..1000 {
            worker.send(LogRecord::new(LogLevel::Info, i.to_string()));
        }
        worker.flush();

        let captured = out.lock();
        assert_eq!(captured.lines.len(), 1000);
        assert_eq!(captured.lines[999], "999");
    }

    #[test]
    fn test_error_records_flush() {
        let (worker, out) = worker();
        worker.send(LogRecord::new(LogLevel::Info, "a"));
        worker.send(LogRecord::new(LogLevel::Error, "b"));
        worker.flush();

        // one flush for the error record, one for the explicit flush
        assert_eq!(out.lock().flushes, 2);
    }

    #[test]
    fn test_pattern_change_is_ordered() {
        let (worker, out) = worker();
        worker.send(LogRecord::new(LogLevel::Info, "before"));
        worker.set_pattern(Pattern::parse("%l: %v").unwrap());
        worker.send(LogRecord::new(LogLevel::Info, "after"));
        worker.flush();

        assert_eq!(out.lock().lines, vec!["before", "info: after"]);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let (worker, out) = worker();
        for i in 0..100 {
            worker.send(LogRecord::new(LogLevel::Debug, i.to_string()));
        }
        worker.shutdown();

        assert_eq!(out.lock().lines.len(), 100);
    }
}
