//! Event-loop host
//!
//! [`Application`] runs a queue of events on the thread that calls
//! [`Application::exec`]. Other threads reach the loop through an
//! [`EventProxy`]. A panic escaping any event is treated as fatal: it is
//! logged, logging is flushed and the process exits with status 1.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel::{self, Receiver, Sender};

/// Work to run on the event-loop thread
pub type Event = Box<dyn FnOnce(&mut AppContext) + Send + 'static>;

/// Exit status after a panic in the event loop
pub const PANIC_EXIT_CODE: i32 = 1;

enum Message {
    Event(Event),
    Quit(i32),
}

/// Handle for posting events from any thread
#[derive(Clone)]
pub struct EventProxy {
    sender: Sender<Message>,
}

impl EventProxy {
    /// Queue `event`; returns false once the loop has finished
    pub fn post<F>(&self, event: F) -> bool
    where
        F: FnOnce(&mut AppContext) + Send + 'static,
    {
        self.sender.send(Message::Event(Box::new(event))).is_ok()
    }

    /// Ask the loop to exit with `code` after the events already queued
    pub fn quit(&self, code: i32) -> bool {
        self.sender.send(Message::Quit(code)).is_ok()
    }
}

/// What an event may do to the loop running it
pub struct AppContext {
    posted: Vec<Event>,
    quit: Option<i32>,
}

impl AppContext {
    fn new() -> Self {
        Self {
            posted: Vec::new(),
            quit: None,
        }
    }

    /// Queue a follow-up event, run after those already pending locally
    pub fn post<F>(&mut self, event: F)
    where
        F: FnOnce(&mut AppContext) + Send + 'static,
    {
        self.posted.push(Box::new(event));
    }

    /// Stop the loop with `code` once this event returns
    pub fn quit(&mut self, code: i32) {
        self.quit = Some(code);
    }
}

#[derive(Default)]
struct Dispatcher {
    pending: VecDeque<Event>,
    exit_code: Option<i32>,
}

impl Dispatcher {
    fn notify(&mut self, event: Event) -> bool {
        let mut ctx = AppContext::new();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| event(&mut ctx))) {
            abort_on_panic(payload.as_ref());
        }

        self.pending.extend(ctx.posted);
        match ctx.quit {
            Some(code) => {
                self.exit_code.get_or_insert(code);
                true
            }
            None => false,
        }
    }
}

/// An application with a single-threaded event loop
pub struct Application {
    name: String,
    version: String,
    args: Vec<String>,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    dispatcher: Dispatcher,
}

impl Application {
    pub fn new(args: Vec<String>) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            name: String::new(),
            version: String::new(),
            args,
            sender,
            receiver,
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn proxy(&self) -> EventProxy {
        EventProxy {
            sender: self.sender.clone(),
        }
    }

    /// Dispatch one event now, on the calling thread.
    ///
    /// Returns whether the event asked the loop to quit. Does not return if
    /// the event panics.
    pub fn notify(&mut self, event: Event) -> bool {
        self.dispatcher.notify(event)
    }

    /// Run until an event or proxy requests quit, or until every proxy is
    /// gone and no event is pending (exit code 0).
    pub fn exec(self) -> i32 {
        let Application {
            name,
            sender,
            receiver,
            mut dispatcher,
            ..
        } = self;
        drop(sender);

        log::debug!("Entering event loop for {:?}", name);
        loop {
            if let Some(code) = dispatcher.exit_code {
                log::debug!("Event loop finished with code {}", code);
                return code;
            }

            let event = match dispatcher.pending.pop_front() {
                Some(event) => event,
                None => match receiver.recv() {
                    Ok(Message::Event(event)) => event,
                    Ok(Message::Quit(code)) => {
                        dispatcher.exit_code.get_or_insert(code);
                        continue;
                    }
                    Err(_) => {
                        log::debug!("All event proxies dropped, leaving event loop");
                        return 0;
                    }
                },
            };
            dispatcher.notify(event);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

fn abort_on_panic(payload: &(dyn Any + Send)) -> ! {
    let message = panic_message(payload);
    if hert_log::is_initialized() {
        hert_log::log_at!(
            hert_log::LogLevel::Error,
            "caught panic in event loop: {}",
            message
        );
        hert_log::flush();
    } else {
        eprintln!("caught panic in event loop: {}", message);
    }
    std::process::exit(PANIC_EXIT_CODE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_metadata() {
        let mut app = Application::new(vec!["hello".into(), "--flag".into()]);
        app.set_name("HelloHert");
        app.set_version("1.0.0");
        assert_eq!(app.name(), "HelloHert");
        assert_eq!(app.version(), "1.0.0");
        assert_eq!(app.args(), ["hello", "--flag"]);
    }

    #[test]
    fn test_quit_from_event() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        proxy.post(|ctx| ctx.quit(3));
        assert_eq!(app.exec(), 3);
    }

    #[test]
    fn test_quit_from_proxy_runs_earlier_events() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran = ran.clone();
            proxy.post(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        proxy.quit(7);
        proxy.post(|_| panic!("posted after quit"));

        assert_eq!(app.exec(), 7);
        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_exits_when_proxies_dropped() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        let handle = std::thread::spawn(move || {
            proxy.post(|_| {});
        });
        handle.join().unwrap();
        assert_eq!(app.exec(), 0);
    }

    #[test]
    fn test_follow_up_events_run_in_order() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let seen = order.clone();
        proxy.post(move |ctx| {
            seen.lock().push("first");
            let seen = seen.clone();
            ctx.post(move |ctx| {
                seen.lock().push("follow-up");
                ctx.quit(0);
            });
        });
        drop(proxy);

        assert_eq!(app.exec(), 0);
        assert_eq!(*order.lock(), vec!["first", "follow-up"]);
    }

    #[test]
    fn test_first_quit_wins() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        proxy.post(|ctx| {
            ctx.quit(4);
            ctx.post(|ctx| ctx.quit(5));
        });
        assert_eq!(app.exec(), 4);
    }

    #[test]
    fn test_notify_reports_quit() {
        let mut app = Application::new(Vec::new());
        assert!(!app.notify(Box::new(|_| {})));
        assert!(app.notify(Box::new(|ctx| ctx.quit(2))));
    }

    #[test]
    fn test_post_after_loop_finished() {
        let app = Application::new(Vec::new());
        let proxy = app.proxy();
        proxy.quit(0);
        assert_eq!(app.exec(), 0);
        assert!(!proxy.post(|_| {}));
        assert!(!proxy.quit(1));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
