//! Headless main window
//!
//! The window lives on the event-loop thread. Each button click hands a job
//! to a background worker, which reports back to the loop through an
//! [`EventProxy`]. Once every expected click has been answered the worker
//! asks the loop to quit.

use std::io;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use hert_app::EventProxy;

const WINDOW_TITLE: &str = "Hello Hert - Multi-threaded";

/// Simulated work per click
const WORK_DURATION: Duration = Duration::from_millis(100);

pub struct MainWindow {
    main_thread: ThreadId,
    jobs: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// Cloneable handle for clicking the window's button from an event
#[derive(Clone)]
pub struct Button {
    jobs: Sender<()>,
}

impl Button {
    pub fn click(&self) {
        log::info!(
            "Button clicked in UI thread: {:?}",
            thread::current().id()
        );
        let _ = self.jobs.send(());
    }
}

impl MainWindow {
    /// Create the window and its worker; the worker quits the loop after
    /// `expected_clicks` jobs.
    pub fn new(main_thread: ThreadId, proxy: EventProxy, expected_clicks: u32) -> io::Result<Self> {
        let (jobs, queue) = channel::unbounded::<()>();
        let worker = thread::Builder::new()
            .name("hert-worker".into())
            .spawn(move || {
                let mut done = 0;
                for () in queue.iter() {
                    thread::sleep(WORK_DURATION);
                    let worker_thread = thread::current().id();
                    log::info!("Work completed in thread: {:?}", worker_thread);

                    done += 1;
                    let finished = done >= expected_clicks;
                    proxy.post(move |ctx| {
                        log::info!("Worker Thread ID: {:?}", worker_thread);
                        if finished {
                            ctx.quit(0);
                        }
                    });
                }
            })?;

        Ok(Self {
            main_thread,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    pub fn show(&self) {
        log::info!("{}", WINDOW_TITLE);
        log::info!("Main Thread ID: {:?}", self.main_thread);
        log::info!("UI Thread ID: {:?}", thread::current().id());
        log::info!("Worker Thread ID: (Click button to start work)");
    }

    pub fn button(&self) -> Option<Button> {
        self.jobs.as_ref().map(|jobs| Button { jobs: jobs.clone() })
    }
}

impl Drop for MainWindow {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
