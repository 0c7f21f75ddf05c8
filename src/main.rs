//! hello-hert - demo program for the hert application-support layer
//!
//! Sets up logging and the crash guard, opens a headless main window whose
//! button hands work to a background thread, and runs the event loop until
//! the work is done. `--crash` injects a fault from inside the loop.

mod cli;
mod faults;
mod window;

use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use hert_app::{Application, Daemon, HertConfig};
use hert_core::{dump, Singleton};

use crate::cli::Cli;
use crate::window::MainWindow;

const APP_NAME: &str = "HelloHert";
const DEFAULT_CORE_DIR: &str = "./core_dumps";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let config = load_config(&cli)?;
    hert_log::initialize(&config.log).context("Failed to initialize logging")?;

    let core_dir = cli
        .core_dir
        .clone()
        .or(config.dump.core_dump_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CORE_DIR));
    dump::init(&core_dir);
    dump::set_crash_callback(faults::crash_callback(cli.callback));

    if cli.trace {
        dump::print_stacktrace();
        hert_log::shutdown();
        return Ok(());
    }

    let code = run(&cli)?;

    Daemon::instance().stop();
    hert_log::shutdown();
    std::process::exit(code);
}

fn load_config(cli: &Cli) -> anyhow::Result<HertConfig> {
    let mut config = match &cli.config {
        Some(path) => hert_app::load_config_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => hert_app::load_config().unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}", e);
            HertConfig::default()
        }),
    };

    if let Some(level) = cli.log_level {
        config.log.console_level = level;
        config.log.file_level = level;
    }
    if let Some(path) = &cli.log_file {
        config.log.file_enabled = true;
        config.log.file_path = path.clone();
    }
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let args: Vec<String> = std::env::args().collect();

    let mut app = Application::new(args.clone());
    app.set_name(APP_NAME);
    app.set_version(hert_core::version());

    let main_thread = thread::current().id();
    log::info!("{} {} starting", app.name(), app.version());
    log::info!("Main thread ID: {:?}", main_thread);

    Daemon::instance().initialize(args);

    let proxy = app.proxy();
    let window = MainWindow::new(main_thread, proxy.clone(), cli.clicks)
        .context("Failed to start worker thread")?;
    window.show();

    if let Some(button) = window.button() {
        for _ in 0..cli.clicks {
            let button = button.clone();
            proxy.post(move |_| button.click());
        }
    }
    if cli.clicks == 0 {
        proxy.quit(0);
    }
    if let Some(kind) = cli.crash {
        proxy.post(move |_| faults::trigger(kind));
    }
    drop(proxy);

    log::info!("Application started");
    let code = app.exec();
    drop(window);
    Ok(code)
}
