//! bgsort - background sort demo
//!
//! CLI entry point: injects a demo algorithm into the coordinator and
//! renders every exchange as it arrives.

mod algorithms;
mod render;

use std::cell::RefCell;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, error, info, warn};

use bgsort::cli::{Cli, Command, OutputFormat, RunArgs};
use bgsort::config::Config;
use bgsort::{SortEvent, TaskCoordinator};

use render::{TextRenderer, json_line};

/// Overrides the log directory, mainly for tests
const LOG_DIR_ENV: &str = "BGSORT_LOG_DIR";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bgsort")
            .join("logs"),
    };

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("bgsort.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Send panic reports to the log file instead of stderr
///
/// Algorithm panics are already caught and reported as a run fault; the
/// default hook would also print them over the rendered run.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        let location = info.location().map(|l| l.to_string()).unwrap_or_default();
        error!(thread = thread.name().unwrap_or("<unnamed>"), %location, "panic: {}", message);
    }));
}

/// Everything `cmd_run` needs, after merging CLI flags over config
#[derive(Debug)]
struct RunOptions {
    algorithm: String,
    array: Vec<i32>,
    delay: Duration,
    cancel_after: Option<usize>,
    format: OutputFormat,
}

impl RunOptions {
    fn resolve(config: &Config, args: RunArgs) -> Self {
        let demo = &config.demo;
        let array = match args.values {
            Some(values) => values,
            None => algorithms::random_array(args.len.unwrap_or(demo.len), args.seed.or(demo.seed), demo.max_value),
        };
        Self {
            algorithm: args.algorithm.unwrap_or_else(|| demo.algorithm.clone()),
            array,
            delay: Duration::from_millis(args.delay_ms.unwrap_or(demo.delay_ms)),
            cancel_after: args.cancel_after,
            format: args.format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;
    install_panic_hook();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run(args)) => {
            debug!(?args, "main: matched Run command");
            cmd_run(&config, RunOptions::resolve(&config, args)).await
        }
        Some(Command::Algorithms) => {
            debug!("main: matched Algorithms command");
            cmd_algorithms()
        }
        None => {
            debug!("main: no command specified, running demo with configured defaults");
            cmd_run(&config, RunOptions::resolve(&config, RunArgs::default())).await
        }
    }
}

/// Sort one array in the background and render its progress
async fn cmd_run(config: &Config, options: RunOptions) -> Result<()> {
    debug!(?options, "cmd_run: called");
    let algorithm = algorithms::lookup(&options.algorithm, options.delay).ok_or_else(|| {
        eyre!(
            "Unknown algorithm '{}'. Available: {}",
            options.algorithm,
            algorithms::NAMES.join(", ")
        )
    })?;

    let mut coordinator = TaskCoordinator::with_task(config.coordinator.clone(), options.array.clone(), algorithm);

    match options.format {
        OutputFormat::Text => {
            let color = io::stdout().is_terminal();
            let renderer = Rc::new(RefCell::new(TextRenderer::new(&options.array, color)));
            println!(
                "Sorting {} values with {} ({} transport)",
                options.array.len(),
                options.algorithm,
                coordinator.config().progress_transport
            );
            println!("{}", renderer.borrow().plain_line());

            let exchange_renderer = renderer.clone();
            coordinator.subscribe_exchange(move |event| {
                let line = exchange_renderer.borrow_mut().apply(event)?;
                println!("{line}");
                Ok(())
            });
            coordinator.subscribe_completion(move |event| {
                println!("{}", renderer.borrow().summary(event));
                Ok(())
            });
        }
        OutputFormat::Json => {
            coordinator.subscribe_exchange(|event| {
                println!("{}", json_line(&SortEvent::Exchange(*event))?);
                Ok(())
            });
            coordinator.subscribe_completion(|event| {
                println!("{}", json_line(&SortEvent::Completed(event.clone()))?);
                Ok(())
            });
        }
    }

    coordinator.start().context("Failed to start sort")?;

    // Ctrl-C cancels the run instead of killing the process
    let interrupt = coordinator.cancel_flag().map(|cancel| {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, canceling run");
                cancel.cancel();
            }
        })
    });

    if options.cancel_after == Some(0) {
        coordinator.request_cancel();
    }

    let mut exchanges = 0;
    let mut completion = None;
    while let Some(event) = coordinator.next_event().await {
        debug!(event_type = event.event_type(), "cmd_run: event dispatched");
        match event {
            SortEvent::Exchange(_) => {
                exchanges += 1;
                if options.cancel_after == Some(exchanges) {
                    debug!(exchanges, "cmd_run: cancel threshold reached");
                    coordinator.request_cancel();
                }
            }
            SortEvent::Completed(event) => completion = Some(event),
        }
    }

    if let Some(handle) = interrupt {
        handle.abort();
    }

    let array = coordinator.take_array().unwrap_or_default();
    match options.format {
        OutputFormat::Text => {
            let values: Vec<String> = array.iter().map(i32::to_string).collect();
            println!("{} {}", "array:".bold(), values.join(" "));
        }
        OutputFormat::Json => println!("{}", serde_json::json!({ "array": array })),
    }

    let completion = completion.ok_or_else(|| eyre!("Run ended without a completion event"))?;
    match completion.fault {
        Some(fault) => Err(eyre!("Sort faulted: {}", fault)),
        None => Ok(()),
    }
}

/// List the algorithms `bs run` can inject
fn cmd_algorithms() -> Result<()> {
    debug!("cmd_algorithms: called");
    for name in algorithms::NAMES {
        println!("{} {}", format!("{name:<10}").cyan(), algorithms::describe(name));
    }
    Ok(())
}
