mod keys;
mod render;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use logscout::config::CliOverrides;
use logscout::{scan, Event, ScanConfig, ScanHandle};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::keys::KeyListener;
use crate::render::Renderer;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliScanConfig {
    /// Pattern to look for in every line
    #[arg(short = 'k', long = "pattern")]
    pattern: Option<String>,

    /// Glob selecting the files to scan [default: ./logs/*.log]
    #[arg(short = 'p', long = "path")]
    path: Option<String>,

    /// Treat the pattern as a regular expression
    #[arg(short = 'r', long = "regex")]
    is_regex: bool,

    /// Match case-insensitively
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Number of files scanned at once
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Additional configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write one JSON object per event instead of the progress display
    #[arg(long)]
    json: bool,

    /// Patterns to ignore (glob format)
    #[arg(long)]
    ignore: Vec<String>,

    /// How many recent matches to show at the end
    #[arg(long)]
    tail: Option<usize>,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan log files for matching lines
    Scan(Box<CliScanConfig>),
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let config = build_config(&args)?;
            setup_logging(&config.log_level);
            debug!(?config, "effective configuration");

            let handle = scan(&config)?;
            if handle.files().is_empty() {
                println!("No files matched {}", config.path_pattern);
                handle.collect();
                return Ok(());
            }

            if args.json {
                print_json_events(handle)
            } else {
                print_live(handle, config.tail_max)
            }
        }
    }
}

/// Layers the command line over the configuration files
fn build_config(args: &CliScanConfig) -> Result<ScanConfig> {
    let file_config = ScanConfig::load_from(args.config.as_deref())
        .context("Failed to load configuration")?;

    let cli_config = CliOverrides {
        path_pattern: args.path.clone(),
        pattern: args.pattern.clone(),
        is_regex: args.is_regex,
        ignore_case: args.ignore_case,
        ignore_patterns: args.ignore.clone(),
        concurrency: args.threads,
        tail_max: args.tail,
        log_level: args.log_level.clone(),
    };

    Ok(file_config.merge_with_cli(cli_config))
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_json_events(handle: ScanHandle) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut run_error = None;

    for event in handle.events().iter() {
        if let Event::Totals(totals) = &event {
            if totals.done {
                run_error = totals.error.clone();
            }
        }
        serde_json::to_writer(&mut out, &event)?;
        writeln!(out)?;
    }
    out.flush()?;

    match run_error {
        Some(e) => Err(anyhow!("Scan failed: {}", e)),
        None => Ok(()),
    }
}

fn print_live(handle: ScanHandle, tail_max: usize) -> Result<()> {
    let control = handle.control();

    // Raw mode only makes sense when a person is typing at us
    let keys = if io::stdin().is_terminal() {
        match KeyListener::spawn(control.clone()) {
            Ok(keys) => Some(keys),
            Err(e) => {
                warn!("Keyboard controls unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut renderer = Renderer::new(handle.files(), tail_max);
    for event in handle.events().iter() {
        renderer.handle(&event, control.is_paused());
    }
    drop(keys);

    match renderer.finish() {
        Some(e) => Err(anyhow!("Scan failed: {}", e)),
        None => Ok(()),
    }
}
