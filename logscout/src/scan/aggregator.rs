use crossbeam::channel::{bounded, select, tick, Receiver};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use super::events::{Event, SharedError};
use super::matcher::LineMatcher;
use super::processor::FileScanner;
use super::state::{RunState, ScanContext, ScanControl};
use super::worker::WorkerPool;
use crate::config::{
    EncodingMode, ScanConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_TICK_INTERVAL_MS,
};
use crate::errors::{ScanError, ScanResult};

/// Engine settings for one run
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub concurrency: NonZeroUsize,
    pub tick_interval: Duration,
    pub channel_capacity: usize,
    pub max_line_length: usize,
    pub encoding_mode: EncodingMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            encoding_mode: EncodingMode::default(),
        }
    }
}

impl ScanOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = NonZeroUsize::new(concurrency).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            tick_interval: config.tick_interval(),
            channel_capacity: config.channel_capacity,
            max_line_length: config.max_line_length,
            encoding_mode: config.encoding_mode,
        }
    }
}

/// A running scan: the event stream plus the controls that steer it.
///
/// The stream always ends with a `Totals` event whose `done` flag is set,
/// after which the channel closes.
#[derive(Debug)]
pub struct ScanHandle {
    files: Arc<[PathBuf]>,
    events: Receiver<Event>,
    control: ScanControl,
}

impl ScanHandle {
    /// Files of this run, in dispatch order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    pub fn control(&self) -> ScanControl {
        self.control.clone()
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn into_parts(self) -> (Receiver<Event>, ScanControl) {
        (self.events, self.control)
    }

    /// Blocks until the run finishes and returns every event in arrival order
    pub fn collect(self) -> Vec<Event> {
        self.events.iter().collect()
    }
}

/// Starts scanning `files` with `matcher` and returns immediately.
///
/// The first event is always a zero-progress `Totals` carrying the file
/// count. Per-file failures are reported as `FAILED` updates and never stop
/// the run.
pub fn start(
    files: Vec<PathBuf>,
    matcher: Arc<dyn LineMatcher>,
    options: ScanOptions,
) -> ScanResult<ScanHandle> {
    if options.channel_capacity == 0 {
        return Err(ScanError::config_error(
            "channel_capacity must be at least 1",
        ));
    }
    if options.tick_interval.is_zero() {
        return Err(ScanError::config_error("tick interval must be non-zero"));
    }

    let files: Arc<[PathBuf]> = files.into();
    let (events_tx, events_rx) = bounded(options.channel_capacity);
    let control = ScanControl::new();
    let ctx = ScanContext {
        events: events_tx,
        state: Arc::new(RunState::new(files.len())),
        control: control.clone(),
    };

    let scanner = FileScanner::new(matcher)
        .with_max_line_length(options.max_line_length)
        .with_encoding_mode(options.encoding_mode);
    let aggregator = Aggregator {
        files: Arc::clone(&files),
        scanner: Arc::new(scanner),
        options,
    };

    thread::Builder::new()
        .name("logscout-aggregator".to_string())
        .spawn(move || aggregator.run(ctx))?;

    Ok(ScanHandle {
        files,
        events: events_rx,
        control,
    })
}

/// Owns the run from the initial snapshot to channel closure
struct Aggregator {
    files: Arc<[PathBuf]>,
    scanner: Arc<FileScanner>,
    options: ScanOptions,
}

impl Aggregator {
    fn run(self, ctx: ScanContext) {
        let started = Instant::now();
        info!(
            files = self.files.len(),
            concurrency = self.options.concurrency.get(),
            "Starting scan"
        );

        // Seen before any worker starts, so the total is never unknown
        if !ctx.emit(ctx.state.snapshot(false, None)) {
            return;
        }

        let fatal = match self.drive(&ctx) {
            Ok(()) => None,
            Err(e) => {
                error!("Scan aborted: {}", e);
                Some(e)
            }
        };
        let run_error: Option<SharedError> = match fatal {
            Some(e) => Some(Arc::new(e)),
            None if ctx.control.is_cancelled() => Some(Arc::new(ScanError::Cancelled)),
            None => None,
        };

        let totals = ctx.state.snapshot(true, run_error);
        info!(
            files = totals.files_done,
            lines = totals.lines_total,
            matches = totals.matches_total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan complete"
        );
        // Last event; the channel closes when `ctx` drops
        ctx.emit(totals);
    }

    /// Runs dispatcher and workers, ticking totals until every worker exits
    fn drive(&self, ctx: &ScanContext) -> ScanResult<()> {
        let (job_tx, job_rx) = bounded(0);
        let workers_done = WorkerPool::new(self.options.concurrency.get()).spawn(
            job_rx,
            Arc::clone(&self.scanner),
            ctx.clone(),
        )?;
        let dispatcher = Dispatcher::new(Arc::clone(&self.files)).spawn(job_tx, ctx.clone())?;

        let ticker = tick(self.options.tick_interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    ctx.emit(ctx.state.snapshot(false, None));
                }
                recv(workers_done) -> _ => break,
            }
        }

        // Workers only exit after the queue closed, so this returns promptly
        if dispatcher.join().is_err() {
            error!("Dispatcher thread panicked");
        }
        debug!("all workers finished");
        Ok(())
    }
}
