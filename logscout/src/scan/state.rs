use crossbeam::channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::events::{Event, SharedError, Totals};
use super::pause::PauseController;

/// Run-wide counters shared by every worker.
///
/// Counters only grow. They are folded in once per finished file, never per
/// line, so workers do not contend on them while scanning.
#[derive(Debug)]
pub struct RunState {
    files_total: usize,
    files_done: AtomicUsize,
    lines_total: AtomicU64,
    matches_total: AtomicU64,
    seq: AtomicU64,
}

impl RunState {
    pub fn new(files_total: usize) -> Self {
        Self {
            files_total,
            files_done: AtomicUsize::new(0),
            lines_total: AtomicU64::new(0),
            matches_total: AtomicU64::new(0),
            seq: AtomicU64::new(0),
        }
    }

    /// Allocates the next match sequence number, starting at 1
    pub fn next_seq(&self) -> u64 {
        // Read-modify-write on one atomic is totally ordered, so values are unique
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Folds a successfully scanned file into the totals
    pub fn record_success(&self, lines: u64, matches: u64) {
        self.lines_total.fetch_add(lines, Ordering::Relaxed);
        self.matches_total.fetch_add(matches, Ordering::Relaxed);
    }

    /// Counts a file as finished, successful or not
    pub fn record_finished(&self) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, done: bool, error: Option<SharedError>) -> Totals {
        Totals {
            files_total: self.files_total,
            files_done: self.files_done.load(Ordering::Relaxed),
            lines_total: self.lines_total.load(Ordering::Relaxed),
            matches_total: self.matches_total.load(Ordering::Relaxed),
            done,
            error,
        }
    }
}

/// Consumer-facing control surface of a running scan. Cheap to clone and
/// safe to use from any thread.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    pause: Arc<PauseController>,
    cancelled: Arc<AtomicBool>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses or resumes every worker. Pausing a cancelled run is ignored.
    pub fn set_paused(&self, paused: bool) {
        if paused && self.is_cancelled() {
            return;
        }
        self.pause.set_paused(paused);
        // A cancel that raced with this pause must still win
        if paused && self.is_cancelled() {
            self.pause.set_paused(false);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Stops the run. Files still in flight or queued finish as failed with
    /// `ScanError::Cancelled`. Paused workers are released.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.pause.set_paused(false);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn pause(&self) -> &PauseController {
        &self.pause
    }
}

/// Everything a producer thread needs to report into a run
#[derive(Debug, Clone)]
pub(crate) struct ScanContext {
    pub events: Sender<Event>,
    pub state: Arc<RunState>,
    pub control: ScanControl,
}

impl ScanContext {
    /// Sends an event, blocking while the channel is full. A consumer that has
    /// hung up cancels the run; returns `false` in that case.
    pub fn emit(&self, event: impl Into<Event>) -> bool {
        if self.events.send(event.into()).is_ok() {
            return true;
        }
        self.control.cancel();
        false
    }
}
