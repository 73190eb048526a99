use crossbeam::channel::{bounded, Receiver, Sender};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::events::FileUpdate;
use super::processor::{FileScanner, ScanOutcome};
use super::state::ScanContext;
use crate::errors::{ScanError, ScanResult};

/// One file to scan, handed from the dispatcher to exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: PathBuf,
}

/// Fixed-size set of scan workers pulling jobs from a shared queue
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Starts the workers on a dedicated thread pool.
    ///
    /// The returned receiver never yields a value; it disconnects once every
    /// worker has exited, which makes it usable as a join barrier inside
    /// `select!`.
    pub(crate) fn spawn(
        &self,
        jobs: Receiver<Job>,
        scanner: Arc<FileScanner>,
        ctx: ScanContext,
    ) -> ScanResult<Receiver<()>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("logscout-worker-{}", i))
            .build()
            .map_err(|e| ScanError::worker_pool(e.to_string()))?;

        let (done_tx, done_rx) = bounded::<()>(0);
        for id in 0..self.concurrency {
            let jobs = jobs.clone();
            let scanner = Arc::clone(&scanner);
            let ctx = ctx.clone();
            let done = done_tx.clone();
            pool.spawn(move || {
                // Dropped last, after the worker released its event sender
                let _done: Sender<()> = done;
                worker_loop(id, jobs, scanner, ctx);
            });
        }

        // Dropping the pool lets its threads exit once the workers return
        Ok(done_rx)
    }
}

fn worker_loop(id: usize, jobs: Receiver<Job>, scanner: Arc<FileScanner>, ctx: ScanContext) {
    debug!(worker = id, "worker started");

    while let Ok(job) = jobs.recv() {
        ctx.control.pause().wait_if_paused();

        // Jobs still queued after a cancel fail without being opened
        let outcome = if ctx.control.is_cancelled() {
            ScanOutcome::failed(0, 0, ScanError::Cancelled)
        } else {
            scanner.scan_file(&job.path, &ctx)
        };

        let update = match outcome.error {
            None => {
                ctx.state.record_success(outcome.lines, outcome.matches);
                debug!(
                    worker = id,
                    lines = outcome.lines,
                    matches = outcome.matches,
                    "scanned {}",
                    job.path.display()
                );
                FileUpdate::done(job.path, outcome.lines, outcome.matches)
            }
            Some(e) => {
                if !matches!(e, ScanError::Cancelled) {
                    warn!("Failed to scan {}: {}", job.path.display(), e);
                }
                FileUpdate::failed(job.path, outcome.lines, outcome.matches, e)
            }
        };

        let delivered = ctx.emit(update);
        ctx.state.record_finished();
        if !delivered {
            break;
        }
    }

    debug!(worker = id, "worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::events::{Event, FileStatus};
    use crate::scan::matcher::LineMatcher;
    use crate::scan::state::{RunState, ScanControl};
    use crossbeam::channel::unbounded;
    use std::fs;
    use tempfile::tempdir;

    fn setup(files: usize) -> (ScanContext, Receiver<Event>) {
        let (tx, rx) = unbounded();
        let ctx = ScanContext {
            events: tx,
            state: Arc::new(RunState::new(files)),
            control: ScanControl::new(),
        };
        (ctx, rx)
    }

    fn scanner() -> Arc<FileScanner> {
        let matcher: Arc<dyn LineMatcher> = Arc::new(|line: &str| line.contains("hit"));
        Arc::new(FileScanner::new(matcher))
    }

    #[test]
    fn test_pool_processes_every_job_once() {
        let dir = tempdir().unwrap();
        let paths: Vec<_> = (0..6)
            .map(|i| {
                let path = dir.path().join(format!("{}.log", i));
                fs::write(&path, "hit\nmiss\nhit\n").unwrap();
                path
            })
            .collect();

        let (ctx, rx) = setup(paths.len());
        let (job_tx, job_rx) = unbounded();
        let done = WorkerPool::new(3)
            .spawn(job_rx, scanner(), ctx.clone())
            .unwrap();
        for path in &paths {
            job_tx.send(Job { path: path.clone() }).unwrap();
        }
        drop(job_tx);

        // Disconnects only when every worker has exited
        assert!(done.recv().is_err());

        let updates: Vec<_> = rx
            .try_iter()
            .filter_map(|e| match e {
                Event::FileUpdate(u) => Some(u),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 6);
        assert!(updates.iter().all(|u| u.status == FileStatus::Done));

        let totals = ctx.state.snapshot(false, None);
        assert_eq!(totals.files_done, 6);
        assert_eq!(totals.lines_total, 18);
        assert_eq!(totals.matches_total, 12);
    }

    #[test]
    fn test_failed_file_is_not_folded_into_totals() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.log");
        fs::write(&good, "hit\n").unwrap();
        let missing = dir.path().join("missing.log");

        let (ctx, rx) = setup(2);
        let (job_tx, job_rx) = unbounded();
        let done = WorkerPool::new(1)
            .spawn(job_rx, scanner(), ctx.clone())
            .unwrap();
        job_tx.send(Job { path: good }).unwrap();
        job_tx.send(Job { path: missing.clone() }).unwrap();
        drop(job_tx);
        assert!(done.recv().is_err());

        let failed = rx
            .try_iter()
            .find_map(|e| match e {
                Event::FileUpdate(u) if u.status == FileStatus::Failed => Some(u),
                _ => None,
            })
            .unwrap();
        assert_eq!(failed.file, missing);
        assert!(failed.error.is_some());

        let totals = ctx.state.snapshot(false, None);
        assert_eq!(totals.files_done, 2);
        assert_eq!(totals.lines_total, 1);
        assert_eq!(totals.matches_total, 1);
    }

    #[test]
    fn test_new_clamps_concurrency() {
        assert_eq!(WorkerPool::new(0).concurrency(), 1);
        assert_eq!(WorkerPool::new(4).concurrency(), 4);
    }
}
