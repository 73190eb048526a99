use crossbeam::channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

use super::events::FileUpdate;
use super::state::ScanContext;
use super::worker::Job;
use crate::errors::ScanResult;

/// Feeds the job queue in input order.
///
/// Every file is announced with a `QUEUED` update before its job is handed
/// over, so a consumer sees the full file list in order before results for
/// late files arrive. The queue closes when the dispatcher returns.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    files: Arc<[PathBuf]>,
}

impl Dispatcher {
    pub fn new(files: Arc<[PathBuf]>) -> Self {
        Self { files }
    }

    pub(crate) fn spawn(self, jobs: Sender<Job>, ctx: ScanContext) -> ScanResult<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("logscout-dispatcher".to_string())
            .spawn(move || self.run(jobs, ctx))?;
        Ok(handle)
    }

    fn run(&self, jobs: Sender<Job>, ctx: ScanContext) {
        for path in self.files.iter() {
            if !ctx.emit(FileUpdate::queued(path.clone())) {
                break;
            }
            if jobs.send(Job { path: path.clone() }).is_err() {
                // Every worker is gone
                break;
            }
        }
        debug!(files = self.files.len(), "dispatcher finished");
    }
}
