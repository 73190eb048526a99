//! The concurrent scanning engine.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ──QUEUED──────────────────────────────┐
//!     │ (job queue, rendezvous)                     │
//!     ▼                                             ▼
//! WorkerPool ×N ──► FileScanner ──MatchLine──► bounded event channel ──► consumer
//!     │                                             ▲
//!     └──DONE/FAILED + counters──► RunState ──Totals┘ (Aggregator, on a timer)
//! ```
//!
//! * The [`Dispatcher`] announces every file with a `QUEUED` update, then hands
//!   its job over. The queue closes after the last file.
//! * The [`WorkerPool`] runs a fixed number of workers. Each scans whole files,
//!   emits exactly one `DONE` or `FAILED` update per file and folds successful
//!   counts into the shared [`RunState`].
//! * The aggregator emits a zero-progress `Totals` first, a snapshot on every
//!   tick, and one final `Totals` with `done` set once all workers exited. The
//!   channel closes right after it.
//!
//! # Ordering
//!
//! Lines of one file are reported in file order. Across files, arrival order
//! on the channel is arbitrary; every `MatchLine` carries a run-wide sequence
//! number (1, 2, 3, ...) that restores discovery order when sorted on.
//!
//! # Backpressure, pause and cancel
//!
//! The event channel is bounded and sends block, so a slow consumer stalls
//! the producers instead of losing events. [`ScanControl::set_paused`]
//! suspends every worker before its next line; resuming releases them all at
//! once. [`ScanControl::cancel`] fails whatever is left and ends the run.
pub mod aggregator;
pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod matcher;
pub mod pause;
pub mod processor;
pub mod state;
pub mod worker;

pub use aggregator::{start, ScanHandle, ScanOptions};
pub use dispatcher::Dispatcher;
pub use engine::scan;
pub use events::{Event, FileStatus, FileUpdate, MatchLine, SharedError, Totals};
pub use matcher::{LineMatcher, PatternMatcher};
pub use pause::PauseController;
pub use processor::{FileScanner, ScanOutcome};
pub use state::{RunState, ScanControl};
pub use worker::{Job, WorkerPool};
