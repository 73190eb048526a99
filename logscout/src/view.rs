//! Display-independent state built by folding scan events.
//!
//! A front end feeds every received [`Event`] to [`ScanView::apply`] and
//! renders from the resulting rows, tail and totals however it likes.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use crate::scan::events::{Event, FileStatus, FileUpdate, MatchLine, SharedError, Totals};

/// How a matched line should be emphasised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightLevel {
    Error,
    Warn,
    Plain,
}

pub fn highlight_level(line: &str) -> HighlightLevel {
    if line.contains("ERROR") {
        HighlightLevel::Error
    } else if line.contains("WARN") {
        HighlightLevel::Warn
    } else {
        HighlightLevel::Plain
    }
}

/// Latest known state of one file
#[derive(Debug, Clone)]
pub struct FileRow {
    pub file: PathBuf,
    pub lines: u64,
    pub matches: u64,
    pub status: FileStatus,
    pub error: Option<SharedError>,
}

impl FileRow {
    fn queued(file: PathBuf) -> Self {
        Self {
            file,
            lines: 0,
            matches: 0,
            status: FileStatus::Queued,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanView {
    rows: Vec<FileRow>,
    row_index: HashMap<PathBuf, usize>,
    tail: VecDeque<MatchLine>,
    tail_max: usize,
    totals: Totals,
    paused: bool,
}

impl ScanView {
    /// Seeds one row per file, sorted by path
    pub fn new(files: &[PathBuf], tail_max: usize) -> Self {
        let mut sorted = files.to_vec();
        sorted.sort();

        let row_index = sorted
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        let rows = sorted.into_iter().map(FileRow::queued).collect();

        Self {
            rows,
            row_index,
            tail: VecDeque::with_capacity(tail_max),
            tail_max,
            totals: Totals {
                files_total: files.len(),
                ..Totals::default()
            },
            paused: false,
        }
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Totals(totals) => self.apply_totals(totals),
            Event::FileUpdate(update) => self.apply_update(update),
            Event::MatchLine(line) => self.push_match(line),
        }
    }

    fn apply_totals(&mut self, totals: &Totals) {
        // Keep a run-level error once seen
        let error = totals.error.clone().or_else(|| self.totals.error.take());
        self.totals = Totals {
            error,
            ..totals.clone()
        };
    }

    fn apply_update(&mut self, update: &FileUpdate) {
        let index = match self.row_index.get(&update.file) {
            Some(&i) => i,
            None => {
                self.rows.push(FileRow::queued(update.file.clone()));
                self.row_index.insert(update.file.clone(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[index];
        row.status = update.status;
        row.lines = update.lines;
        row.matches = update.matches;
        row.error = update.error.clone();
    }

    /// Inserts keeping the tail sorted by sequence number, dropping the oldest
    fn push_match(&mut self, line: &MatchLine) {
        if self.tail_max == 0 {
            return;
        }
        if self.tail.len() == self.tail_max {
            match self.tail.front() {
                Some(oldest) if oldest.seq > line.seq => return,
                _ => {
                    self.tail.pop_front();
                }
            }
        }
        let at = self.tail.partition_point(|m| m.seq < line.seq);
        self.tail.insert(at, line.clone());
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_done(&self) -> bool {
        self.totals.done
    }

    pub fn rows(&self) -> &[FileRow] {
        &self.rows
    }

    /// Recent matches, oldest first by sequence number
    pub fn tail(&self) -> impl Iterator<Item = &MatchLine> {
        self.tail.iter()
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn error(&self) -> Option<&SharedError> {
        self.totals.error.as_ref()
    }

    pub fn percent(&self) -> f64 {
        self.totals.percent()
    }

    pub fn failed_rows(&self) -> impl Iterator<Item = &FileRow> {
        self.rows
            .iter()
            .filter(|r| r.status == FileStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScanError;

    fn m(seq: u64, line: &str) -> Event {
        Event::MatchLine(MatchLine {
            seq,
            file: PathBuf::from("a.log"),
            line: line.to_string(),
        })
    }

    #[test]
    fn test_rows_seeded_sorted() {
        let files = vec![PathBuf::from("b.log"), PathBuf::from("a.log")];
        let view = ScanView::new(&files, 5);
        let names: Vec<_> = view.rows().iter().map(|r| r.file.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.log"), PathBuf::from("b.log")]);
        assert!(view.rows().iter().all(|r| r.status == FileStatus::Queued));
        assert_eq!(view.totals().files_total, 2);
    }

    #[test]
    fn test_tail_is_sorted_and_bounded() {
        let mut view = ScanView::new(&[], 3);
        for seq in [2, 1, 5, 4, 3] {
            view.apply(&m(seq, "x"));
        }
        let seqs: Vec<_> = view.tail().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);

        // Older than everything retained
        view.apply(&m(1, "late"));
        let seqs: Vec<_> = view.tail().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[test]
    fn test_file_updates_fill_rows() {
        let files = vec![PathBuf::from("a.log"), PathBuf::from("b.log")];
        let mut view = ScanView::new(&files, 5);
        view.apply(&Event::FileUpdate(FileUpdate::done(PathBuf::from("a.log"), 10, 2)));
        view.apply(&Event::FileUpdate(FileUpdate::failed(
            PathBuf::from("b.log"),
            0,
            0,
            ScanError::file_not_found("b.log"),
        )));

        assert_eq!(view.rows()[0].status, FileStatus::Done);
        assert_eq!(view.rows()[0].lines, 10);
        let failed: Vec<_> = view.failed_rows().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file, PathBuf::from("b.log"));
    }

    #[test]
    fn test_totals_keep_run_error() {
        let mut view = ScanView::new(&[PathBuf::from("a.log")], 5);
        view.apply(&Event::Totals(Totals {
            files_total: 1,
            files_done: 1,
            done: true,
            error: Some(std::sync::Arc::new(ScanError::Cancelled)),
            ..Totals::default()
        }));
        assert!(view.is_done());
        assert!(view.error().is_some());
        assert_eq!(view.percent(), 1.0);
    }

    #[test]
    fn test_highlight_level() {
        assert_eq!(highlight_level("12:00 ERROR boom"), HighlightLevel::Error);
        assert_eq!(highlight_level("12:00 WARN slow"), HighlightLevel::Warn);
        assert_eq!(highlight_level("12:00 INFO ok"), HighlightLevel::Plain);
    }
}
