use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::ScanError;

/// Shared, immutable error attached to an event
pub type SharedError = Arc<ScanError>;

/// Everything a running scan reports to its consumer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Totals(Totals),
    FileUpdate(FileUpdate),
    MatchLine(MatchLine),
}

/// Snapshot of the run-wide counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub files_total: usize,
    pub files_done: usize,
    pub lines_total: u64,
    pub matches_total: u64,
    /// Set only on the last event of a run
    pub done: bool,
    /// Run-level failure, if any
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SharedError>,
}

impl Totals {
    /// Fraction of files finished, in `0.0..=1.0`
    pub fn percent(&self) -> f64 {
        if self.files_total == 0 {
            return if self.done { 1.0 } else { 0.0 };
        }
        self.files_done as f64 / self.files_total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    Queued,
    Done,
    Failed,
}

impl FileStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, FileStatus::Queued)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Queued => "QUEUED",
            FileStatus::Done => "DONE",
            FileStatus::Failed => "FAILED",
        };
        f.pad(label)
    }
}

/// Lifecycle notification for a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileUpdate {
    pub file: PathBuf,
    pub lines: u64,
    pub matches: u64,
    pub status: FileStatus,
    /// Present only when `status` is `Failed`
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SharedError>,
}

impl FileUpdate {
    pub fn queued(file: PathBuf) -> Self {
        Self {
            file,
            lines: 0,
            matches: 0,
            status: FileStatus::Queued,
            error: None,
        }
    }

    pub fn done(file: PathBuf, lines: u64, matches: u64) -> Self {
        Self {
            file,
            lines,
            matches,
            status: FileStatus::Done,
            error: None,
        }
    }

    pub fn failed(file: PathBuf, lines: u64, matches: u64, error: ScanError) -> Self {
        Self {
            file,
            lines,
            matches,
            status: FileStatus::Failed,
            error: Some(Arc::new(error)),
        }
    }
}

/// One matching line.
///
/// `seq` is unique across the whole run and increases in the order matches
/// were found. Matches from different workers can arrive out of `seq` order;
/// sort on it to recover discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchLine {
    pub seq: u64,
    pub file: PathBuf,
    pub line: String,
}

impl From<Totals> for Event {
    fn from(totals: Totals) -> Self {
        Event::Totals(totals)
    }
}

impl From<FileUpdate> for Event {
    fn from(update: FileUpdate) -> Self {
        Event::FileUpdate(update)
    }
}

impl From<MatchLine> for Event {
    fn from(line: MatchLine) -> Self {
        Event::MatchLine(line)
    }
}

fn serialize_error<S>(error: &Option<SharedError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_update_constructors() {
        let queued = FileUpdate::queued(PathBuf::from("a.log"));
        assert_eq!(queued.status, FileStatus::Queued);
        assert!(queued.error.is_none());
        assert!(!queued.status.is_finished());

        let failed = FileUpdate::failed(
            PathBuf::from("a.log"),
            4,
            1,
            ScanError::file_not_found("a.log"),
        );
        assert_eq!(failed.status, FileStatus::Failed);
        assert!(failed.status.is_finished());
        assert_eq!((failed.lines, failed.matches), (4, 1));
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_totals_percent() {
        let mut totals = Totals {
            files_total: 4,
            files_done: 1,
            ..Totals::default()
        };
        assert!((totals.percent() - 0.25).abs() < f64::EPSILON);

        totals.files_total = 0;
        totals.files_done = 0;
        assert_eq!(totals.percent(), 0.0);
        totals.done = true;
        assert_eq!(totals.percent(), 1.0);
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::from(FileUpdate::failed(
            PathBuf::from("gone.log"),
            0,
            0,
            ScanError::file_not_found("gone.log"),
        ));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FileUpdate",
                "file": "gone.log",
                "lines": 0,
                "matches": 0,
                "status": "FAILED",
                "error": "File not found: gone.log",
            })
        );

        let event = Event::from(MatchLine {
            seq: 3,
            file: PathBuf::from("a.log"),
            line: "ERROR boom".to_string(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "MatchLine");
        assert_eq!(value["seq"], 3);

        let value = serde_json::to_value(Event::from(Totals::default())).unwrap();
        assert_eq!(value["type"], "Totals");
        assert!(value["error"].is_null());
    }
}
