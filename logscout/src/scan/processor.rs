use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};

use super::events::MatchLine;
use super::matcher::LineMatcher;
use super::state::ScanContext;
use crate::config::{EncodingMode, DEFAULT_MAX_LINE_LENGTH};
use crate::errors::ScanError;

const BUFFER_CAPACITY: usize = 65536;
const INITIAL_LINE_CAPACITY: usize = 256;

/// Counts gathered from one file, plus the error that stopped it early
#[derive(Debug)]
pub struct ScanOutcome {
    pub lines: u64,
    pub matches: u64,
    pub error: Option<ScanError>,
}

impl ScanOutcome {
    pub(crate) fn failed(lines: u64, matches: u64, error: ScanError) -> Self {
        Self {
            lines,
            matches,
            error: Some(error),
        }
    }
}

/// Decodes one line according to the encoding mode
fn decode_line<'a>(
    bytes: &'a [u8],
    path: &Path,
    line: u64,
    encoding_mode: EncodingMode,
    warned: &mut bool,
) -> Result<Cow<'a, str>, ScanError> {
    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|_| ScanError::encoding_error(path, line)),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            if matches!(cow, Cow::Owned(_)) && !*warned {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
                *warned = true;
            }
            Ok(cow)
        }
    }
}

/// Strips a trailing `\n` or `\r\n`
fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Scans a single file line by line
pub struct FileScanner {
    matcher: Arc<dyn LineMatcher>,
    max_line_length: usize,
    encoding_mode: EncodingMode,
}

impl FileScanner {
    pub fn new(matcher: Arc<dyn LineMatcher>) -> Self {
        Self {
            matcher,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            encoding_mode: EncodingMode::default(),
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn with_encoding_mode(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    /// Scans `path`, emitting one `MatchLine` per matching line in file order.
    ///
    /// Waits on the pause gate before every line. Any open/read failure ends
    /// the file early; the counts gathered up to that point are kept.
    pub(crate) fn scan_file(&self, path: &Path, ctx: &ScanContext) -> ScanOutcome {
        trace!("Scanning file: {}", path.display());

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return ScanOutcome::failed(0, 0, ScanError::from_io(path, e)),
        };

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut buf = Vec::with_capacity(INITIAL_LINE_CAPACITY);
        let limit = self.max_line_length;
        let mut warned = false;
        let mut lines = 0u64;
        let mut matches = 0u64;

        loop {
            ctx.control.pause().wait_if_paused();
            if ctx.control.is_cancelled() {
                return ScanOutcome::failed(lines, matches, ScanError::Cancelled);
            }

            buf.clear();
            // Room for the limit plus a full `\r\n`; anything longer is rejected
            let read = (&mut reader)
                .take(limit as u64 + 2)
                .read_until(b'\n', &mut buf);
            match read {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => return ScanOutcome::failed(lines, matches, ScanError::from_io(path, e)),
            }

            let line_number = lines + 1;
            let content = trim_line_ending(&buf);
            if content.len() > limit {
                return ScanOutcome::failed(
                    lines,
                    matches,
                    ScanError::line_too_long(path, line_number, limit),
                );
            }

            let text = match decode_line(
                content,
                path,
                line_number,
                self.encoding_mode,
                &mut warned,
            ) {
                Ok(text) => text,
                Err(e) => return ScanOutcome::failed(lines, matches, e),
            };
            lines = line_number;

            if self.matcher.is_match(&text) {
                matches += 1;
                let event = MatchLine {
                    seq: ctx.state.next_seq(),
                    file: path.to_path_buf(),
                    line: text.into_owned(),
                };
                if !ctx.emit(event) {
                    return ScanOutcome::failed(lines, matches, ScanError::Cancelled);
                }
            }
        }

        ScanOutcome {
            lines,
            matches,
            error: None,
        }
    }
}
