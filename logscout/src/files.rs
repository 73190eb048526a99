use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{ScanError, ScanResult};

/// Expands `path_pattern` into the ordered list of files to scan.
///
/// Only regular files are kept, anything matching one of `ignore_patterns`
/// is dropped, and the result is in lexical order. An empty result is not an
/// error.
pub fn resolve_files(path_pattern: &str, ignore_patterns: &[String]) -> ScanResult<Vec<PathBuf>> {
    let entries = glob::glob(path_pattern)
        .map_err(|e| ScanError::config_error(format!("invalid path pattern {:?}: {}", path_pattern, e)))?;

    let ignore = compile_ignore_patterns(ignore_patterns)?;
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && !should_ignore(&path, &ignore) {
                    files.push(path);
                }
            }
            Err(e) => warn!("Skipping unreadable path {}: {}", e.path().display(), e.error()),
        }
    }

    files.sort();
    debug!("Resolved {} files from {}", files.len(), path_pattern);
    Ok(files)
}

fn compile_ignore_patterns(patterns: &[String]) -> ScanResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| ScanError::config_error(format!("invalid ignore pattern {:?}: {}", p, e)))
        })
        .collect()
}

/// Checks if a file should be ignored based on ignore patterns
fn should_ignore(path: &Path, ignore: &[Pattern]) -> bool {
    let normalized = path.to_string_lossy().replace('\\', "/");
    ignore.iter().any(|p| {
        p.matches(&normalized)
            || path
                .file_name()
                .is_some_and(|name| p.matches(&name.to_string_lossy()))
    })
}
