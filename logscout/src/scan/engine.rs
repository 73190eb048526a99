use std::sync::Arc;
use tracing::info;

use super::aggregator::{start, ScanHandle, ScanOptions};
use super::matcher::PatternMatcher;
use crate::config::ScanConfig;
use crate::errors::ScanResult;
use crate::files::resolve_files;

/// Resolves the configured files, compiles the pattern and starts the run.
///
/// Configuration and pattern problems are returned here, before any worker
/// starts; everything after that is reported through the event stream.
pub fn scan(config: &ScanConfig) -> ScanResult<ScanHandle> {
    config.validate()?;
    let matcher = PatternMatcher::from_config(config)?;
    let files = resolve_files(&config.path_pattern, &config.ignore_patterns)?;
    info!(
        "Scanning {} files matching {:?} for {:?}",
        files.len(),
        config.path_pattern,
        config.pattern
    );

    start(files, Arc::new(matcher), ScanOptions::from(config))
}
