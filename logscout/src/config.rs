use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ScanError, ScanResult};

/// How to treat line bytes that are not valid UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Abort the file with an encoding error
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    #[default]
    Lossy,
}

/// Configuration for a scan run.
///
/// # Configuration Locations
///
/// Values are layered from the following files, later ones winning:
/// 1. Global `$CONFIG_DIR/logscout/config.yaml`
/// 2. Local `.logscout.yaml` in the current directory
/// 3. A file passed explicitly with `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Files to scan (glob syntax)
/// path_pattern: "./logs/*.log"
///
/// # Line pattern; a literal unless is_regex is set
/// pattern: "ERROR"
/// is_regex: false
/// ignore_case: false
///
/// # Glob patterns removed from the resolved file list
/// ignore_patterns:
///   - "**/*.gz"
///
/// # Worker count (default: CPU cores)
/// concurrency: 4
///
/// # Totals snapshot interval and event buffer size
/// tick_interval_ms: 200
/// channel_capacity: 256
///
/// # Longest accepted line in bytes
/// max_line_length: 8388608
///
/// # failfast | lossy
/// encoding_mode: lossy
///
/// # Recent matches kept for display
/// tail_max: 200
///
/// log_level: "warn"
/// ```
///
/// Command-line arguments take precedence over file values; see
/// [`ScanConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Glob selecting the files to scan
    #[serde(default = "default_path_pattern")]
    pub path_pattern: String,

    /// Pattern every line is tested against
    #[serde(default)]
    pub pattern: String,

    /// Treat `pattern` as a regular expression instead of a literal
    #[serde(default)]
    pub is_regex: bool,

    /// Match case-insensitively
    #[serde(default)]
    pub ignore_case: bool,

    /// Globs removed from the resolved file list
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of scan workers
    #[serde(default = "default_concurrency")]
    pub concurrency: NonZeroUsize,

    /// Interval between totals snapshots, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the bounded event channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Lines longer than this many bytes fail the file
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Number of recent matches a consumer keeps around
    #[serde(default = "default_tail_max")]
    pub tail_max: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub const DEFAULT_PATH_PATTERN: &str = "./logs/*.log";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;
pub const DEFAULT_TAIL_MAX: usize = 200;

fn default_path_pattern() -> String {
    DEFAULT_PATH_PATTERN.to_string()
}

fn default_concurrency() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_tail_max() -> usize {
    DEFAULT_TAIL_MAX
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values taken from the command line; `None` means not given
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub path_pattern: Option<String>,
    pub pattern: Option<String>,
    pub is_regex: bool,
    pub ignore_case: bool,
    pub ignore_patterns: Vec<String>,
    pub concurrency: Option<NonZeroUsize>,
    pub tail_max: Option<usize>,
    pub log_level: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            path_pattern: default_path_pattern(),
            pattern: String::new(),
            is_regex: false,
            ignore_case: false,
            ignore_patterns: Vec::new(),
            concurrency: default_concurrency(),
            tick_interval_ms: default_tick_interval_ms(),
            channel_capacity: default_channel_capacity(),
            max_line_length: default_max_line_length(),
            encoding_mode: EncodingMode::default(),
            tail_max: default_tail_max(),
            log_level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// Creates a config for `pattern` with every other field defaulted
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("logscout/config.yaml")),
            Some(PathBuf::from(".logscout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Anything given on the command line wins, even when it equals the
    /// built-in default.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(path_pattern) = cli.path_pattern {
            self.path_pattern = path_pattern;
        }
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if cli.is_regex {
            self.is_regex = true;
        }
        if cli.ignore_case {
            self.ignore_case = true;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(tail_max) = cli.tail_max {
            self.tail_max = tail_max;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects values the scan engine cannot run with
    pub fn validate(&self) -> ScanResult<()> {
        if self.pattern.is_empty() {
            return Err(ScanError::config_error("pattern must not be empty"));
        }
        if self.channel_capacity == 0 {
            return Err(ScanError::config_error(
                "channel_capacity must be at least 1",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ScanError::config_error(
                "tick_interval_ms must be at least 1",
            ));
        }
        if self.max_line_length == 0 {
            return Err(ScanError::config_error(
                "max_line_length must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            path_pattern: "/var/log/*.log"
            pattern: "ERROR|FATAL"
            is_regex: true
            ignore_patterns: ["**/*.gz"]
            concurrency: 3
            tick_interval_ms: 50
            channel_capacity: 16
            encoding_mode: failfast
            tail_max: 10
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.path_pattern, "/var/log/*.log");
        assert_eq!(config.pattern, "ERROR|FATAL");
        assert!(config.is_regex);
        assert!(!config.ignore_case);
        assert_eq!(config.ignore_patterns, vec!["**/*.gz".to_string()]);
        assert_eq!(config.concurrency, NonZeroUsize::new(3).unwrap());
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.encoding_mode, EncodingMode::FailFast);
        assert_eq!(config.tail_max, 10);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "pattern: \"WARN\"\n").unwrap();

        let config = ScanConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.pattern, "WARN");
        assert_eq!(config.path_pattern, DEFAULT_PATH_PATTERN);
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(config.encoding_mode, EncodingMode::Lossy);
        assert_eq!(
            config.concurrency,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = ScanConfig {
            path_pattern: "/srv/*.log".to_string(),
            pattern: "ERROR".to_string(),
            ignore_patterns: vec!["*.old".to_string()],
            tail_max: 50,
            ..ScanConfig::default()
        };

        let cli = CliOverrides {
            pattern: Some("timeout".to_string()),
            ignore_case: true,
            concurrency: NonZeroUsize::new(num_cpus::get() + 1),
            log_level: Some("debug".to_string()),
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.path_pattern, "/srv/*.log"); // file value
        assert_eq!(merged.pattern, "timeout"); // CLI value
        assert!(merged.ignore_case); // CLI value
        assert_eq!(merged.ignore_patterns, vec!["*.old".to_string()]); // file value
        assert_eq!(merged.concurrency.get(), num_cpus::get() + 1); // CLI value
        assert_eq!(merged.tail_max, 50); // file value
        assert_eq!(merged.log_level, "debug"); // CLI value
    }

    #[test]
    fn test_cli_values_equal_to_defaults_still_win() {
        let file_config = ScanConfig {
            path_pattern: "/srv/*.log".to_string(),
            concurrency: NonZeroUsize::new(num_cpus::get() + 3).unwrap(),
            tail_max: 10,
            log_level: "error".to_string(),
            ..ScanConfig::default()
        };
        let defaults = ScanConfig::default();

        let cli = CliOverrides {
            path_pattern: Some(DEFAULT_PATH_PATTERN.to_string()),
            concurrency: Some(defaults.concurrency),
            tail_max: Some(DEFAULT_TAIL_MAX),
            log_level: Some(defaults.log_level.clone()),
            ..CliOverrides::default()
        };

        let merged = file_config.merge_with_cli(cli);
        assert_eq!(merged.path_pattern, DEFAULT_PATH_PATTERN);
        assert_eq!(merged.concurrency, defaults.concurrency);
        assert_eq!(merged.tail_max, DEFAULT_TAIL_MAX);
        assert_eq!(merged.log_level, defaults.log_level);
    }

    #[test]
    fn test_validate() {
        assert!(ScanConfig::new("ERROR").validate().is_ok());
        assert!(ScanConfig::default().validate().is_err());

        let mut config = ScanConfig::new("ERROR");
        config.channel_capacity = 0;
        assert!(matches!(config.validate(), Err(ScanError::ConfigError(_))));

        let mut config = ScanConfig::new("ERROR");
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ScanConfig::new("ERROR");
        config.max_line_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "pattern: []\nconcurrency: \"many\"\n",
        )
        .unwrap();

        assert!(ScanConfig::load_from(Some(&config_path)).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ScanConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }
}
