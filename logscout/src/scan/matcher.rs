use regex::{Regex, RegexBuilder};
use std::fmt;

use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};

const SIMPLE_PATTERN_THRESHOLD: usize = 32;

/// Line predicate applied by the scanner.
///
/// Any `Fn(&str) -> bool` closure that is `Send + Sync` is a matcher too.
pub trait LineMatcher: Send + Sync {
    fn is_match(&self, line: &str) -> bool;
}

impl<F> LineMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_match(&self, line: &str) -> bool {
        self(line)
    }
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    Simple(String),
    Regex(Regex),
}

/// Compiled line pattern
#[derive(Clone)]
pub struct PatternMatcher {
    pattern: String,
    strategy: MatchStrategy,
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("pattern", &self.pattern)
            .field("simple", &matches!(self.strategy, MatchStrategy::Simple(_)))
            .finish()
    }
}

impl PatternMatcher {
    /// Compiles `pattern`. Literals are matched as substrings unless case is
    /// ignored; regexes that contain no metacharacters take the same fast path.
    pub fn new(pattern: &str, is_regex: bool, ignore_case: bool) -> ScanResult<Self> {
        if pattern.is_empty() {
            return Err(ScanError::invalid_pattern("pattern must not be empty"));
        }

        let literal = !is_regex || Self::is_simple_pattern(pattern);
        let strategy = if literal && !ignore_case {
            MatchStrategy::Simple(pattern.to_string())
        } else {
            let source = if is_regex {
                pattern.to_string()
            } else {
                regex::escape(pattern)
            };
            let regex = RegexBuilder::new(&source)
                .case_insensitive(ignore_case)
                .build()
                .map_err(|e| ScanError::invalid_pattern(e.to_string()))?;
            MatchStrategy::Regex(regex)
        };

        Ok(Self {
            pattern: pattern.to_string(),
            strategy,
        })
    }

    /// Compiles the pattern described by `config`
    pub fn from_config(config: &ScanConfig) -> ScanResult<Self> {
        Self::new(&config.pattern, config.is_regex, config.ignore_case)
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    /// Determines if a pattern can use simple string matching
    fn is_simple_pattern(pattern: &str) -> bool {
        pattern.len() < SIMPLE_PATTERN_THRESHOLD
            && !pattern.contains(|c: char| c.is_ascii_punctuation() && c != '_' && c != '-')
    }
}

impl LineMatcher for PatternMatcher {
    fn is_match(&self, line: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Simple(needle) => line.contains(needle.as_str()),
            MatchStrategy::Regex(regex) => regex.is_match(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_pattern_matching() {
        let matcher = PatternMatcher::new("ERROR", false, false).unwrap();
        assert!(matches!(matcher.strategy(), MatchStrategy::Simple(_)));
        assert!(matcher.is_match("2024-01-01 ERROR disk full"));
        assert!(!matcher.is_match("2024-01-01 error disk full"));
    }

    #[test]
    fn test_literal_with_metacharacters_is_not_a_regex() {
        let matcher = PatternMatcher::new("a.b(", false, false).unwrap();
        assert!(matcher.is_match("x a.b( y"));
        assert!(!matcher.is_match("axb("));
    }

    #[test]
    fn test_regex_pattern_matching() {
        let matcher = PatternMatcher::new(r"took \d+ms", true, false).unwrap();
        assert!(matches!(matcher.strategy(), MatchStrategy::Regex(_)));
        assert!(matcher.is_match("request took 125ms"));
        assert!(!matcher.is_match("request took ms"));
    }

    #[test]
    fn test_ignore_case() {
        let matcher = PatternMatcher::new("warn", false, true).unwrap();
        assert!(matcher.is_match("WARN low memory"));
        assert!(matcher.is_match("Warning"));

        let matcher = PatternMatcher::new("a.c", false, true).unwrap();
        assert!(matcher.is_match("A.C"));
        assert!(!matcher.is_match("abc"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PatternMatcher::new("(unclosed", true, false),
            Err(ScanError::InvalidPattern(_))
        ));
        assert!(PatternMatcher::new("", false, false).is_err());
    }

    #[test]
    fn test_is_simple_pattern() {
        assert!(PatternMatcher::is_simple_pattern("timeout"));
        assert!(PatternMatcher::is_simple_pattern("conn_reset"));
        assert!(!PatternMatcher::is_simple_pattern(r"\btest\w+"));
        assert!(!PatternMatcher::is_simple_pattern("ERROR|FATAL"));
    }

    #[test]
    fn test_closure_matcher() {
        let matcher = |line: &str| line.len() > 3;
        assert!(LineMatcher::is_match(&matcher, "long"));
        assert!(!LineMatcher::is_match(&matcher, "no"));
    }
}
