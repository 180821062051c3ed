use regex::bytes::Regex;
use std::path::Path;

use super::types::ScanError;

/// Counts non-overlapping matches of a compiled pattern in raw file bytes.
/// Files are not required to be UTF-8.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, ScanError> {
        let regex = Regex::new(pattern).map_err(|source| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    pub fn count_bytes(&self, haystack: &[u8]) -> u64 {
        self.regex.find_iter(haystack).count() as u64
    }

    /// Read `path` and count matches. An unreadable file is a fault, not a skip.
    pub fn count_file(&self, path: &Path) -> Result<u64, ScanError> {
        let content = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.count_bytes(&content))
    }
}
