use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of one directory scan, including the diff against the previous run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Total pattern matches across all scanned files
    pub occurrence: u64,
    /// Files present now but absent from the previous file set
    pub new_files: Vec<String>,
    /// Files present in the previous file set but absent now
    pub removed_files: Vec<String>,
    /// Every file found, in walk order
    pub files: Vec<String>,
}

/// Faults that abort a scan. Any of these turns the run into a failed run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to walk {}", root.display())]
    Traversal {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan pipeline thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Follow symbolic links while walking; when false, links are not reported
    pub follow_symlinks: bool,
    /// Counter workers (0 = derive from thread_percentage)
    pub max_threads: usize,
    /// Percentage of CPU cores to use when max_threads is 0
    pub thread_percentage: u8,
    /// Canonical paths skipped by the walker
    pub excluded_files: HashSet<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_threads: 1,
            thread_percentage: 75,
            excluded_files: HashSet::new(),
        }
    }
}

impl ScannerConfig {
    /// Skip the SQLite database at `database` along with its `-wal`, `-shm`
    /// and `-journal` companions. A database whose directory does not exist
    /// cannot be inside the tree, so nothing is added.
    pub fn exclude_store_files(mut self, database: &Path) -> Self {
        let Some(name) = database.file_name() else {
            return self;
        };
        let parent = match database.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let Ok(dir) = parent.canonicalize() else {
            return self;
        };
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = name.to_os_string();
            file.push(suffix);
            self.excluded_files.insert(dir.join(file));
        }
        self
    }
}

impl From<&crate::config::ScannerSettings> for ScannerConfig {
    fn from(settings: &crate::config::ScannerSettings) -> Self {
        Self {
            follow_symlinks: settings.follow_symlinks,
            max_threads: settings.max_threads,
            thread_percentage: settings.thread_percentage,
            excluded_files: HashSet::new(),
        }
    }
}
