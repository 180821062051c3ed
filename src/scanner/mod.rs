pub mod diff;
pub mod directory;
pub mod pattern;
pub mod types;

// Re-export main types for easier access
pub use diff::Baseline;
pub use directory::DirectoryScanner;
pub use pattern::PatternMatcher;
pub use types::{ScanError, ScanReport, ScannerConfig};
