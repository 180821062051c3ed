use crossbeam::channel::{Receiver, Sender, bounded};
use ignore::WalkBuilder;
use std::any::Any;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace};

use super::diff::Baseline;
use super::pattern::PatternMatcher;
use super::types::{ScanError, ScanReport, ScannerConfig};
use crate::parallel::calculate_optimal_workers;

/// Walks a directory tree and counts pattern matches per file.
///
/// # Pipeline
///
/// ```text
/// ┌──────────┐ PathBuf ┌──────────────┐ Result<u64> ┌────────────┐
/// │  Walker  │────────▶│ Counter pool │────────────▶│ Aggregator │
/// │ (thread) │  (0)    │  (N threads) │    (0)      │  (caller)  │
/// └──────────┘         └──────────────┘             └────────────┘
/// ```
///
/// Both channels are rendezvous channels, so the walker blocks while the
/// counters are busy. The walker also builds the file list and classifies
/// each path against the [`Baseline`] as it goes. Counts are summed in
/// arrival order, which does not matter because addition commutes.
///
/// The first fault stops the pipeline: the aggregator returns, its receiver
/// is dropped, counters fail to send and exit, and the walker's next send
/// fails in turn.
///
/// Only regular files are reported. Symbolic links are skipped unless
/// `follow_symlinks` is set, in which case they are resolved and their
/// targets walked. A link pointing back at one of its ancestors is skipped
/// with a debug log instead of failing the scan.
///
/// Paths in [`ScannerConfig::excluded_files`] (the store's own database
/// files) are never reported or counted.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    config: ScannerConfig,
}

/// What the walker saw before it stopped
struct Walked {
    files: Vec<String>,
    found: HashSet<String>,
    new_files: Vec<String>,
}

impl DirectoryScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Scan `root` for `pattern`, diffing against the previous run's files
    pub fn scan(
        &self,
        root: &Path,
        pattern: &str,
        previous_files: &[String],
    ) -> Result<ScanReport, ScanError> {
        let matcher = PatternMatcher::new(pattern)?;
        let baseline = Baseline::new(previous_files.iter().cloned());
        self.scan_with(root, &matcher, &baseline)
    }

    /// Scan with an already compiled pattern and baseline
    pub fn scan_with(
        &self,
        root: &Path,
        matcher: &PatternMatcher,
        baseline: &Baseline,
    ) -> Result<ScanReport, ScanError> {
        self.scan_counting(root, baseline, |path| matcher.count_file(path))
    }

    /// Run the pipeline with `count` as the per-file counter
    pub(crate) fn scan_counting<F>(
        &self,
        root: &Path,
        baseline: &Baseline,
        count: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: Fn(&Path) -> Result<u64, ScanError> + Sync,
    {
        let count = &count;
        let start_time = Instant::now();
        let workers =
            calculate_optimal_workers(self.config.max_threads, self.config.thread_percentage);

        let (path_tx, path_rx): (Sender<PathBuf>, Receiver<PathBuf>) = bounded(0);
        let (count_tx, count_rx): (Sender<Result<u64, ScanError>>, Receiver<Result<u64, ScanError>>) =
            bounded(0);

        let (total, walked) = crossbeam::thread::scope(|s| {
            let walker = s.spawn(move |_| self.walk(root, baseline, path_tx));

            for worker_id in 0..workers {
                let path_rx = path_rx.clone();
                let count_tx = count_tx.clone();
                s.spawn(move |_| count_worker(worker_id, count, path_rx, count_tx));
            }

            // Drop the originals so the channels close when the stages finish
            drop(path_rx);
            drop(count_tx);

            let total = aggregate(count_rx);
            let walked = walker
                .join()
                .map_err(|payload| ScanError::WorkerPanicked(panic_message(payload)));
            (total, walked)
        })
        .map_err(|payload| ScanError::WorkerPanicked(panic_message(payload)))?;

        let occurrence = total?;
        let walked = walked??;

        let removed_files = baseline.removed(&walked.found);
        debug!(
            "Scanned {} in {:.2}s ({} files, {} new, {} removed, {} matches, {} workers)",
            root.display(),
            start_time.elapsed().as_secs_f64(),
            walked.files.len(),
            walked.new_files.len(),
            removed_files.len(),
            occurrence,
            workers
        );

        Ok(ScanReport {
            occurrence,
            new_files: walked.new_files,
            removed_files,
            files: walked.files,
        })
    }

    /// Depth-first walk feeding file paths to the counters
    fn walk(
        &self,
        root: &Path,
        baseline: &Baseline,
        path_tx: Sender<PathBuf>,
    ) -> Result<Walked, ScanError> {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(self.config.follow_symlinks);
        if !self.config.excluded_files.is_empty() {
            let excluded = self.config.excluded_files.clone();
            let names: HashSet<OsString> = excluded
                .iter()
                .filter_map(|path| path.file_name().map(|name| name.to_os_string()))
                .collect();
            builder.filter_entry(move |entry| {
                !(names.contains(entry.file_name()) && is_excluded(&excluded, entry.path()))
            });
        }
        let walker = builder.build();

        let mut walked = Walked {
            files: Vec::new(),
            found: HashSet::new(),
            new_files: Vec::new(),
        };

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_symlink_loop(&err) => {
                    debug!("Skipping symlink loop: {}", err);
                    continue;
                }
                Err(source) => {
                    return Err(ScanError::Traversal {
                        root: root.to_path_buf(),
                        source,
                    });
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            let key = path.to_string_lossy().into_owned();
            if !walked.found.insert(key.clone()) {
                continue;
            }
            if baseline.is_new(&key) {
                walked.new_files.push(key.clone());
            }
            walked.files.push(key);

            if path_tx.send(path).is_err() {
                // Counters stopped after a fault; the aggregator reports it
                break;
            }
        }

        Ok(walked)
    }
}

/// Compared by canonical parent directory, so `./dirwatch.db` and an
/// absolute path to the same file agree
fn is_excluded(excluded: &HashSet<PathBuf>, path: &Path) -> bool {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return false;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .is_ok_and(|dir| excluded.contains(&dir.join(name)))
}

fn is_symlink_loop(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Loop { .. } => true,
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => is_symlink_loop(err),
        _ => false,
    }
}

fn count_worker<F>(
    worker_id: usize,
    count: &F,
    path_rx: Receiver<PathBuf>,
    count_tx: Sender<Result<u64, ScanError>>,
) where
    F: Fn(&Path) -> Result<u64, ScanError> + Sync,
{
    while let Ok(path) = path_rx.recv() {
        let counted = count(&path);
        trace!("[worker-{}] {} -> {:?}", worker_id, path.display(), counted);
        let failed = counted.is_err();
        if count_tx.send(counted).is_err() || failed {
            break;
        }
    }
}

fn aggregate(count_rx: Receiver<Result<u64, ScanError>>) -> Result<u64, ScanError> {
    let mut total = 0u64;
    for counted in count_rx {
        total += counted?;
    }
    Ok(total)
}

fn panic_message(payload: Box<dyn Any + Send + 'static>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
