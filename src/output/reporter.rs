//! Progress reporting for scans.
//!
//! The scheduler talks to a [`ProgressReporter`]; implementations decide
//! whether that becomes a progress bar with log lines, a stream of JSON
//! events, or nothing at all.

use crate::config::ProgressFormat;
use crate::output::progress::{create_file_progress, format_eta};
use indicatif::ProgressBar;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Progress at one point of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Files processed, including those restored from a checkpoint.
    pub completed: usize,
    /// Files the scan aims to process.
    pub target: usize,
    /// `completed / target`.
    pub fraction: f64,
    /// Throughput of this session in files per second.
    pub files_per_sec: f64,
    /// Estimated time to finish, if throughput is known.
    pub eta_secs: Option<f64>,
    /// Share of successfully scored files with at least one detection.
    pub hit_rate: f64,
    /// Files that failed so far.
    pub errors: usize,
}

/// Computes [`ProgressSnapshot`]s for one session of a scan.
#[derive(Debug)]
pub struct ProgressTracker {
    target: usize,
    resumed: usize,
    started: Instant,
}

impl ProgressTracker {
    /// Start tracking. `resumed` files were already done before this session.
    pub fn new(target: usize, resumed: usize) -> Self {
        Self {
            target,
            resumed,
            started: Instant::now(),
        }
    }

    /// Time since tracking started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Snapshot the given counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(
        &self,
        completed: usize,
        successes: usize,
        hits: usize,
        errors: usize,
    ) -> ProgressSnapshot {
        let elapsed = self.elapsed().as_secs_f64();
        let session = completed.saturating_sub(self.resumed);
        let files_per_sec = if elapsed > 0.0 {
            session as f64 / elapsed
        } else {
            0.0
        };
        let remaining = self.target.saturating_sub(completed);
        let eta_secs = (files_per_sec > 0.0).then(|| remaining as f64 / files_per_sec);

        ProgressSnapshot {
            completed,
            target: self.target,
            fraction: if self.target > 0 {
                (completed as f64 / self.target as f64).min(1.0)
            } else {
                1.0
            },
            files_per_sec,
            eta_secs,
            hit_rate: if successes > 0 {
                hits as f64 / successes as f64
            } else {
                0.0
            },
            errors,
        }
    }
}

/// Summary of a completed scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    /// Files the scan aimed to process.
    pub target: usize,
    /// Files successfully scored.
    pub n_analyzed: usize,
    /// Files that failed.
    pub n_errors: usize,
    /// Scored files with at least one detection.
    pub n_hits: usize,
    /// Wall time of the final session in seconds.
    pub elapsed_secs: f64,
}

/// Receives scan lifecycle events.
pub trait ProgressReporter: Send + Sync {
    /// The scan is about to start processing files.
    fn scan_started(&self, target: usize, already_done: usize, seed: u64);

    /// One file finished successfully.
    fn file_completed(&self, file: &Path, score: f64);

    /// One file failed.
    fn file_failed(&self, file: &Path, error_code: &str, message: &str);

    /// A checkpoint was just persisted.
    fn checkpoint(&self, snapshot: &ProgressSnapshot);

    /// The scan finished all its files.
    fn scan_completed(&self, summary: &ScanSummary);

    /// The scan stopped early on request.
    fn scan_interrupted(&self, processed: usize, target: usize);
}

/// Progress bar plus log lines.
pub struct HumanReporter {
    bar: Mutex<Option<ProgressBar>>,
    show_bar: bool,
}

impl HumanReporter {
    /// Create a reporter; `show_bar` enables the terminal progress bar.
    pub fn new(show_bar: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            show_bar,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }

    fn log(&self, message: &str) {
        let mut printed = false;
        self.with_bar(|bar| {
            bar.suspend(|| info!("{message}"));
            printed = true;
        });
        if !printed {
            info!("{message}");
        }
    }
}

impl ProgressReporter for HumanReporter {
    fn scan_started(&self, target: usize, already_done: usize, seed: u64) {
        if already_done > 0 {
            info!("Resuming scan: {already_done}/{target} files already processed (seed {seed})");
        } else {
            info!("Starting scan of {target} files (seed {seed})");
        }
        if let Some(bar) = create_file_progress(target, self.show_bar) {
            bar.set_position(already_done as u64);
            if let Ok(mut guard) = self.bar.lock() {
                *guard = Some(bar);
            }
        }
    }

    fn file_completed(&self, _file: &Path, _score: f64) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn file_failed(&self, file: &Path, error_code: &str, message: &str) {
        self.with_bar(|bar| {
            bar.inc(1);
            bar.suspend(|| warn!("{} failed ({error_code}): {message}", file.display()));
        });
        if !self.show_bar {
            warn!("{} failed ({error_code}): {message}", file.display());
        }
    }

    fn checkpoint(&self, snapshot: &ProgressSnapshot) {
        self.log(&format!(
            "Progress: {}/{} ({:.1}%) | {:.2} files/s | ETA {} | hit rate {:.1}% | {} errors",
            snapshot.completed,
            snapshot.target,
            snapshot.fraction * 100.0,
            snapshot.files_per_sec,
            format_eta(snapshot.eta_secs),
            snapshot.hit_rate * 100.0,
            snapshot.errors
        ));
    }

    fn scan_completed(&self, summary: &ScanSummary) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_and_clear();
        }
        info!(
            "Scan complete: {} analyzed, {} errors, {} with detections ({:.1}s)",
            summary.n_analyzed, summary.n_errors, summary.n_hits, summary.elapsed_secs
        );
    }

    fn scan_interrupted(&self, processed: usize, target: usize) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.abandon();
        }
        warn!("Scan interrupted at {processed}/{target} files; rerun with --resume to continue");
    }
}

/// One JSON object per line on a writer (stdout by default).
pub struct NdjsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    ScanStarted {
        target: usize,
        already_done: usize,
        seed: u64,
    },
    FileCompleted {
        file: String,
        score: f64,
    },
    FileFailed {
        file: String,
        error_code: &'a str,
        message: &'a str,
    },
    Checkpoint(&'a ProgressSnapshot),
    ScanCompleted(&'a ScanSummary),
    ScanInterrupted {
        processed: usize,
        target: usize,
    },
}

impl NdjsonReporter {
    /// Reporter writing to stdout.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Reporter writing to an arbitrary sink.
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn emit(&self, event: &Event<'_>) {
        let Ok(json) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{json}") {
                use std::sync::atomic::{AtomicBool, Ordering};
                static STDOUT_ERROR_LOGGED: AtomicBool = AtomicBool::new(false);
                if !STDOUT_ERROR_LOGGED.swap(true, Ordering::Relaxed) {
                    eprintln!("earscan: warning: failed to write event: {e} (subsequent errors suppressed)");
                }
            }
            let _ = writer.flush();
        }
    }
}

impl Default for NdjsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for NdjsonReporter {
    fn scan_started(&self, target: usize, already_done: usize, seed: u64) {
        self.emit(&Event::ScanStarted {
            target,
            already_done,
            seed,
        });
    }

    fn file_completed(&self, file: &Path, score: f64) {
        self.emit(&Event::FileCompleted {
            file: file.display().to_string(),
            score,
        });
    }

    fn file_failed(&self, file: &Path, error_code: &str, message: &str) {
        self.emit(&Event::FileFailed {
            file: file.display().to_string(),
            error_code,
            message,
        });
    }

    fn checkpoint(&self, snapshot: &ProgressSnapshot) {
        self.emit(&Event::Checkpoint(snapshot));
    }

    fn scan_completed(&self, summary: &ScanSummary) {
        self.emit(&Event::ScanCompleted(summary));
    }

    fn scan_interrupted(&self, processed: usize, target: usize) {
        self.emit(&Event::ScanInterrupted { processed, target });
    }
}

/// Reporter that discards everything.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn scan_started(&self, _target: usize, _already_done: usize, _seed: u64) {}
    fn file_completed(&self, _file: &Path, _score: f64) {}
    fn file_failed(&self, _file: &Path, _error_code: &str, _message: &str) {}
    fn checkpoint(&self, _snapshot: &ProgressSnapshot) {}
    fn scan_completed(&self, _summary: &ScanSummary) {}
    fn scan_interrupted(&self, _processed: usize, _target: usize) {}
}

/// Build the reporter for a progress format.
pub fn create_reporter(format: ProgressFormat, show_bar: bool) -> Box<dyn ProgressReporter> {
    match format {
        ProgressFormat::Human => Box::new(HumanReporter::new(show_bar)),
        ProgressFormat::Ndjson => Box::new(NdjsonReporter::new()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_counts() {
        let tracker = ProgressTracker::new(100, 40);
        let snap = tracker.snapshot(50, 45, 9, 5);
        assert_eq!(snap.completed, 50);
        assert!((snap.fraction - 0.5).abs() < 1e-12);
        assert!((snap.hit_rate - 0.2).abs() < 1e-12);
        assert_eq!(snap.errors, 5);
    }

    #[test]
    fn test_snapshot_without_successes() {
        let tracker = ProgressTracker::new(0, 0);
        let snap = tracker.snapshot(0, 0, 0, 0);
        assert!(snap.hit_rate.abs() < 1e-12);
        assert!((snap.fraction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ndjson_events() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reporter = NdjsonReporter::with_writer(SharedWriter(buffer.clone()));

        reporter.scan_started(10, 2, 42);
        reporter.file_failed(Path::new("/d/x.190"), "corrupt_file", "short");
        reporter.scan_interrupted(3, 10);

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"event\":\"scan_started\""));
        assert!(lines[0].contains("\"seed\":42"));
        assert!(lines[1].contains("\"error_code\":\"corrupt_file\""));
        assert!(lines[2].contains("\"event\":\"scan_interrupted\""));
    }
}
