//! Resumable, checkpointed batch scan.
//!
//! The scheduler samples files from a manifest, fans them out to a pool of
//! worker threads and collects their outcomes on its own thread, which is
//! the only place the [`Checkpoint`] is mutated. Every `checkpoint_interval`
//! processed files the checkpoint is persisted atomically, so a crash loses
//! at most that many files of work.

use crate::constants::{
    DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_SAMPLE_COUNT, DEFAULT_TOP_N, DEFAULT_WORKERS, MAX_WORKERS,
    artifacts,
};
use crate::error::{Error, Result};
use crate::locking::RunLock;
use crate::output::{
    FileError, ProgressReporter, ProgressTracker, ResultsFile, ScanSummary, ScoreReport,
    rank_reports, write_results_csv, write_top_files,
};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::checkpoint::{Checkpoint, RunInfo};
use crate::pipeline::manifest::Manifest;
use crate::pipeline::processor::FileAnalyzer;
use crate::pipeline::sampler::Sampler;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, info, warn};

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, not yet started.
    Idle,
    /// Taking the lock, reading the manifest and checkpoint.
    Loading,
    /// Workers are processing files.
    Running,
    /// Persisting the checkpoint.
    Checkpointing,
    /// All files processed and results written.
    Completed,
    /// Stopped early on request.
    Interrupted,
}

impl SchedulerState {
    /// Lowercase name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::Checkpointing => "checkpointing",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Loading)
                | (Self::Loading | Self::Checkpointing, Self::Running)
                | (
                    Self::Running,
                    Self::Checkpointing | Self::Completed | Self::Interrupted
                )
                | (Self::Checkpointing, Self::Interrupted)
        )
    }
}

/// Parameters of one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// File listing candidate recordings.
    pub manifest: PathBuf,
    /// Number of files to sample and process.
    pub n_files: usize,
    /// Directory for the checkpoint, lock and results.
    pub output_dir: PathBuf,
    /// Persist the checkpoint every this many processed files.
    pub checkpoint_interval: usize,
    /// Continue from an existing checkpoint instead of starting over.
    pub resume: bool,
    /// Sampler seed; taken from the checkpoint or drawn at random if unset.
    pub seed: Option<u64>,
    /// Number of worker threads.
    pub workers: usize,
    /// Rows in `top_files.txt`.
    pub top_n: usize,
    /// Also write `results.csv`.
    pub write_csv: bool,
}

impl ScanOptions {
    /// Options with default tuning for the given manifest and output directory.
    pub fn new(manifest: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            n_files: DEFAULT_SAMPLE_COUNT,
            output_dir: output_dir.into(),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            resume: false,
            seed: None,
            workers: DEFAULT_WORKERS,
            top_n: DEFAULT_TOP_N,
            write_csv: true,
        }
    }

    /// Path of the checkpoint artifact.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join(artifacts::CHECKPOINT)
    }
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Every sampled file was processed and results were written.
    Completed(ScanSummary),
    /// Cancellation stopped the scan; the checkpoint holds `processed` files.
    Interrupted {
        /// Files processed, including resumed ones.
        processed: usize,
        /// Files the scan was aiming for.
        target: usize,
    },
}

/// What a worker hands to the writer for one file.
#[derive(Debug)]
enum FileOutcome {
    Scored(ScoreReport),
    Failed(FileError),
}

/// Drives a scan from manifest to results.
pub struct BatchScheduler<'a> {
    options: ScanOptions,
    analyzer: &'a dyn FileAnalyzer,
    reporter: &'a dyn ProgressReporter,
    cancel: CancelToken,
    state: SchedulerState,
    saved_at: Option<usize>,
}

impl<'a> BatchScheduler<'a> {
    /// Create an idle scheduler.
    pub fn new(
        options: ScanOptions,
        analyzer: &'a dyn FileAnalyzer,
        reporter: &'a dyn ProgressReporter,
        cancel: CancelToken,
    ) -> Self {
        Self {
            options,
            analyzer,
            reporter,
            cancel,
            state: SchedulerState::Idle,
            saved_at: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run the scan to completion or interruption.
    pub fn run(&mut self) -> Result<ScanOutcome> {
        self.transition(SchedulerState::Loading)?;

        let output_dir = self.options.output_dir.clone();
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::OutputDirCreateFailed {
            path: output_dir.clone(),
            source: e,
        })?;
        let _lock = RunLock::acquire(&output_dir)?;

        let manifest = Manifest::load(&self.options.manifest)?;
        info!(
            "Loaded manifest {} with {} candidate files",
            manifest.path().display(),
            manifest.len()
        );

        let checkpoint_path = self.options.checkpoint_path();
        let mut checkpoint = self.open_checkpoint(&checkpoint_path, &manifest)?;
        let pending = draw_pending(&manifest, &checkpoint, self.options.n_files);

        let already_done = checkpoint.processed();
        let target = already_done + pending.len();
        let tracker = ProgressTracker::new(target, already_done);

        self.transition(SchedulerState::Running)?;
        self.reporter
            .scan_started(target, already_done, checkpoint.run.seed);

        self.process(pending, &mut checkpoint, &checkpoint_path, &tracker)?;

        // Workers have all returned; persist whatever the writer collected.
        if self.saved_at != Some(checkpoint.processed()) {
            self.persist(&mut checkpoint, &checkpoint_path, &tracker)?;
        }

        if self.cancel.is_cancelled() && checkpoint.processed() < target {
            self.transition(SchedulerState::Interrupted)?;
            let processed = checkpoint.processed();
            self.reporter.scan_interrupted(processed, target);
            return Ok(ScanOutcome::Interrupted { processed, target });
        }

        self.transition(SchedulerState::Completed)?;
        let summary = self.finish(checkpoint, &checkpoint_path, &tracker)?;
        self.reporter.scan_completed(&summary);
        Ok(ScanOutcome::Completed(summary))
    }

    fn transition(&mut self, next: SchedulerState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        debug!("Scheduler {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(())
    }

    /// Load the checkpoint when resuming, otherwise start a fresh one.
    fn open_checkpoint(&self, path: &Path, manifest: &Manifest) -> Result<Checkpoint> {
        let n_files = self.options.n_files;
        let manifest_name = manifest.path().display().to_string();

        let existing = if self.options.resume {
            Checkpoint::load(path)?
        } else {
            if path.exists() {
                warn!(
                    "Discarding stale checkpoint {} (use --resume to continue it)",
                    path.display()
                );
                Checkpoint::remove(path)?;
            }
            None
        };

        let Some(mut checkpoint) = existing else {
            if self.options.resume {
                info!("No checkpoint found in {}; starting a new scan", path.display());
            }
            let seed = self
                .options
                .seed
                .unwrap_or_else(|| Sampler::from_entropy().seed());
            return Ok(Checkpoint::new(RunInfo {
                target: n_files,
                seed,
                manifest: manifest_name,
                started_at: Utc::now(),
            }));
        };

        if checkpoint.processed() > n_files {
            return Err(Error::CheckpointMismatch {
                path: path.to_path_buf(),
                reason: format!(
                    "checkpoint holds {} files but the scan targets {n_files}",
                    checkpoint.processed()
                ),
            });
        }
        if checkpoint.run.manifest != manifest_name {
            warn!(
                "Checkpoint was started from manifest {}, resuming with {}",
                checkpoint.run.manifest, manifest_name
            );
            checkpoint.run.manifest = manifest_name;
        }
        if checkpoint.run.target != n_files {
            info!(
                "Scan target changed from {} to {n_files}",
                checkpoint.run.target
            );
            checkpoint.run.target = n_files;
        }
        if let Some(seed) = self.options.seed {
            checkpoint.run.seed = seed;
        }

        info!(
            "Resuming from checkpoint: {} results, {} errors",
            checkpoint.results.len(),
            checkpoint.errors.len()
        );
        Ok(checkpoint)
    }

    /// Fan files out to workers and collect their outcomes on this thread.
    fn process(
        &mut self,
        pending: Vec<PathBuf>,
        checkpoint: &mut Checkpoint,
        checkpoint_path: &Path,
        tracker: &ProgressTracker,
    ) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let workers = self.options.workers.clamp(1, MAX_WORKERS).min(pending.len());
        debug!("Processing {} files with {workers} workers", pending.len());

        let queue = Mutex::new(VecDeque::from(pending));
        let cancel = self.cancel.clone();
        let analyzer = self.analyzer;
        let (tx, rx) = mpsc::channel::<FileOutcome>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let (queue, cancel) = (&queue, &cancel);
                scope.spawn(move || work(analyzer, queue, cancel, &tx));
            }
            drop(tx);

            let drained = self.collect(&rx, checkpoint, checkpoint_path, tracker);
            if drained.is_err() {
                cancel.cancel();
            }
            drained
        })
    }

    /// Single writer: ingest outcomes until every worker has hung up.
    fn collect(
        &mut self,
        rx: &Receiver<FileOutcome>,
        checkpoint: &mut Checkpoint,
        checkpoint_path: &Path,
        tracker: &ProgressTracker,
    ) -> Result<()> {
        let interval = self.options.checkpoint_interval.max(1);

        for outcome in rx {
            match outcome {
                FileOutcome::Scored(report) => {
                    self.reporter
                        .file_completed(Path::new(&report.file), report.score);
                    checkpoint.record_result(report);
                }
                FileOutcome::Failed(failure) => {
                    self.reporter.file_failed(
                        Path::new(&failure.file),
                        failure.kind.as_str(),
                        &failure.reason,
                    );
                    checkpoint.record_error(failure);
                }
            }

            if checkpoint.processed() % interval == 0 {
                self.persist(checkpoint, checkpoint_path, tracker)?;
            }
        }
        Ok(())
    }

    fn persist(
        &mut self,
        checkpoint: &mut Checkpoint,
        checkpoint_path: &Path,
        tracker: &ProgressTracker,
    ) -> Result<()> {
        self.transition(SchedulerState::Checkpointing)?;
        checkpoint.save(checkpoint_path)?;
        self.saved_at = Some(checkpoint.processed());
        let snapshot = tracker.snapshot(
            checkpoint.processed(),
            checkpoint.results.len(),
            checkpoint.hits(),
            checkpoint.errors.len(),
        );
        self.reporter.checkpoint(&snapshot);
        self.transition(SchedulerState::Running)
    }

    /// Write the result artifacts and drop the checkpoint.
    fn finish(
        &self,
        checkpoint: Checkpoint,
        checkpoint_path: &Path,
        tracker: &ProgressTracker,
    ) -> Result<ScanSummary> {
        let dir = &self.options.output_dir;
        let n_hits = checkpoint.hits();
        let Checkpoint {
            run,
            mut results,
            errors,
            ..
        } = checkpoint;

        rank_reports(&mut results);
        write_top_files(&dir.join(artifacts::TOP_FILES), &results, self.options.top_n)?;
        if self.options.write_csv {
            write_results_csv(&dir.join(artifacts::RESULTS_CSV), &results)?;
        }
        let results_file = ResultsFile::new(run.target, results, errors);
        results_file.write(&dir.join(artifacts::RESULTS_JSON))?;

        Checkpoint::remove(checkpoint_path)?;
        info!("Results written to {}", dir.display());

        Ok(ScanSummary {
            target: run.target,
            n_analyzed: results_file.n_analyzed,
            n_errors: results_file.n_errors,
            n_hits,
            elapsed_secs: tracker.elapsed().as_secs_f64(),
        })
    }
}

/// Files still to process: manifest minus checkpointed files, sampled down
/// to whatever the target still needs.
fn draw_pending(manifest: &Manifest, checkpoint: &Checkpoint, n_files: usize) -> Vec<PathBuf> {
    let needed = n_files.saturating_sub(checkpoint.processed());
    let done = checkpoint.processed_files();
    let candidates: Vec<PathBuf> = manifest
        .entries()
        .iter()
        .filter(|p| !done.contains(p.display().to_string().as_str()))
        .cloned()
        .collect();

    if candidates.len() < needed {
        warn!(
            "Manifest supplies only {} unprocessed files, {needed} requested; using all of them",
            candidates.len()
        );
    }

    Sampler::with_seed(checkpoint.run.seed).sample(&candidates, needed)
}

fn work(
    analyzer: &dyn FileAnalyzer,
    queue: &Mutex<VecDeque<PathBuf>>,
    cancel: &CancelToken,
    tx: &Sender<FileOutcome>,
) {
    while !cancel.is_cancelled() {
        let next = queue.lock().ok().and_then(|mut q| q.pop_front());
        let Some(path) = next else {
            break;
        };

        let outcome = match analyzer.analyze(&path) {
            Ok(report) => FileOutcome::Scored(report),
            Err(e) => {
                debug!("{} failed: {e}", path.display());
                FileOutcome::Failed(FileError::from_error(&path, &e))
            }
        };
        if tx.send(outcome).is_err() {
            break;
        }
    }
}
