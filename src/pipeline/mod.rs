//! Batch scan pipeline: sampling, per-file analysis, checkpointing.

pub mod cancel;
pub mod checkpoint;
pub mod manifest;
pub mod processor;
pub mod sampler;
pub mod scheduler;

pub use cancel::CancelToken;
pub use checkpoint::{Checkpoint, RunInfo};
pub use manifest::Manifest;
pub use processor::{Analysis, EarsAnalyzer, FileAnalyzer};
pub use sampler::Sampler;
pub use scheduler::{BatchScheduler, ScanOptions, ScanOutcome, SchedulerState};
