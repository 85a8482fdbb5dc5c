//! Result artifacts and progress reporting.

mod csv;
mod json;
pub mod progress;
mod ranking;
pub mod reporter;
mod types;

pub use csv::write_results_csv;
pub use json::ResultsFile;
pub use ranking::{compare_reports, rank_reports, render_top_files, write_top_files};
pub use reporter::{
    HumanReporter, NdjsonReporter, NullReporter, ProgressReporter, ProgressSnapshot,
    ProgressTracker, ScanSummary, create_reporter,
};
pub use types::{FailureKind, FileError, ScoreReport};
