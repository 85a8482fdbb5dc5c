//! Output type definitions.

use crate::error::Error;
use crate::scoring::{DetectionSummary, ScoreBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-file analysis result.
///
/// Flat on purpose: every field maps to one CSV column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Full path of the recording, as listed in the manifest.
    pub file: String,
    /// File name component of `file`.
    pub filename: String,
    /// Recording start time.
    pub recording_start: DateTime<Utc>,
    /// Recording duration in seconds.
    pub duration_secs: f64,
    /// Total interestingness score in [0, 100].
    pub score: f64,
    /// Chirp sub-score.
    pub chirp_score: f64,
    /// Click sub-score.
    pub click_score: f64,
    /// SNR sub-score.
    pub snr_score: f64,
    /// Number of chirps.
    pub n_chirps: usize,
    /// Fraction of the recording covered by chirps.
    pub chirp_coverage: f64,
    /// Mean signed sweep rate in Hz/s.
    pub mean_sweep_rate_hz_per_s: f64,
    /// Mean sweep range in Hz.
    pub mean_sweep_range_hz: f64,
    /// Largest sweep range in Hz.
    pub max_sweep_range_hz: f64,
    /// Number of click trains.
    pub n_click_trains: usize,
    /// Clicks across all trains.
    pub total_clicks: usize,
    /// Fraction of the recording covered by click trains.
    pub click_coverage: f64,
    /// Mean inter-click interval in seconds.
    pub mean_ici_secs: Option<f64>,
    /// Mean ICI coefficient of variation.
    pub mean_ici_cv: Option<f64>,
    /// Estimated broadband SNR in dB.
    pub snr_db: f64,
}

impl ScoreReport {
    /// Assemble a report from a file's analysis products.
    pub fn new(
        path: &Path,
        recording_start: DateTime<Utc>,
        duration_secs: f64,
        summary: &DetectionSummary,
        breakdown: ScoreBreakdown,
        snr_db: f64,
    ) -> Self {
        Self {
            file: path.display().to_string(),
            filename: file_name_of(path),
            recording_start,
            duration_secs,
            score: breakdown.total,
            chirp_score: breakdown.chirp,
            click_score: breakdown.click,
            snr_score: breakdown.snr,
            n_chirps: summary.n_chirps,
            chirp_coverage: summary.chirp_coverage,
            mean_sweep_rate_hz_per_s: summary.mean_sweep_rate_hz_per_s,
            mean_sweep_range_hz: summary.mean_sweep_range_hz,
            max_sweep_range_hz: summary.max_sweep_range_hz,
            n_click_trains: summary.n_click_trains,
            total_clicks: summary.total_clicks,
            click_coverage: summary.click_coverage,
            mean_ici_secs: summary.mean_ici_secs,
            mean_ici_cv: summary.mean_ici_cv,
            snr_db,
        }
    }

    /// Whether the file had at least one chirp or click train.
    pub fn is_hit(&self) -> bool {
        self.n_chirps > 0 || self.n_click_trains > 0
    }
}

/// Why a file could not be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed file contents.
    CorruptFile,
    /// File could not be read.
    UnreadableFile,
    /// File name does not identify an epoch.
    UnsupportedEpoch,
    /// Detection or scoring failed.
    AnalysisFailed,
}

impl FailureKind {
    /// Snake-case name as written to result files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CorruptFile => "corrupt_file",
            Self::UnreadableFile => "unreadable_file",
            Self::UnsupportedEpoch => "unsupported_epoch",
            Self::AnalysisFailed => "analysis_failed",
        }
    }
}

impl From<&Error> for FailureKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::CorruptFile { .. } => Self::CorruptFile,
            Error::UnreadableFile { .. } => Self::UnreadableFile,
            Error::UnsupportedEpoch { .. } => Self::UnsupportedEpoch,
            _ => Self::AnalysisFailed,
        }
    }
}

/// A file that failed analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// Full path of the recording.
    pub file: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub reason: String,
}

impl FileError {
    /// Record a per-file failure.
    pub fn from_error(path: &Path, err: &Error) -> Self {
        Self {
            file: path.display().to_string(),
            kind: FailureKind::from(err),
            reason: error_chain(err),
        }
    }
}

/// Error message followed by its sources, joined with `: `.
fn error_chain(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_failure_kind_from_error() {
        let err = Error::UnreadableFile {
            path: PathBuf::from("/x/71621DC7.190"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let record = FileError::from_error(Path::new("/x/71621DC7.190"), &err);
        assert_eq!(record.kind, FailureKind::UnreadableFile);
        assert!(record.reason.contains("gone"));

        let err = Error::InvalidEvent {
            reason: "bad".to_string(),
        };
        assert_eq!(FailureKind::from(&err), FailureKind::AnalysisFailed);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::UnsupportedEpoch).unwrap();
        assert_eq!(json, "\"unsupported_epoch\"");
        assert_eq!(FailureKind::CorruptFile.as_str(), "corrupt_file");
    }

    #[test]
    fn test_report_file_name() {
        let report = ScoreReport::new(
            Path::new("/data/disk1/71621DC7.190"),
            DateTime::<Utc>::UNIX_EPOCH,
            10.0,
            &DetectionSummary::default(),
            ScoreBreakdown::default(),
            0.0,
        );
        assert_eq!(report.filename, "71621DC7.190");
        assert_eq!(report.file, "/data/disk1/71621DC7.190");
        assert!(!report.is_hit());
    }
}
