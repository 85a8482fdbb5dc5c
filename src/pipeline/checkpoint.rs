//! Versioned, digest-protected checkpoint of a scan's progress.
//!
//! On disk the checkpoint is an envelope around the body:
//!
//! ```json
//! { "format": "earscan-checkpoint", "version": 1, "digest": "<sha256>", "body": { ... } }
//! ```
//!
//! The digest covers the compact JSON rendering of the body, so a truncated
//! or hand-edited file is rejected on resume instead of silently skewing the
//! run.

use crate::constants::schema::{CHECKPOINT_FORMAT, CHECKPOINT_VERSION};
use crate::error::{Error, Result};
use crate::output::{FileError, ScoreReport};
use crate::utils::fs::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Parameters fixed when a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Number of files the run aims to process.
    pub target: usize,
    /// Sampler seed.
    pub seed: u64,
    /// Manifest the run samples from.
    pub manifest: String,
    /// When the run first started.
    pub started_at: DateTime<Utc>,
}

/// Accumulated state of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Run parameters.
    pub run: RunInfo,
    /// Successfully scored files, in completion order.
    pub results: Vec<ScoreReport>,
    /// Files that failed, in completion order.
    pub errors: Vec<FileError>,
    /// Time of the last save.
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    digest: String,
    body: serde_json::Value,
}

impl Checkpoint {
    /// Empty checkpoint for a new run.
    pub fn new(run: RunInfo) -> Self {
        let last_updated = run.started_at;
        Self {
            run,
            results: Vec::new(),
            errors: Vec::new(),
            last_updated,
        }
    }

    /// Files processed so far, successes and failures alike.
    pub fn processed(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    /// Successfully scored files with at least one detection.
    pub fn hits(&self) -> usize {
        self.results.iter().filter(|r| r.is_hit()).count()
    }

    /// Identifiers of every processed file.
    pub fn processed_files(&self) -> HashSet<&str> {
        self.results
            .iter()
            .map(|r| r.file.as_str())
            .chain(self.errors.iter().map(|e| e.file.as_str()))
            .collect()
    }

    /// Append a successful result.
    pub fn record_result(&mut self, report: ScoreReport) {
        self.results.push(report);
    }

    /// Append a failure.
    pub fn record_error(&mut self, error: FileError) {
        self.errors.push(error);
    }

    /// Persist atomically to `path`, stamping `last_updated`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        let body = serde_json::to_value(&*self).map_err(|e| Error::JsonSerialize {
            what: "checkpoint",
            source: e,
        })?;
        let envelope = Envelope {
            format: CHECKPOINT_FORMAT.to_string(),
            version: CHECKPOINT_VERSION,
            digest: digest_of(&body)?,
            body,
        };
        let json = serde_json::to_vec_pretty(&envelope).map_err(|e| Error::JsonSerialize {
            what: "checkpoint",
            source: e,
        })?;

        write_atomic(path, &json).map_err(|e| Error::CheckpointWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(
            "Checkpoint saved: {} results, {} errors",
            self.results.len(),
            self.errors.len()
        );
        Ok(())
    }

    /// Load and validate a checkpoint. Returns `Ok(None)` if none exists.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(corrupt(path, format!("cannot read: {e}")));
            }
        };

        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(path, format!("not a checkpoint envelope: {e}")))?;

        if envelope.format != CHECKPOINT_FORMAT {
            return Err(corrupt(path, format!("unknown format '{}'", envelope.format)));
        }
        if envelope.version != CHECKPOINT_VERSION {
            return Err(corrupt(
                path,
                format!("unsupported version {}", envelope.version),
            ));
        }
        if digest_of(&envelope.body)? != envelope.digest {
            return Err(corrupt(path, "digest mismatch".to_string()));
        }

        let checkpoint: Self = serde_json::from_value(envelope.body)
            .map_err(|e| corrupt(path, format!("malformed body: {e}")))?;
        checkpoint.validate(path)?;
        Ok(Some(checkpoint))
    }

    /// Check internal consistency.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for file in self
            .results
            .iter()
            .map(|r| r.file.as_str())
            .chain(self.errors.iter().map(|e| e.file.as_str()))
        {
            if !seen.insert(file) {
                return Err(corrupt(path, format!("file '{file}' recorded twice")));
            }
        }

        for report in &self.results {
            let scores = [
                report.score,
                report.chirp_score,
                report.click_score,
                report.snr_score,
            ];
            if scores.iter().any(|s| !s.is_finite() || *s < 0.0) || report.score > 100.0 {
                return Err(corrupt(
                    path,
                    format!("file '{}' has an out-of-range score", report.file),
                ));
            }
        }
        Ok(())
    }

    /// Delete the checkpoint file if present.
    pub fn remove(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::CheckpointWrite {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

fn digest_of(body: &serde_json::Value) -> Result<String> {
    let canonical = serde_json::to_vec(body).map_err(|e| Error::JsonSerialize {
        what: "checkpoint",
        source: e,
    })?;
    let hash = Sha256::digest(&canonical);
    Ok(hash.iter().map(|b| format!("{b:02x}")).collect())
}

fn corrupt(path: &Path, reason: String) -> Error {
    Error::CheckpointCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::FailureKind;
    use crate::scoring::{DetectionSummary, ScoreBreakdown};
    use tempfile::TempDir;

    fn run_info() -> RunInfo {
        RunInfo {
            target: 10,
            seed: 99,
            manifest: "files.txt".to_string(),
            started_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn report(name: &str, score: f64) -> ScoreReport {
        ScoreReport::new(
            Path::new(name),
            DateTime::<Utc>::UNIX_EPOCH,
            12.5,
            &DetectionSummary {
                n_chirps: 2,
                chirp_coverage: 0.125,
                mean_ici_secs: Some(0.0123),
                ..DetectionSummary::default()
            },
            ScoreBreakdown {
                chirp: score,
                click: 0.0,
                snr: 0.0,
                total: score,
            },
            7.25,
        )
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");

        let mut checkpoint = Checkpoint::new(run_info());
        checkpoint.record_result(report("/d/7000.190", 12.345_678_9));
        checkpoint.record_error(FileError {
            file: "/d/7001.190".to_string(),
            kind: FailureKind::CorruptFile,
            reason: "short".to_string(),
        });
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.processed(), 2);
        assert_eq!(loaded.hits(), 1);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(Checkpoint::load(&dir.path().join("checkpoint.json")).unwrap().is_none());
    }

    #[test]
    fn test_tampered_checkpoint_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut checkpoint = Checkpoint::new(run_info());
        checkpoint.record_result(report("/d/7000.190", 10.0));
        checkpoint.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"target\": 10", "\"target\": 11")).unwrap();

        let err = Checkpoint::load(&path).unwrap_err();
        assert!(matches!(err, Error::CheckpointCorrupt { .. }), "{err}");
    }

    #[test]
    fn test_truncated_checkpoint_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{\"format\": \"earscan-checkpoint\", \"ver").unwrap();
        assert!(matches!(
            Checkpoint::load(&path).unwrap_err(),
            Error::CheckpointCorrupt { .. }
        ));
    }

    #[test]
    fn test_duplicate_file_rejected() {
        let mut checkpoint = Checkpoint::new(run_info());
        checkpoint.record_result(report("/d/7000.190", 10.0));
        checkpoint.record_error(FileError {
            file: "/d/7000.190".to_string(),
            kind: FailureKind::AnalysisFailed,
            reason: "x".to_string(),
        });
        assert!(checkpoint.validate(Path::new("c.json")).is_err());
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut checkpoint = Checkpoint::new(run_info());
        checkpoint.record_result(report("/d/7000.190", 140.0));
        assert!(checkpoint.validate(Path::new("c.json")).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        Checkpoint::remove(&path).unwrap();
        std::fs::write(&path, "{}").unwrap();
        Checkpoint::remove(&path).unwrap();
        assert!(!path.exists());
    }
}
