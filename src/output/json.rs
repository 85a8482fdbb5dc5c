//! Final `results.json` artifact.

use crate::constants::schema::{RESULTS_FORMAT, RESULTS_VERSION};
use crate::error::{Error, Result};
use crate::output::{FileError, ScoreReport};
use crate::utils::fs::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level structure of `results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    /// Always `earscan-results`.
    pub format: String,
    /// Schema version.
    pub version: u32,
    /// When the file was written.
    pub generated_at: DateTime<Utc>,
    /// Number of files the run aimed to process.
    pub target: usize,
    /// Files successfully scored.
    pub n_analyzed: usize,
    /// Files that failed.
    pub n_errors: usize,
    /// Scored files, best first.
    pub results: Vec<ScoreReport>,
    /// Failed files.
    pub errors: Vec<FileError>,
}

impl ResultsFile {
    /// Assemble the artifact. `results` should already be ranked.
    pub fn new(target: usize, results: Vec<ScoreReport>, errors: Vec<FileError>) -> Self {
        Self {
            format: RESULTS_FORMAT.to_string(),
            version: RESULTS_VERSION,
            generated_at: Utc::now(),
            target,
            n_analyzed: results.len(),
            n_errors: errors.len(),
            results,
            errors,
        }
    }

    /// Write atomically as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| Error::JsonSerialize {
            what: "results",
            source: e,
        })?;
        write_atomic(path, &json).map_err(|e| Error::ResultsWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Read a previously written results file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::ResultsWrite {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }
}
