//! Candidate file manifest.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered, de-duplicated list of candidate recordings.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    entries: Vec<PathBuf>,
}

impl Manifest {
    /// Load a manifest: one path per line, blank lines ignored, duplicates
    /// dropped keeping the first occurrence.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let manifest = Self::parse(path, &content);
        if manifest.entries.is_empty() {
            return Err(Error::EmptyManifest {
                path: path.to_path_buf(),
            });
        }
        Ok(manifest)
    }

    /// Build a manifest from text already in memory.
    pub fn parse(path: &Path, content: &str) -> Self {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut duplicates = 0usize;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if seen.insert(line) {
                entries.push(PathBuf::from(line));
            } else {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            debug!("Manifest {}: dropped {duplicates} duplicate entries", path.display());
        }

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Where the manifest was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Candidate paths in manifest order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no candidates.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
