//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_OUTPUT_DIR, DEFAULT_SAMPLE_COUNT, DEFAULT_TOP_N,
    DEFAULT_WORKERS,
};
use crate::detect::{ChirpParams, ClickParams, DenoiseParams};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan settings.
    pub scan: ScanConfig,

    /// Wavelet denoising applied before detection.
    pub denoise: DenoiseParams,

    /// Chirp detector parameters.
    pub chirp: ChirpParams,

    /// Click-train detector parameters.
    pub clicks: ClickParams,

    /// Output settings.
    pub output: OutputConfig,
}

/// Scan defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of files to sample.
    pub n_files: usize,

    /// Processed files between checkpoints.
    pub checkpoint_interval: usize,

    /// Analysis worker threads.
    pub workers: usize,

    /// Fixed sampler seed.
    pub seed: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            n_files: DEFAULT_SAMPLE_COUNT,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            workers: DEFAULT_WORKERS,
            seed: None,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for checkpoint and results.
    pub dir: PathBuf,

    /// Rows in `top_files.txt`.
    pub top_n: usize,

    /// Also write `results.csv`.
    pub write_csv: bool,

    /// How progress is reported.
    pub progress: ProgressFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            top_n: DEFAULT_TOP_N,
            write_csv: true,
            progress: ProgressFormat::Human,
        }
    }
}

/// Progress output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressFormat {
    /// Progress bar and log lines.
    #[default]
    Human,
    /// One JSON event per line on stdout.
    Ndjson,
}

impl std::fmt::Display for ProgressFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Ndjson => write!(f, "ndjson"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_format_display() {
        assert_eq!(ProgressFormat::Human.to_string(), "human");
        assert_eq!(ProgressFormat::Ndjson.to_string(), "ndjson");
    }

    #[test]
    fn test_scan_config_default_values() {
        let scan = ScanConfig::default();
        assert_eq!(scan.n_files, 1000);
        assert_eq!(scan.checkpoint_interval, 10);
        assert_eq!(scan.workers, 1);
        assert!(scan.seed.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[chirp]\nmax_jump_hz = 1500.0\n").unwrap_or_default();
        assert!((config.chirp.max_jump_hz - 1500.0).abs() < f64::EPSILON);
        assert_eq!(config.chirp.window_len, 1024);
        assert_eq!(config.clicks.min_clicks, 5);
    }

    #[test]
    fn test_denoise_section_parses() {
        let config: Config =
            toml::from_str("[denoise]\nwavelet = \"db4\"\nshrinkage = \"hard\"\n").unwrap_or_default();
        assert_eq!(config.denoise.wavelet, crate::detect::Wavelet::Db4);
        assert_eq!(config.denoise.shrinkage, crate::detect::Shrinkage::Hard);
        assert!(config.denoise.enabled);
        assert_eq!(config.denoise.level, 5);
    }
}
