//! Error types for earscan.

use std::path::PathBuf;

/// Result type alias for earscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for earscan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Recording file is truncated, empty or otherwise malformed.
    #[error("corrupt recording '{path}': {reason}")]
    CorruptFile {
        /// Path to the recording.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Recording file could not be read.
    #[error("cannot read recording '{path}'")]
    UnreadableFile {
        /// Path to the recording.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File name does not identify a known recorder epoch.
    #[error("cannot determine recorder epoch from file name '{path}'")]
    UnsupportedEpoch {
        /// Path to the recording.
        path: PathBuf,
    },

    /// Decoded record violates its invariants.
    #[error("invalid acoustic record: {reason}")]
    InvalidRecord {
        /// Description of the violated invariant.
        reason: String,
    },

    /// A detector produced an event that violates its invariants.
    #[error("invalid detector event: {reason}")]
    InvalidEvent {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Checkpoint file exists but cannot be trusted.
    #[error("checkpoint '{path}' is corrupt: {reason}")]
    CheckpointCorrupt {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Why the checkpoint was rejected.
        reason: String,
    },

    /// Checkpoint does not belong to the requested run.
    #[error("checkpoint '{path}' does not match this run: {reason}")]
    CheckpointMismatch {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Description of the mismatch.
        reason: String,
    },

    /// Failed to persist the checkpoint.
    #[error("failed to write checkpoint '{path}'")]
    CheckpointWrite {
        /// Path to the checkpoint.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the manifest.
    #[error("failed to read manifest '{path}'")]
    ManifestRead {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Manifest lists no files.
    #[error("manifest '{path}' contains no file paths")]
    EmptyManifest {
        /// Path to the manifest.
        path: PathBuf,
    },

    /// Failed to write a result artifact.
    #[error("failed to write results file '{path}'")]
    ResultsWrite {
        /// Path to the results file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to serialize JSON.
    #[error("failed to serialize {what}")]
    JsonSerialize {
        /// What was being serialized.
        what: &'static str,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Another run holds the output directory.
    #[error("output directory is in use by another run (lock file {path})")]
    RunLocked {
        /// Path to the lock file.
        path: PathBuf,
    },

    /// Failed to create lock file.
    #[error("failed to create lock file '{path}'")]
    LockCreate {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a stale lock file.
    #[error("failed to remove stale lock file '{path}'")]
    LockRemove {
        /// Path to the lock file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Illegal scheduler state transition.
    #[error("illegal scheduler transition from {from} to {to}")]
    IllegalTransition {
        /// State the scheduler was in.
        from: &'static str,
        /// State that was requested.
        to: &'static str,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Stable snake_case identifier for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::ConfigDirNotFound => "config_dir_not_found",
            Self::ConfigRead { .. } => "config_read",
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::ConfigWrite { .. } => "config_write",
            Self::ConfigSerialize { .. } => "config_serialize",
            Self::CorruptFile { .. } => "corrupt_file",
            Self::UnreadableFile { .. } => "unreadable_file",
            Self::UnsupportedEpoch { .. } => "unsupported_epoch",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::InvalidEvent { .. } => "invalid_event",
            Self::CheckpointCorrupt { .. } => "checkpoint_corrupt",
            Self::CheckpointMismatch { .. } => "checkpoint_mismatch",
            Self::CheckpointWrite { .. } => "checkpoint_write",
            Self::ManifestRead { .. } => "manifest_read",
            Self::EmptyManifest { .. } => "empty_manifest",
            Self::ResultsWrite { .. } => "results_write",
            Self::JsonSerialize { .. } => "json_serialize",
            Self::RunLocked { .. } => "run_locked",
            Self::LockCreate { .. } => "lock_create",
            Self::LockRemove { .. } => "lock_remove",
            Self::OutputDirCreateFailed { .. } => "output_dir_create",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether this error concerns a single input file and should be
    /// recorded rather than abort the run.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::CorruptFile { .. }
                | Self::UnreadableFile { .. }
                | Self::UnsupportedEpoch { .. }
                | Self::InvalidRecord { .. }
                | Self::InvalidEvent { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let corrupt = Error::CorruptFile {
            path: PathBuf::from("a.bin"),
            reason: "short".to_string(),
        };
        assert!(corrupt.is_per_file());
        assert_eq!(corrupt.code(), "corrupt_file");

        let locked = Error::RunLocked {
            path: PathBuf::from(".earscan.lock"),
        };
        assert!(!locked.is_per_file());
        assert_eq!(locked.code(), "run_locked");
    }

    #[test]
    fn test_display_includes_path() {
        let err = Error::UnsupportedEpoch {
            path: PathBuf::from("zz.bin"),
        };
        assert!(err.to_string().contains("zz.bin"));
    }
}
