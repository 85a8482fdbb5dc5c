//! Platform-specific configuration paths.

use crate::constants::{APP_NAME, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Configuration directory for the current platform.
///
/// - Linux: `~/.config/earscan/`
/// - macOS: `~/Library/Application Support/earscan/`
/// - Windows: `%APPDATA%\earscan\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Full path to the config file.
///
/// `EARSCAN_CONFIG` points at an explicit file and takes precedence over
/// the platform directory.
pub fn config_file_path() -> Result<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_names_app() {
        let path = config_dir().unwrap();
        assert!(path.to_string_lossy().contains("earscan"));
    }

    #[test]
    fn test_config_file_path_is_toml() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }
}
