//! Configuration validation.

use crate::config::Config;
use crate::constants::{MAX_WORKERS, denoise::MAX_LEVEL};
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_scan(config)?;
    validate_chirp(config)?;
    validate_clicks(config)?;

    if !(1..=MAX_LEVEL).contains(&config.denoise.level) {
        return Err(invalid(format!(
            "denoise.level must be between 1 and {MAX_LEVEL}, got {}",
            config.denoise.level
        )));
    }

    if config.output.top_n == 0 {
        return Err(invalid("output.top_n must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_scan(config: &Config) -> Result<()> {
    let scan = &config.scan;

    if scan.n_files == 0 {
        return Err(invalid("scan.n_files must be at least 1".to_string()));
    }
    if scan.checkpoint_interval == 0 {
        return Err(invalid(
            "scan.checkpoint_interval must be at least 1".to_string(),
        ));
    }
    if !(1..=MAX_WORKERS).contains(&scan.workers) {
        return Err(invalid(format!(
            "scan.workers must be between 1 and {MAX_WORKERS}, got {}",
            scan.workers
        )));
    }
    Ok(())
}

fn validate_chirp(config: &Config) -> Result<()> {
    let chirp = &config.chirp;

    if chirp.window_len < 2 || chirp.overlap >= chirp.window_len {
        return Err(invalid(format!(
            "chirp.overlap ({}) must be smaller than chirp.window_len ({})",
            chirp.overlap, chirp.window_len
        )));
    }
    if !(chirp.band_min_hz >= 0.0 && chirp.band_min_hz < chirp.band_max_hz) {
        return Err(invalid(format!(
            "chirp band must satisfy 0 <= band_min_hz < band_max_hz, got {}..{}",
            chirp.band_min_hz, chirp.band_max_hz
        )));
    }
    for (name, value) in [
        ("chirp.threshold_sigmas", chirp.threshold_sigmas),
        ("chirp.min_prominence_db", chirp.min_prominence_db),
        ("chirp.max_jump_hz", chirp.max_jump_hz),
        ("chirp.min_duration_secs", chirp.min_duration_secs),
    ] {
        non_negative(name, value)?;
    }
    if chirp.min_points < 2 {
        return Err(invalid("chirp.min_points must be at least 2".to_string()));
    }
    Ok(())
}

fn validate_clicks(config: &Config) -> Result<()> {
    let clicks = &config.clicks;

    for (name, value) in [
        ("clicks.smoothing_secs", clicks.smoothing_secs),
        ("clicks.threshold_sigmas", clicks.threshold_sigmas),
        ("clicks.relative_floor", clicks.relative_floor),
        ("clicks.refractory_secs", clicks.refractory_secs),
    ] {
        non_negative(name, value)?;
    }
    if !(clicks.max_ici_secs.is_finite() && clicks.max_ici_secs > 0.0) {
        return Err(invalid(format!(
            "clicks.max_ici_secs must be positive, got {}",
            clicks.max_ici_secs
        )));
    }
    if !(clicks.max_cv.is_finite() && clicks.max_cv > 0.0) {
        return Err(invalid(format!(
            "clicks.max_cv must be positive, got {}",
            clicks.max_cv
        )));
    }
    Ok(())
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative, got {value}")))
    }
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.scan.checkpoint_interval = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_too_many_workers() {
        let mut config = Config::default();
        config.scan.workers = MAX_WORKERS + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_overlap_not_below_window() {
        let mut config = Config::default();
        config.chirp.overlap = config.chirp.window_len;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_validate_inverted_band() {
        let mut config = Config::default();
        config.chirp.band_min_hz = 40_000.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_nan_threshold() {
        let mut config = Config::default();
        config.clicks.threshold_sigmas = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_denoise_level() {
        let mut config = Config::default();
        config.denoise.level = 0;
        assert!(validate_config(&config).is_err());
        config.denoise.level = 12;
        assert!(validate_config(&config).is_ok());
    }
}
