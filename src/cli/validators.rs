//! CLI argument validators.

use crate::constants::MAX_WORKERS;

/// Parse a count that must be at least 1.
pub fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid count"))?;

    if value == 0 {
        return Err("value must be at least 1".to_string());
    }

    Ok(value)
}

/// Parse a worker count (1 to the pool limit).
pub fn parse_workers(s: &str) -> Result<usize, String> {
    let value = parse_positive(s)?;

    if value > MAX_WORKERS {
        return Err(format!(
            "workers must be between 1 and {MAX_WORKERS}, got {value}"
        ));
    }

    Ok(value)
}
