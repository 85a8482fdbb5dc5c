//! Recorder epoch resolution.

use crate::constants::ears::{EPOCH_2000_UNIX_SECS, EPOCH_2015_UNIX_SECS};
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;

/// Reference instant that header timing counters count from.
///
/// The recorder family is identified by the first character of the file
/// name: newer units write names starting with `7` and count from
/// 2015-10-27, older units count from 2000-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    /// 2000-01-01T00:00:00Z.
    Y2000,
    /// 2015-10-27T00:00:00Z.
    Y2015,
}

impl Epoch {
    /// Resolve the epoch from a recording path's file name.
    pub fn from_file_name(path: &Path) -> Result<Self> {
        let first = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.chars().next());

        match first {
            Some('7') => Ok(Self::Y2015),
            Some(c) if c.is_ascii_hexdigit() => Ok(Self::Y2000),
            _ => Err(Error::UnsupportedEpoch {
                path: path.to_path_buf(),
            }),
        }
    }

    /// The epoch as a UTC instant.
    pub fn instant(self) -> DateTime<Utc> {
        let secs = match self {
            Self::Y2000 => EPOCH_2000_UNIX_SECS,
            Self::Y2015 => EPOCH_2015_UNIX_SECS,
        };
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seven_prefix_uses_2015_epoch() {
        let epoch = Epoch::from_file_name(Path::new("/data/71621DC7.190")).unwrap();
        assert_eq!(epoch, Epoch::Y2015);
        assert_eq!(
            epoch.instant(),
            Utc.with_ymd_and_hms(2015, 10, 27, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_other_hex_prefix_uses_2000_epoch() {
        for name in ["0A1B2C3D.130", "6FFF0000.190", "a0000001.130", "F1234567.190"] {
            let epoch = Epoch::from_file_name(Path::new(name)).unwrap();
            assert_eq!(epoch, Epoch::Y2000, "{name}");
        }
        assert_eq!(
            Epoch::Y2000.instant(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_non_hex_prefix_is_unsupported() {
        for name in ["zebra.bin", "_71621DC7.190", ".hidden"] {
            let err = Epoch::from_file_name(Path::new(name)).unwrap_err();
            assert!(matches!(err, Error::UnsupportedEpoch { .. }), "{name}");
        }
    }

    #[test]
    fn test_empty_file_name_is_unsupported() {
        assert!(Epoch::from_file_name(Path::new("/")).is_err());
        assert!(Epoch::from_file_name(Path::new("")).is_err());
    }
}
