//! Decoded acoustic record.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};

/// One decoded recording: raw samples plus timing metadata.
///
/// Construction validates the record; it is immutable afterwards.
#[derive(Debug, Clone)]
pub struct AcousticRecord {
    samples: Vec<i16>,
    sample_rate: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration_secs: f64,
    header_timestamps: Vec<DateTime<Utc>>,
}

impl AcousticRecord {
    /// Build a record from samples and the distinct header timestamps seen
    /// while decoding. The first timestamp marks the recording start.
    pub fn new(
        samples: Vec<i16>,
        sample_rate: u32,
        header_timestamps: Vec<DateTime<Utc>>,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InvalidRecord {
                reason: "record has no samples".to_string(),
            });
        }
        if sample_rate == 0 {
            return Err(Error::InvalidRecord {
                reason: "sample rate must be positive".to_string(),
            });
        }
        let Some(&start) = header_timestamps.first() else {
            return Err(Error::InvalidRecord {
                reason: "record has no header timestamps".to_string(),
            });
        };

        #[allow(clippy::cast_precision_loss)]
        let duration_secs = samples.len() as f64 / f64::from(sample_rate);
        let end = start + duration_delta(duration_secs);

        Ok(Self {
            samples,
            sample_rate,
            start,
            end,
            duration_secs,
            header_timestamps,
        })
    }

    /// Raw samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Recording start (first header timestamp).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Recording end (start plus duration).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed record.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct header timestamps in file order.
    pub fn header_timestamps(&self) -> &[DateTime<Utc>] {
        &self.header_timestamps
    }

    /// Samples with the DC offset removed, scaled to roughly [-1, 1].
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn normalized(&self) -> Vec<f32> {
        let mean = self.samples.iter().map(|&s| f64::from(s)).sum::<f64>()
            / self.samples.len() as f64;

        self.samples
            .iter()
            .map(|&s| ((f64::from(s) - mean) / 32768.0) as f32)
            .collect()
    }
}

/// Convert fractional seconds to a nanosecond-precision delta.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn duration_delta(secs: f64) -> TimeDelta {
    TimeDelta::nanoseconds((secs * 1e9).round() as i64)
}
