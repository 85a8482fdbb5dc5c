//! Binary EARS decoding.

use super::epoch::Epoch;
use super::record::{AcousticRecord, duration_delta};
use crate::constants::ears::{
    HEADER_SIZE, RECORD_SIZE, SAMPLE_RATE, SAMPLES_PER_RECORD, TIMESTAMP_HIGH_BIAS,
    TIMESTAMP_HIGH_DIVISOR, TIMESTAMP_OFFSET, TIMESTAMP_RATE,
};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Decode an EARS file into an [`AcousticRecord`].
///
/// The epoch is resolved from the file name before the file is read, so a
/// badly named file fails with [`Error::UnsupportedEpoch`] without I/O.
pub fn decode_ears_file(path: &Path) -> Result<AcousticRecord> {
    let epoch = Epoch::from_file_name(path)?;
    let bytes = std::fs::read(path).map_err(|e| Error::UnreadableFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_ears_bytes(path, &bytes, epoch)
}

/// Decode an in-memory EARS image. `path` is only used in error messages.
pub fn decode_ears_bytes(path: &Path, bytes: &[u8], epoch: Epoch) -> Result<AcousticRecord> {
    if bytes.is_empty() {
        return Err(Error::CorruptFile {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(Error::CorruptFile {
            path: path.to_path_buf(),
            reason: format!(
                "size {} is not a multiple of the {RECORD_SIZE}-byte record size",
                bytes.len()
            ),
        });
    }

    let n_records = bytes.len() / RECORD_SIZE;
    let origin = epoch.instant();
    let mut samples = Vec::with_capacity(n_records * SAMPLES_PER_RECORD);
    let mut timestamps = Vec::new();
    let mut previous_header: Option<&[u8]> = None;

    for record in bytes.chunks_exact(RECORD_SIZE) {
        let (header, payload) = record.split_at(HEADER_SIZE);

        samples.extend(
            payload
                .chunks_exact(2)
                .map(|pair| i16::from_be_bytes([pair[0], pair[1]])),
        );

        if previous_header != Some(header) {
            let mut counter = [0u8; 6];
            counter.copy_from_slice(&header[TIMESTAMP_OFFSET..HEADER_SIZE]);
            let secs = decode_timestamp_ticks(counter) / TIMESTAMP_RATE;
            timestamps.push(origin + duration_delta(secs));
            previous_header = Some(header);
        }
    }

    debug!(
        "Decoded {}: {} records, {} samples, {} timestamp changes",
        path.display(),
        n_records,
        samples.len(),
        timestamps.len()
    );

    AcousticRecord::new(samples, SAMPLE_RATE, timestamps)
}

/// Decode the 6-byte header timing counter into counter ticks.
///
/// The high byte carries a bias and scale, so the result is fractional in
/// general.
pub fn decode_timestamp_ticks(counter: [u8; 6]) -> f64 {
    let [s0, s1, s2, s3, s4, s5] = counter.map(f64::from);
    ((s0 - TIMESTAMP_HIGH_BIAS) / TIMESTAMP_HIGH_DIVISOR) * 2f64.powi(40)
        + s1 * 2f64.powi(32)
        + s2 * 2f64.powi(24)
        + s3 * 2f64.powi(16)
        + s4 * 2f64.powi(8)
        + s5
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record_bytes(counter: [u8; 6], fill: i16) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out[TIMESTAMP_OFFSET..].copy_from_slice(&counter);
        for _ in 0..SAMPLES_PER_RECORD {
            out.extend_from_slice(&fill.to_be_bytes());
        }
        out
    }

    #[test]
    fn test_ticks_with_bias_byte() {
        // s0 = 14 cancels the high term entirely.
        assert!((decode_timestamp_ticks([14, 0, 0, 0, 1, 0]) - 256.0).abs() < 1e-9);
        // s0 = 30 contributes exactly 2^40.
        let ticks = decode_timestamp_ticks([30, 0, 0, 0, 0, 5]);
        assert!((ticks - (2f64.powi(40) + 5.0)).abs() < 1e-3);
    }

    #[test]
    fn test_fractional_high_term() {
        // (22 - 14) / 16 = 0.5
        let ticks = decode_timestamp_ticks([22, 0, 0, 0, 0, 0]);
        assert!((ticks - 2f64.powi(39)).abs() < 1e-3);
    }

    #[test]
    fn test_samples_are_big_endian() {
        let bytes = record_bytes([14, 0, 0, 0, 0, 0], 0x0102);
        let record = decode_ears_bytes(Path::new("0000.bin"), &bytes, Epoch::Y2000).unwrap();
        assert_eq!(record.samples()[0], 0x0102);
        assert_eq!(record.len(), SAMPLES_PER_RECORD);
    }

    #[test]
    fn test_timestamp_only_recorded_on_header_change() {
        let mut bytes = record_bytes([14, 0, 0, 0, 125, 0], 0);
        bytes.extend(record_bytes([14, 0, 0, 0, 125, 0], 0));
        bytes.extend(record_bytes([14, 0, 0, 0, 250, 0], 0));

        let record = decode_ears_bytes(Path::new("0000.bin"), &bytes, Epoch::Y2000).unwrap();
        assert_eq!(record.header_timestamps().len(), 2);
        // 125 * 256 ticks at 32 kHz = 1 s after the epoch.
        assert_eq!(
            record.start() - Epoch::Y2000.instant(),
            TimeDelta::seconds(1)
        );
    }

    #[test]
    fn test_rejects_partial_record() {
        let mut bytes = record_bytes([14, 0, 0, 0, 0, 0], 0);
        bytes.push(0);
        let err = decode_ears_bytes(Path::new("0000.bin"), &bytes, Epoch::Y2000).unwrap_err();
        assert!(matches!(err, Error::CorruptFile { .. }));
    }

    #[test]
    fn test_rejects_empty_input() {
        let err = decode_ears_bytes(Path::new("0000.bin"), &[], Epoch::Y2000).unwrap_err();
        assert!(matches!(err, Error::CorruptFile { .. }));
    }
}
