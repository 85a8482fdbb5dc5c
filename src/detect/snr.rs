//! Broadband signal-to-noise estimate.

use super::stats::percentile;
use crate::constants::snr::{BLOCK_SECS, ENERGY_FLOOR, NOISE_PERCENTILE, SIGNAL_PERCENTILE};

/// Estimate broadband SNR in dB from short-block energies.
///
/// The loud blocks (95th percentile) stand in for signal and the quiet
/// blocks (10th percentile) for noise. The result is never negative.
pub fn estimate_snr_db(samples: &[f32], sample_rate: u32) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let block = ((BLOCK_SECS * f64::from(sample_rate)).round() as usize).max(1);

    #[allow(clippy::cast_precision_loss)]
    let energies: Vec<f64> = samples
        .chunks(block)
        .map(|chunk| {
            chunk.iter().map(|&s| f64::from(s).powi(2)).sum::<f64>() / chunk.len() as f64
        })
        .collect();

    let signal = percentile(&energies, SIGNAL_PERCENTILE);
    let noise = percentile(&energies, NOISE_PERCENTILE);
    let snr = 10.0 * ((signal + ENERGY_FLOOR) / (noise + ENERGY_FLOOR)).log10();
    if snr.is_finite() { snr.max(0.0) } else { 0.0 }
}
