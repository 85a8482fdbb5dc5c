//! Short-time power spectral density using realfft.

use crate::error::{Error, Result};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::fmt;
use std::sync::Arc;

/// Frame-by-frame power spectral density.
///
/// Power is stored row-major: one row of `n_bins` values per frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    power: Vec<f64>,
    n_bins: usize,
    times: Vec<f64>,
    bin_hz: f64,
}

impl Spectrogram {
    /// Number of frames.
    pub fn n_frames(&self) -> usize {
        self.times.len()
    }

    /// Number of frequency bins per frame (window / 2 + 1).
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Bin spacing in Hz.
    pub fn bin_hz(&self) -> f64 {
        self.bin_hz
    }

    /// Centre time of every frame, in seconds from the first sample.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Power row for one frame.
    pub fn frame(&self, index: usize) -> &[f64] {
        &self.power[index * self.n_bins..(index + 1) * self.n_bins]
    }

    /// Index range of bins whose centre frequency lies in `[low_hz, high_hz]`.
    pub fn band(&self, low_hz: f64, high_hz: f64) -> std::ops::Range<usize> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let first = (low_hz / self.bin_hz).ceil().max(0.0) as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let last = ((high_hz / self.bin_hz).floor().max(0.0) as usize).min(self.n_bins - 1);
        first.min(last + 1)..last + 1
    }
}

/// Reusable FFT plan and window for computing spectrograms.
///
/// The plan is shared, so one builder can serve several worker threads.
pub struct SpectrogramBuilder {
    window_len: usize,
    hop: usize,
    window: Vec<f64>,
    window_power: f64,
    plan: Arc<dyn RealToComplex<f64>>,
}

impl fmt::Debug for SpectrogramBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrogramBuilder")
            .field("window_len", &self.window_len)
            .field("hop", &self.hop)
            .finish_non_exhaustive()
    }
}

impl SpectrogramBuilder {
    /// Plan a Hann-windowed STFT with the given window length and overlap.
    pub fn new(window_len: usize, overlap: usize) -> Result<Self> {
        if window_len < 4 || overlap >= window_len {
            return Err(Error::Internal {
                message: format!(
                    "invalid spectrogram geometry: window {window_len}, overlap {overlap}"
                ),
            });
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(window_len);

        #[allow(clippy::cast_precision_loss)]
        let denom = (window_len - 1) as f64;
        let window: Vec<f64> = (0..window_len)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64;
                0.5 * (1.0 - (2.0 * std::f64::consts::PI * x / denom).cos())
            })
            .collect();
        let window_power = window.iter().map(|w| w * w).sum();

        Ok(Self {
            window_len,
            hop: window_len - overlap,
            window,
            window_power,
            plan,
        })
    }

    /// Window length in samples.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Frame step in samples.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Compute the one-sided PSD of `samples`.
    ///
    /// Signals shorter than one window yield a spectrogram with no frames.
    pub fn compute(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram> {
        let fs = f64::from(sample_rate);
        let n_bins = self.window_len / 2 + 1;
        #[allow(clippy::cast_precision_loss)]
        let bin_hz = fs / self.window_len as f64;

        let n_frames = if samples.len() < self.window_len {
            0
        } else {
            (samples.len() - self.window_len) / self.hop + 1
        };

        let mut input = self.plan.make_input_vec();
        let mut spectrum: Vec<Complex<f64>> = self.plan.make_output_vec();
        let mut scratch = self.plan.make_scratch_vec();
        let mut power = Vec::with_capacity(n_frames * n_bins);
        let mut times = Vec::with_capacity(n_frames);
        let scale = 1.0 / (fs * self.window_power);

        for frame in 0..n_frames {
            let offset = frame * self.hop;
            let chunk = &samples[offset..offset + self.window_len];

            #[allow(clippy::cast_precision_loss)]
            let frame_mean =
                chunk.iter().map(|&s| f64::from(s)).sum::<f64>() / self.window.len() as f64;
            for ((slot, &s), w) in input.iter_mut().zip(chunk).zip(&self.window) {
                *slot = (f64::from(s) - frame_mean) * w;
            }

            self.plan
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .map_err(|e| Error::Internal {
                    message: format!("FFT failed: {e}"),
                })?;

            let last = spectrum.len() - 1;
            power.extend(spectrum.iter().enumerate().map(|(k, c)| {
                let p = c.norm_sqr() * scale;
                if k == 0 || (k == last && self.window_len % 2 == 0) {
                    p
                } else {
                    2.0 * p
                }
            }));

            #[allow(clippy::cast_precision_loss)]
            times.push((offset as f64 + self.window_len as f64 / 2.0) / fs);
        }

        Ok(Spectrogram {
            power,
            n_bins,
            times,
            bin_hz,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn tone(freq: f64, fs: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / f64::from(fs)).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_frame_count_and_centres() {
        let builder = SpectrogramBuilder::new(1024, 512).unwrap();
        let spec = builder.compute(&vec![0.0; 4096], 192_000).unwrap();
        assert_eq!(spec.n_frames(), 7);
        assert_eq!(spec.n_bins(), 513);
        assert!((spec.times()[0] - 512.0 / 192_000.0).abs() < 1e-12);
        assert!((spec.bin_hz() - 187.5).abs() < 1e-12);
    }

    #[test]
    fn test_short_signal_has_no_frames() {
        let builder = SpectrogramBuilder::new(1024, 512).unwrap();
        let spec = builder.compute(&[0.1; 100], 192_000).unwrap();
        assert_eq!(spec.n_frames(), 0);
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let builder = SpectrogramBuilder::new(1024, 512).unwrap();
        let spec = builder.compute(&tone(9_375.0, 192_000, 4096), 192_000).unwrap();
        let row = spec.frame(2);
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 50);
    }

    #[test]
    fn test_band_bounds() {
        let builder = SpectrogramBuilder::new(1024, 512).unwrap();
        let spec = builder.compute(&vec![0.0; 2048], 192_000).unwrap();
        let band = spec.band(3_000.0, 30_000.0);
        assert_eq!(band.start, 16);
        assert_eq!(band.end, 161);
    }

    #[test]
    fn test_rejects_overlap_not_below_window() {
        assert!(SpectrogramBuilder::new(1024, 1024).is_err());
    }
}
