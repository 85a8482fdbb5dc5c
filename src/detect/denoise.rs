//! Wavelet shrinkage denoising.
//!
//! The signal is decomposed with a multilevel orthogonal Daubechies DWT
//! (periodic extension), every coefficient band is shrunk against the
//! universal threshold `sigma * sqrt(2 ln N)`, and the result is
//! reconstructed. `sigma` is estimated from the MAD of the finest detail
//! band.

use super::stats::median;
use crate::constants::{MAD_TO_SIGMA, denoise as defaults};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Orthogonal wavelet family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wavelet {
    /// Daubechies, 4 vanishing moments.
    Db4,
    /// Daubechies, 8 vanishing moments.
    #[default]
    Db8,
}

impl Wavelet {
    fn scaling_filter(self) -> &'static [f64] {
        match self {
            Self::Db4 => &defaults::DB4,
            Self::Db8 => &defaults::DB8,
        }
    }
}

/// How coefficients below the threshold are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shrinkage {
    /// Zero small coefficients and pull the rest toward zero.
    #[default]
    Soft,
    /// Zero small coefficients and keep the rest.
    Hard,
}

/// Tunable denoising parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    /// Denoise before detection.
    pub enabled: bool,
    /// Wavelet family.
    pub wavelet: Wavelet,
    /// Decomposition depth; reduced for short signals.
    pub level: usize,
    /// Thresholding rule.
    pub shrinkage: Shrinkage,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            enabled: true,
            wavelet: Wavelet::Db8,
            level: defaults::LEVEL,
            shrinkage: Shrinkage::Soft,
        }
    }
}

/// Wavelet denoiser with precomputed analysis filters.
#[derive(Debug, Clone)]
pub struct Denoiser {
    params: DenoiseParams,
    low: &'static [f64],
    high: Vec<f64>,
}

impl Denoiser {
    /// Create a denoiser. The level must be in `1..=12`.
    pub fn new(params: DenoiseParams) -> Result<Self> {
        if !(1..=defaults::MAX_LEVEL).contains(&params.level) {
            return Err(Error::Internal {
                message: format!(
                    "denoise level {} outside 1..={}",
                    params.level,
                    defaults::MAX_LEVEL
                ),
            });
        }

        let low = params.wavelet.scaling_filter();
        let taps = low.len();
        let high = (0..taps)
            .map(|j| {
                let h = low[taps - 1 - j];
                if j % 2 == 0 { h } else { -h }
            })
            .collect();

        Ok(Self { params, low, high })
    }

    /// Active parameters.
    pub fn params(&self) -> &DenoiseParams {
        &self.params
    }

    /// Denoise with the universal threshold.
    pub fn denoise(&self, samples: &[f32]) -> Vec<f32> {
        self.denoise_with_threshold(samples, None).0
    }

    /// Denoise with an explicit threshold, or the universal threshold when
    /// `threshold` is `None`. Returns the samples and the threshold used.
    ///
    /// The output has the input's length and zero mean.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn denoise_with_threshold(&self, samples: &[f32], threshold: Option<f64>) -> (Vec<f32>, f64) {
        let n = samples.len();
        if n == 0 {
            return (Vec::new(), 0.0);
        }

        let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;
        let mut x: Vec<f64> = samples.iter().map(|&s| f64::from(s) - mean).collect();

        let taps = self.low.len();
        let mut level = self.params.level;
        while level > 0 && (n >> level) < taps {
            level -= 1;
        }
        if level == 0 {
            return (x.iter().map(|&v| v as f32).collect(), 0.0);
        }

        // Mirror the tail so every level halves an even length.
        let block = 1usize << level;
        let padded = n.div_ceil(block) * block;
        for i in n..padded {
            x.push(x[n - 1 - (i - n) % n]);
        }

        let mut details = Vec::with_capacity(level);
        let mut approx = x;
        for _ in 0..level {
            let (a, d) = self.analyze(&approx);
            details.push(d);
            approx = a;
        }

        let threshold = threshold.unwrap_or_else(|| universal_threshold(&details[0], n));
        let shrink = |band: &mut [f64]| match self.params.shrinkage {
            Shrinkage::Soft => band.iter_mut().for_each(|v| *v = soft(*v, threshold)),
            Shrinkage::Hard => band.iter_mut().for_each(|v| *v = hard(*v, threshold)),
        };
        shrink(approx.as_mut_slice());
        for band in &mut details {
            shrink(band.as_mut_slice());
        }

        let mut signal = approx;
        for detail in details.iter().rev() {
            signal = self.synthesize(&signal, detail);
        }

        trace!(
            "Denoised {n} samples at level {level} with threshold {threshold:.3e}"
        );
        (signal[..n].iter().map(|&v| v as f32).collect(), threshold)
    }

    /// One analysis step: approximation and detail at half length.
    fn analyze(&self, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let len = x.len();
        let half = len / 2;
        let mut approx = vec![0.0; half];
        let mut detail = vec![0.0; half];
        for k in 0..half {
            let (mut a, mut d) = (0.0, 0.0);
            for (j, (&h, &g)) in self.low.iter().zip(&self.high).enumerate() {
                let v = x[(2 * k + j) % len];
                a += h * v;
                d += g * v;
            }
            approx[k] = a;
            detail[k] = d;
        }
        (approx, detail)
    }

    /// Inverse of [`Self::analyze`].
    fn synthesize(&self, approx: &[f64], detail: &[f64]) -> Vec<f64> {
        let len = approx.len() * 2;
        let mut x = vec![0.0; len];
        for (k, (&a, &d)) in approx.iter().zip(detail).enumerate() {
            for (j, (&h, &g)) in self.low.iter().zip(&self.high).enumerate() {
                x[(2 * k + j) % len] += h * a + g * d;
            }
        }
        x
    }
}

/// VisuShrink threshold from the finest detail band.
#[allow(clippy::cast_precision_loss)]
fn universal_threshold(finest: &[f64], n: usize) -> f64 {
    let magnitudes: Vec<f64> = finest.iter().map(|v| v.abs()).collect();
    let sigma = median(&magnitudes) * MAD_TO_SIGMA;
    sigma * (2.0 * (n as f64).ln()).sqrt()
}

fn soft(v: f64, t: f64) -> f64 {
    if v.abs() < t { 0.0 } else { v.signum() * (v.abs() - t) }
}

fn hard(v: f64, t: f64) -> f64 {
    if v.abs() < t { 0.0 } else { v }
}
