//! Click-train detection from a Teager-Kaiser energy envelope.

use super::stats::{coefficient_of_variation, mean, median, robust_sigma};
use crate::constants::clicks as defaults;
use crate::ears::AcousticRecord;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable click detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickParams {
    /// Envelope smoothing length in seconds.
    pub smoothing_secs: f64,
    /// Threshold over the envelope median, in robust standard deviations.
    pub threshold_sigmas: f64,
    /// Threshold floor as a fraction of the envelope maximum.
    pub relative_floor: f64,
    /// Minimum spacing between clicks in seconds.
    pub refractory_secs: f64,
    /// Interval that splits two trains, in seconds.
    pub max_ici_secs: f64,
    /// Fewest clicks in a kept train.
    pub min_clicks: usize,
    /// Largest ICI coefficient of variation in a kept train.
    pub max_cv: f64,
}

impl Default for ClickParams {
    fn default() -> Self {
        Self {
            smoothing_secs: defaults::SMOOTHING_SECS,
            threshold_sigmas: defaults::THRESHOLD_SIGMAS,
            relative_floor: defaults::RELATIVE_FLOOR,
            refractory_secs: defaults::REFRACTORY_SECS,
            max_ici_secs: defaults::MAX_ICI_SECS,
            min_clicks: defaults::MIN_CLICKS,
            max_cv: defaults::MAX_CV,
        }
    }
}

/// A run of regularly spaced clicks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickTrain {
    click_times: Vec<f64>,
    mean_ici_secs: f64,
    ici_cv: f64,
}

impl ClickTrain {
    /// Build a train from click times in seconds.
    ///
    /// Times must be finite and strictly increasing, with at least two
    /// clicks.
    pub fn new(click_times: Vec<f64>) -> Result<Self> {
        if click_times.len() < defaults::MIN_CLICKS_FLOOR {
            return Err(Error::InvalidEvent {
                reason: format!("click train needs at least {} clicks", defaults::MIN_CLICKS_FLOOR),
            });
        }
        if click_times.iter().any(|t| !t.is_finite()) {
            return Err(Error::InvalidEvent {
                reason: "click train has a non-finite time".to_string(),
            });
        }
        if click_times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidEvent {
                reason: "click times are not strictly increasing".to_string(),
            });
        }

        let icis: Vec<f64> = click_times.windows(2).map(|w| w[1] - w[0]).collect();
        let mean_ici_secs = mean(&icis);
        let ici_cv = coefficient_of_variation(&icis).unwrap_or(0.0);

        Ok(Self {
            click_times,
            mean_ici_secs,
            ici_cv,
        })
    }

    /// Click times in seconds from the recording start.
    pub fn click_times(&self) -> &[f64] {
        &self.click_times
    }

    /// Number of clicks.
    pub fn n_clicks(&self) -> usize {
        self.click_times.len()
    }

    /// Mean inter-click interval in seconds.
    pub fn mean_ici_secs(&self) -> f64 {
        self.mean_ici_secs
    }

    /// Population coefficient of variation of the inter-click intervals.
    pub fn ici_cv(&self) -> f64 {
        self.ici_cv
    }

    /// Time of the first click.
    pub fn start_secs(&self) -> f64 {
        self.click_times.first().copied().unwrap_or_default()
    }

    /// Time of the last click.
    pub fn end_secs(&self) -> f64 {
        self.click_times.last().copied().unwrap_or_default()
    }
}

/// Finds click trains in a recording.
#[derive(Debug, Clone)]
pub struct ClickTrainDetector {
    params: ClickParams,
}

impl ClickTrainDetector {
    /// Create a detector. `min_clicks` is raised to 2 if configured lower.
    pub fn new(mut params: ClickParams) -> Self {
        params.min_clicks = params.min_clicks.max(defaults::MIN_CLICKS_FLOOR);
        Self { params }
    }

    /// Active parameters.
    pub fn params(&self) -> &ClickParams {
        &self.params
    }

    /// Detect click trains in a decoded record.
    pub fn detect(&self, record: &AcousticRecord) -> Result<Vec<ClickTrain>> {
        self.detect_samples(&record.normalized(), record.sample_rate())
    }

    /// Detect click trains in normalized samples.
    pub fn detect_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<ClickTrain>> {
        let fs = f64::from(sample_rate);
        let envelope = self.envelope(samples, fs);
        let clicks = self.pick_clicks(&envelope, fs);

        let mut trains = Vec::new();
        let mut candidate: Vec<f64> = Vec::new();
        for &t in &clicks {
            if candidate
                .last()
                .is_some_and(|&prev| t - prev > self.params.max_ici_secs)
            {
                self.accept(std::mem::take(&mut candidate), &mut trains)?;
            }
            candidate.push(t);
        }
        self.accept(candidate, &mut trains)?;

        debug!(
            "Click detection: {} clicks, {} trains",
            clicks.len(),
            trains.len()
        );
        Ok(trains)
    }

    fn accept(&self, times: Vec<f64>, trains: &mut Vec<ClickTrain>) -> Result<()> {
        if times.len() < self.params.min_clicks {
            return Ok(());
        }
        let train = ClickTrain::new(times)?;
        if train.ici_cv() < self.params.max_cv {
            trains.push(train);
        }
        Ok(())
    }

    /// Smoothed Teager-Kaiser energy.
    fn envelope(&self, samples: &[f32], fs: f64) -> Vec<f64> {
        let n = samples.len();
        let mut tkeo = vec![0.0; n];
        for i in 1..n.saturating_sub(1) {
            let x = f64::from(samples[i]);
            let prev = f64::from(samples[i - 1]);
            let next = f64::from(samples[i + 1]);
            tkeo[i] = (x * x - prev * next).abs();
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = ((self.params.smoothing_secs * fs).round() as usize).max(1);
        moving_average(&tkeo, width)
    }

    /// Times of envelope peaks that clear the adaptive threshold.
    #[allow(clippy::cast_precision_loss)]
    fn pick_clicks(&self, envelope: &[f64], fs: f64) -> Vec<f64> {
        let max_env = envelope.iter().copied().fold(0.0, f64::max);
        if max_env <= 0.0 {
            return Vec::new();
        }
        let center = median(envelope);
        let threshold = (center + self.params.threshold_sigmas * robust_sigma(envelope, center))
            .max(self.params.relative_floor * max_env);

        // Strongest sample of each contiguous above-threshold run.
        let mut peaks: Vec<(usize, f64)> = Vec::new();
        let mut run: Option<(usize, f64)> = None;
        for (i, &v) in envelope.iter().enumerate() {
            if v > threshold {
                run = match run {
                    Some((_, best)) if best >= v => run,
                    _ => Some((i, v)),
                };
            } else if let Some(peak) = run.take() {
                peaks.push(peak);
            }
        }
        if let Some(peak) = run {
            peaks.push(peak);
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let refractory = (self.params.refractory_secs * fs).round() as usize;
        let mut kept: Vec<(usize, f64)> = Vec::with_capacity(peaks.len());
        for peak in peaks {
            match kept.last_mut() {
                Some(last) if peak.0 - last.0 < refractory => {
                    if peak.1 > last.1 {
                        *last = peak;
                    }
                }
                _ => kept.push(peak),
            }
        }

        kept.into_iter().map(|(i, _)| i as f64 / fs).collect()
    }
}

/// Centred moving average with edge windows truncated to the signal.
fn moving_average(values: &[f64], width: usize) -> Vec<f64> {
    let n = values.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &v in values {
        acc += v;
        prefix.push(acc);
    }

    let before = (width - 1) / 2;
    let after = width - 1 - before;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(n);
            #[allow(clippy::cast_precision_loss)]
            let len = (hi - lo) as f64;
            (prefix[hi] - prefix[lo]) / len
        })
        .collect()
}
