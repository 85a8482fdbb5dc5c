//! Aggregate statistics over one recording's detections.

use crate::constants::score::CLICK_REGULARITY_CV_LIMIT;
use crate::detect::stats::union_length;
use crate::detect::{Chirp, ClickTrain};

/// Per-recording aggregates that feed both the score and the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSummary {
    /// Number of chirps.
    pub n_chirps: usize,
    /// Fraction of the recording covered by at least one chirp.
    pub chirp_coverage: f64,
    /// Mean signed sweep rate in Hz/s.
    pub mean_sweep_rate_hz_per_s: f64,
    /// Mean absolute sweep rate in Hz/s.
    pub mean_abs_sweep_rate_hz_per_s: f64,
    /// Mean sweep range in Hz.
    pub mean_sweep_range_hz: f64,
    /// Largest sweep range in Hz.
    pub max_sweep_range_hz: f64,
    /// Number of click trains.
    pub n_click_trains: usize,
    /// Clicks across all trains.
    pub total_clicks: usize,
    /// Fraction of the recording covered by at least one click train.
    pub click_coverage: f64,
    /// Interval-weighted mean ICI across trains, if any train exists.
    pub mean_ici_secs: Option<f64>,
    /// Click-weighted mean ICI coefficient of variation, if any train exists.
    pub mean_ici_cv: Option<f64>,
    /// Click-weighted mean of `max(0, 1 - cv / limit)`, in [0, 1].
    pub click_regularity: f64,
}

impl DetectionSummary {
    /// Summarize detections over a recording of `duration_secs`.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_events(chirps: &[Chirp], trains: &[ClickTrain], duration_secs: f64) -> Self {
        let coverage = |intervals: &[(f64, f64)]| {
            if duration_secs > 0.0 {
                (union_length(intervals) / duration_secs).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let mut summary = Self {
            n_chirps: chirps.len(),
            n_click_trains: trains.len(),
            ..Self::default()
        };

        if !chirps.is_empty() {
            let n = chirps.len() as f64;
            let spans: Vec<(f64, f64)> = chirps
                .iter()
                .map(|c| (c.start_secs(), c.end_secs()))
                .collect();
            summary.chirp_coverage = coverage(&spans);
            summary.mean_sweep_rate_hz_per_s =
                chirps.iter().map(Chirp::sweep_rate_hz_per_s).sum::<f64>() / n;
            summary.mean_abs_sweep_rate_hz_per_s = chirps
                .iter()
                .map(|c| c.sweep_rate_hz_per_s().abs())
                .sum::<f64>()
                / n;
            summary.mean_sweep_range_hz =
                chirps.iter().map(Chirp::sweep_range_hz).sum::<f64>() / n;
            summary.max_sweep_range_hz = chirps
                .iter()
                .map(Chirp::sweep_range_hz)
                .fold(0.0, f64::max);
        }

        if !trains.is_empty() {
            let spans: Vec<(f64, f64)> = trains
                .iter()
                .map(|t| (t.start_secs(), t.end_secs()))
                .collect();
            summary.click_coverage = coverage(&spans);
            summary.total_clicks = trains.iter().map(ClickTrain::n_clicks).sum();

            let intervals: usize = trains.iter().map(|t| t.n_clicks() - 1).sum();
            let weighted_ici: f64 = trains
                .iter()
                .map(|t| t.mean_ici_secs() * (t.n_clicks() - 1) as f64)
                .sum();
            summary.mean_ici_secs = Some(weighted_ici / intervals as f64);

            let weighted_cv: f64 = trains
                .iter()
                .map(|t| t.ici_cv() * t.n_clicks() as f64)
                .sum();
            summary.mean_ici_cv = Some(weighted_cv / summary.total_clicks as f64);

            let weighted_regularity: f64 = trains
                .iter()
                .map(|t| {
                    (1.0 - t.ici_cv() / CLICK_REGULARITY_CV_LIMIT).max(0.0) * t.n_clicks() as f64
                })
                .sum();
            summary.click_regularity = weighted_regularity / summary.total_clicks as f64;
        }

        summary
    }

    /// Whether anything at all was detected.
    pub fn has_detections(&self) -> bool {
        self.n_chirps > 0 || self.n_click_trains > 0
    }
}
