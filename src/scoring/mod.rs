//! Interestingness scoring.
//!
//! The score is a sum of three bounded sub-scores (chirps, click trains and
//! SNR), each built from saturating terms so that piling on more of the same
//! evidence stops paying off past a fixed point.

mod summary;

pub use summary::DetectionSummary;

use crate::constants::score as weights;
use crate::detect::{Chirp, ClickTrain};
use serde::{Deserialize, Serialize};

/// Sub-scores and total for one recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Chirp sub-score in [0, 40].
    pub chirp: f64,
    /// Click sub-score in [0, 40].
    pub click: f64,
    /// SNR sub-score in [0, 20].
    pub snr: f64,
    /// Total in [0, 100].
    pub total: f64,
}

/// Combines detector output into a bounded interestingness score.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestingnessScorer;

impl InterestingnessScorer {
    /// Create a scorer.
    pub fn new() -> Self {
        Self
    }

    /// Score a recording from its detections.
    pub fn score(
        &self,
        chirps: &[Chirp],
        trains: &[ClickTrain],
        snr_db: f64,
        duration_secs: f64,
    ) -> ScoreBreakdown {
        let summary = DetectionSummary::from_events(chirps, trains, duration_secs);
        self.score_summary(&summary, snr_db)
    }

    /// Score precomputed aggregates.
    pub fn score_summary(&self, summary: &DetectionSummary, snr_db: f64) -> ScoreBreakdown {
        let chirp = chirp_score(summary);
        let click = click_score(summary);
        let snr = snr_score(snr_db);
        ScoreBreakdown {
            chirp,
            click,
            snr,
            total: (chirp + click + snr).clamp(0.0, weights::MAX_TOTAL),
        }
    }
}

/// `points * min(1, value / saturation)`, with non-finite or negative
/// input scoring zero.
fn saturating(points: f64, value: f64, saturation: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    points * (value / saturation).min(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn chirp_score(s: &DetectionSummary) -> f64 {
    if s.n_chirps == 0 {
        return 0.0;
    }
    let total = saturating(
        weights::CHIRP_COVERAGE_POINTS,
        s.chirp_coverage,
        weights::CHIRP_COVERAGE_SATURATION,
    ) + saturating(
        weights::CHIRP_RANGE_POINTS,
        s.mean_sweep_range_hz,
        weights::CHIRP_RANGE_SATURATION_HZ,
    ) + saturating(
        weights::CHIRP_RATE_POINTS,
        s.mean_abs_sweep_rate_hz_per_s,
        weights::CHIRP_RATE_SATURATION_HZ_PER_S,
    ) + saturating(
        weights::CHIRP_COUNT_POINTS,
        s.n_chirps as f64,
        weights::CHIRP_COUNT_SATURATION,
    );
    total.min(weights::CHIRP_MAX)
}

#[allow(clippy::cast_precision_loss)]
fn click_score(s: &DetectionSummary) -> f64 {
    if s.n_click_trains == 0 {
        return 0.0;
    }
    let regularity = if s.click_regularity.is_finite() {
        weights::CLICK_REGULARITY_POINTS * s.click_regularity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let total = saturating(
        weights::CLICK_COVERAGE_POINTS,
        s.click_coverage,
        weights::CLICK_COVERAGE_SATURATION,
    ) + saturating(
        weights::CLICK_COUNT_POINTS,
        s.total_clicks as f64,
        weights::CLICK_COUNT_SATURATION,
    ) + regularity;
    total.min(weights::CLICK_MAX)
}

fn snr_score(snr_db: f64) -> f64 {
    if !snr_db.is_finite() {
        return 0.0;
    }
    weights::SNR_MAX * (snr_db / weights::SNR_CEILING_DB).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn chirp(start: f64, end: f64, f0: f64, f1: f64) -> Chirp {
        Chirp::new(
            start,
            end,
            f0.min(f1),
            f0.max(f1),
            (f1 - f0) / (end - start),
            -40.0,
            96_000.0,
        )
        .unwrap()
    }

    fn train(start: f64, n: usize, ici: f64) -> ClickTrain {
        #[allow(clippy::cast_precision_loss)]
        let times = (0..n).map(|i| start + i as f64 * ici).collect();
        ClickTrain::new(times).unwrap()
    }

    #[test]
    fn test_no_detections_scores_snr_only() {
        let score = InterestingnessScorer::new().score(&[], &[], 15.0, 10.0);
        assert_eq!(score.chirp, 0.0);
        assert_eq!(score.click, 0.0);
        assert!((score.snr - 10.0).abs() < 1e-12);
        assert!((score.total - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_chirp_components() {
        // 1 s of a 10 s file, 10 kHz range, 10 kHz/s.
        let chirps = [chirp(2.0, 3.0, 5_000.0, 15_000.0)];
        let score = InterestingnessScorer::new().score(&chirps, &[], 0.0, 10.0);
        // coverage 0.1 -> 4, range -> 10, rate 10k/20k -> 2.5, count 1/20 -> 0.25
        assert!((score.chirp - 16.75).abs() < 1e-9, "{}", score.chirp);
    }

    #[test]
    fn test_overlapping_chirps_count_coverage_once() {
        let a = [chirp(0.0, 1.0, 5_000.0, 6_000.0)];
        let b = [
            chirp(0.0, 1.0, 5_000.0, 6_000.0),
            chirp(0.0, 1.0, 5_000.0, 6_000.0),
        ];
        let sa = DetectionSummary::from_events(&a, &[], 10.0);
        let sb = DetectionSummary::from_events(&b, &[], 10.0);
        assert_eq!(sa.chirp_coverage, sb.chirp_coverage);
    }

    #[test]
    fn test_regular_train_earns_full_regularity() {
        let trains = [train(1.0, 20, 0.01)];
        let summary = DetectionSummary::from_events(&[], &trains, 10.0);
        assert!((summary.click_regularity - 1.0).abs() < 1e-6);
        assert_eq!(summary.total_clicks, 20);
        assert!((summary.mean_ici_secs.unwrap() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_sub_scores_saturate() {
        let chirps: Vec<Chirp> = (0..40)
            .map(|i| {
                let start = f64::from(i) * 0.25;
                chirp(start, start + 0.25, 3_000.0, 28_000.0)
            })
            .collect();
        let trains: Vec<ClickTrain> = (0..10)
            .map(|i| train(f64::from(i), 100, 0.009))
            .collect();
        let score = InterestingnessScorer::new().score(&chirps, &trains, 100.0, 10.0);
        assert!((score.chirp - 40.0).abs() < 1e-6);
        assert!((score.click - 40.0).abs() < 1e-6);
        assert_eq!(score.snr, 20.0);
        assert!((score.total - 100.0).abs() < 1e-6);
        assert!(score.total <= 100.0);
    }

    #[test]
    fn test_non_finite_snr_scores_zero() {
        let scorer = InterestingnessScorer::new();
        assert_eq!(scorer.score(&[], &[], f64::NAN, 1.0).snr, 0.0);
        assert_eq!(scorer.score(&[], &[], f64::INFINITY, 1.0).snr, 0.0);
        assert_eq!(scorer.score(&[], &[], -5.0, 1.0).snr, 0.0);
    }

    #[test]
    fn test_monotonic_in_coverage() {
        let scorer = InterestingnessScorer::new();
        let base = DetectionSummary::from_events(
            &[chirp(0.0, 0.5, 5_000.0, 10_000.0)],
            &[train(1.0, 10, 0.01)],
            10.0,
        );
        let mut previous = scorer.score_summary(&base, 10.0);
        for step in 1..=20 {
            let coverage = f64::from(step) * 0.05;
            let summary = DetectionSummary {
                chirp_coverage: coverage,
                click_coverage: coverage,
                ..base.clone()
            };
            let score = scorer.score_summary(&summary, 10.0);
            assert!(score.chirp >= previous.chirp);
            assert!(score.click >= previous.click);
            assert!(score.total <= 100.0);
            previous = score;
        }
    }

    #[test]
    fn test_deterministic() {
        let chirps = [chirp(0.5, 1.5, 8_000.0, 4_000.0)];
        let trains = [train(2.0, 12, 0.02)];
        let scorer = InterestingnessScorer::new();
        let a = scorer.score(&chirps, &trains, 12.0, 5.0);
        let b = scorer.score(&chirps, &trains, 12.0, 5.0);
        assert_eq!(a, b);
        assert!((0.0..=100.0).contains(&a.total));
    }
}
