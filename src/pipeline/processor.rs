//! Single file analysis pipeline.

use crate::detect::{
    Chirp, ChirpDetector, ChirpParams, ClickParams, ClickTrain, ClickTrainDetector,
    DenoiseParams, Denoiser, estimate_snr_db,
};
use crate::ears::{AcousticRecord, decode_ears_file};
use crate::error::Result;
use crate::output::ScoreReport;
use crate::scoring::{DetectionSummary, InterestingnessScorer, ScoreBreakdown};
use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Turns one recording into a [`ScoreReport`].
///
/// Implementations must be callable from several worker threads at once.
pub trait FileAnalyzer: Sync {
    /// Analyze one file.
    fn analyze(&self, path: &Path) -> Result<ScoreReport>;
}

/// Everything produced while analyzing one recording.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Chirps found.
    pub chirps: Vec<Chirp>,
    /// Click trains found.
    pub trains: Vec<ClickTrain>,
    /// Estimated broadband SNR in dB.
    pub snr_db: f64,
    /// Aggregates over the detections.
    pub summary: DetectionSummary,
    /// Score and sub-scores.
    pub breakdown: ScoreBreakdown,
}

/// Decode, detect and score EARS recordings.
#[derive(Debug)]
pub struct EarsAnalyzer {
    denoiser: Option<Denoiser>,
    chirps: ChirpDetector,
    clicks: ClickTrainDetector,
    scorer: InterestingnessScorer,
}

impl EarsAnalyzer {
    /// Build an analyzer from detector parameters, with default denoising.
    pub fn new(chirp_params: ChirpParams, click_params: ClickParams) -> Result<Self> {
        Ok(Self {
            denoiser: Some(Denoiser::new(DenoiseParams::default())?),
            chirps: ChirpDetector::new(chirp_params)?,
            clicks: ClickTrainDetector::new(click_params),
            scorer: InterestingnessScorer::new(),
        })
    }

    /// Replace the denoising stage; `enabled = false` removes it.
    pub fn with_denoise(mut self, params: DenoiseParams) -> Result<Self> {
        self.denoiser = if params.enabled {
            Some(Denoiser::new(params)?)
        } else {
            None
        };
        Ok(self)
    }

    /// Run detectors and the scorer over a decoded record.
    ///
    /// Detectors see the denoised signal; the SNR is estimated on the raw
    /// one.
    pub fn analyze_record(&self, record: &AcousticRecord) -> Result<Analysis> {
        let samples = record.normalized();
        let rate = record.sample_rate();

        let cleaned = match &self.denoiser {
            Some(denoiser) => Cow::Owned(denoiser.denoise(&samples)),
            None => Cow::Borrowed(samples.as_slice()),
        };

        let chirps = self.chirps.detect_samples(&cleaned, rate)?;
        let trains = self.clicks.detect_samples(&cleaned, rate)?;
        let snr_db = estimate_snr_db(&samples, rate);

        let summary = DetectionSummary::from_events(&chirps, &trains, record.duration_secs());
        let breakdown = self.scorer.score_summary(&summary, snr_db);

        Ok(Analysis {
            chirps,
            trains,
            snr_db,
            summary,
            breakdown,
        })
    }
}

impl FileAnalyzer for EarsAnalyzer {
    fn analyze(&self, path: &Path) -> Result<ScoreReport> {
        let started = Instant::now();

        let record = decode_ears_file(path)?;
        let analysis = self.analyze_record(&record)?;

        debug!(
            "Analyzed {} in {:.2}s: score {:.1}, {} chirps, {} click trains, SNR {:.1} dB",
            path.display(),
            started.elapsed().as_secs_f64(),
            analysis.breakdown.total,
            analysis.chirps.len(),
            analysis.trains.len(),
            analysis.snr_db
        );

        Ok(ScoreReport::new(
            path,
            record.start(),
            record.duration_secs(),
            &analysis.summary,
            analysis.breakdown,
            analysis.snr_db,
        ))
    }
}
