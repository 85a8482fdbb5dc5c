//! Frequency-sweep ("chirp") detection.
//!
//! Each spectrogram frame contributes at most one spectral peak. Peaks that
//! stand clear of the frame's in-band background are linked across frames
//! into tracks, and tracks that last long enough become chirps.

use super::spectrogram::{Spectrogram, SpectrogramBuilder};
use super::stats::{median, robust_sigma};
use crate::constants::{POWER_FLOOR, chirp as defaults};
use crate::ears::AcousticRecord;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable chirp detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChirpParams {
    /// FFT window length in samples.
    pub window_len: usize,
    /// Window overlap in samples.
    pub overlap: usize,
    /// Lower edge of the search band in Hz.
    pub band_min_hz: f64,
    /// Upper edge of the search band in Hz.
    pub band_max_hz: f64,
    /// Threshold over the in-band median, in robust standard deviations.
    pub threshold_sigmas: f64,
    /// Minimum peak prominence over the in-band median in dB.
    pub min_prominence_db: f64,
    /// Largest frequency step between linked peaks in Hz.
    pub max_jump_hz: f64,
    /// Largest frame distance between linked peaks.
    pub max_gap_frames: usize,
    /// Shortest chirp kept, in seconds.
    pub min_duration_secs: f64,
    /// Fewest peaks in a kept chirp.
    pub min_points: usize,
}

impl Default for ChirpParams {
    fn default() -> Self {
        Self {
            window_len: defaults::WINDOW_LEN,
            overlap: defaults::OVERLAP,
            band_min_hz: defaults::BAND_MIN_HZ,
            band_max_hz: defaults::BAND_MAX_HZ,
            threshold_sigmas: defaults::THRESHOLD_SIGMAS,
            min_prominence_db: defaults::MIN_PROMINENCE_DB,
            max_jump_hz: defaults::MAX_JUMP_HZ,
            max_gap_frames: defaults::MAX_GAP_FRAMES,
            min_duration_secs: defaults::MIN_DURATION_SECS,
            min_points: defaults::MIN_POINTS,
        }
    }
}

/// A detected frequency sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chirp {
    start_secs: f64,
    end_secs: f64,
    min_freq_hz: f64,
    max_freq_hz: f64,
    sweep_rate_hz_per_s: f64,
    mean_power_db: f64,
}

impl Chirp {
    /// Build a chirp, checking time ordering and the frequency range.
    pub fn new(
        start_secs: f64,
        end_secs: f64,
        min_freq_hz: f64,
        max_freq_hz: f64,
        sweep_rate_hz_per_s: f64,
        mean_power_db: f64,
        nyquist_hz: f64,
    ) -> Result<Self> {
        let values = [
            start_secs,
            end_secs,
            min_freq_hz,
            max_freq_hz,
            sweep_rate_hz_per_s,
            mean_power_db,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidEvent {
                reason: "chirp has a non-finite field".to_string(),
            });
        }
        if end_secs <= start_secs || start_secs < 0.0 {
            return Err(Error::InvalidEvent {
                reason: format!("chirp interval [{start_secs}, {end_secs}] is empty"),
            });
        }
        if min_freq_hz < 0.0 || min_freq_hz > max_freq_hz || max_freq_hz > nyquist_hz {
            return Err(Error::InvalidEvent {
                reason: format!(
                    "chirp frequency range [{min_freq_hz}, {max_freq_hz}] outside [0, {nyquist_hz}]"
                ),
            });
        }
        Ok(Self {
            start_secs,
            end_secs,
            min_freq_hz,
            max_freq_hz,
            sweep_rate_hz_per_s,
            mean_power_db,
        })
    }

    /// Start time in seconds from the recording start.
    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    /// End time in seconds from the recording start.
    pub fn end_secs(&self) -> f64 {
        self.end_secs
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Lowest frequency on the track.
    pub fn min_freq_hz(&self) -> f64 {
        self.min_freq_hz
    }

    /// Highest frequency on the track.
    pub fn max_freq_hz(&self) -> f64 {
        self.max_freq_hz
    }

    /// Frequency span of the track.
    pub fn sweep_range_hz(&self) -> f64 {
        self.max_freq_hz - self.min_freq_hz
    }

    /// Signed sweep rate; positive for upsweeps.
    pub fn sweep_rate_hz_per_s(&self) -> f64 {
        self.sweep_rate_hz_per_s
    }

    /// Mean peak power in dB.
    pub fn mean_power_db(&self) -> f64 {
        self.mean_power_db
    }
}

/// Accepted spectral peak in one frame.
#[derive(Debug, Clone, Copy)]
struct Peak {
    frame: usize,
    freq_hz: f64,
    power: f64,
}

/// Finds chirps in a recording's spectrogram.
#[derive(Debug)]
pub struct ChirpDetector {
    params: ChirpParams,
    spectrogram: SpectrogramBuilder,
}

impl ChirpDetector {
    /// Create a detector, planning the FFT once.
    pub fn new(params: ChirpParams) -> Result<Self> {
        let spectrogram = SpectrogramBuilder::new(params.window_len, params.overlap)?;
        Ok(Self {
            params,
            spectrogram,
        })
    }

    /// Active parameters.
    pub fn params(&self) -> &ChirpParams {
        &self.params
    }

    /// Detect chirps in a decoded record.
    pub fn detect(&self, record: &AcousticRecord) -> Result<Vec<Chirp>> {
        self.detect_samples(&record.normalized(), record.sample_rate())
    }

    /// Detect chirps in normalized samples.
    pub fn detect_samples(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<Chirp>> {
        let spec = self.spectrogram.compute(samples, sample_rate)?;
        let peaks = self.pick_peaks(&spec);
        let tracks = self.link(&peaks);
        let nyquist = f64::from(sample_rate) / 2.0;

        let mut chirps = Vec::new();
        for track in &tracks {
            if let Some(chirp) = self.track_to_chirp(track, spec.times(), nyquist)? {
                chirps.push(chirp);
            }
        }

        debug!(
            "Chirp detection: {} frames, {} peaks, {} tracks, {} chirps",
            spec.n_frames(),
            peaks.len(),
            tracks.len(),
            chirps.len()
        );
        Ok(chirps)
    }

    fn pick_peaks(&self, spec: &Spectrogram) -> Vec<Peak> {
        #[allow(clippy::cast_precision_loss)]
        let nyquist = spec.bin_hz() * (spec.n_bins() - 1) as f64;
        let band = spec.band(self.params.band_min_hz, self.params.band_max_hz.min(nyquist));
        if band.len() < 3 {
            return Vec::new();
        }

        let mut peaks = Vec::new();
        let mut band_db = Vec::with_capacity(band.len());

        for frame in 0..spec.n_frames() {
            let row = spec.frame(frame);
            band_db.clear();
            band_db.extend(row[band.clone()].iter().map(|&p| to_db(p)));

            let Some((offset, &peak_db)) = band_db
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
            else {
                continue;
            };

            let center = median(&band_db);
            let spread = self.params.threshold_sigmas * robust_sigma(&band_db, center);
            let threshold = center + spread.max(self.params.min_prominence_db);
            if peak_db <= threshold {
                continue;
            }

            let bin = band.start + offset;
            let delta = if bin > 0 && bin + 1 < row.len() {
                parabolic_offset(to_db(row[bin - 1]), peak_db, to_db(row[bin + 1]))
            } else {
                0.0
            };

            #[allow(clippy::cast_precision_loss)]
            let freq_hz = (bin as f64 + delta) * spec.bin_hz();
            peaks.push(Peak {
                frame,
                freq_hz,
                power: row[bin],
            });
        }
        peaks
    }

    fn link(&self, peaks: &[Peak]) -> Vec<Vec<Peak>> {
        let mut open: Vec<Vec<Peak>> = Vec::new();
        let mut closed: Vec<Vec<Peak>> = Vec::new();

        for &peak in peaks {
            let (stale, live): (Vec<_>, Vec<_>) = open.into_iter().partition(|track| {
                track
                    .last()
                    .is_none_or(|last| peak.frame - last.frame > self.params.max_gap_frames)
            });
            closed.extend(stale);
            open = live;

            let best = open
                .iter()
                .enumerate()
                .filter_map(|(i, track)| {
                    track
                        .last()
                        .map(|last| (i, (peak.freq_hz - last.freq_hz).abs()))
                })
                .filter(|&(_, jump)| jump <= self.params.max_jump_hz)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((i, _)) => open[i].push(peak),
                None => open.push(vec![peak]),
            }
        }

        closed.extend(open);
        closed.sort_by_key(|track| track.first().map_or(0, |p| p.frame));
        closed
    }

    fn track_to_chirp(
        &self,
        track: &[Peak],
        times: &[f64],
        nyquist: f64,
    ) -> Result<Option<Chirp>> {
        let (Some(first), Some(last)) = (track.first(), track.last()) else {
            return Ok(None);
        };
        if track.len() < self.params.min_points {
            return Ok(None);
        }
        let start = times[first.frame];
        let end = times[last.frame];
        let duration = end - start;
        if duration < self.params.min_duration_secs || duration <= 0.0 {
            return Ok(None);
        }

        let min_freq = track.iter().map(|p| p.freq_hz).fold(f64::INFINITY, f64::min);
        let max_freq = track
            .iter()
            .map(|p| p.freq_hz)
            .fold(f64::NEG_INFINITY, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let mean_power = track.iter().map(|p| p.power).sum::<f64>() / track.len() as f64;

        Chirp::new(
            start,
            end,
            min_freq.max(0.0),
            max_freq.min(nyquist),
            (last.freq_hz - first.freq_hz) / duration,
            to_db(mean_power),
            nyquist,
        )
        .map(Some)
    }
}

fn to_db(power: f64) -> f64 {
    10.0 * (power + POWER_FLOOR).log10()
}

/// Vertex offset of the parabola through three equally spaced points,
/// limited to half a bin.
fn parabolic_offset(left: f64, center: f64, right: f64) -> f64 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}
