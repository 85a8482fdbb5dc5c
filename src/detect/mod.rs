//! Signal detectors.
//!
//! Detectors are pure functions of their parameters and the normalized
//! sample stream; they hold no per-file state and can be shared across
//! worker threads.

pub mod chirp;
pub mod clicks;
pub mod denoise;
pub mod snr;
pub mod spectrogram;
pub mod stats;

pub use chirp::{Chirp, ChirpDetector, ChirpParams};
pub use clicks::{ClickParams, ClickTrain, ClickTrainDetector};
pub use denoise::{DenoiseParams, Denoiser, Shrinkage, Wavelet};
pub use snr::estimate_snr_db;
pub use spectrogram::{Spectrogram, SpectrogramBuilder};
