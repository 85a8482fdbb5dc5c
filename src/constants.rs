//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "earscan";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "EARSCAN_CONFIG";

/// Default number of files sampled per scan.
pub const DEFAULT_SAMPLE_COUNT: usize = 1000;

/// Default number of processed files between checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

/// Default number of analysis workers.
pub const DEFAULT_WORKERS: usize = 1;

/// Upper bound on the analysis worker pool.
pub const MAX_WORKERS: usize = 64;

/// Default output directory for scan results.
pub const DEFAULT_OUTPUT_DIR: &str = "earscan_results";

/// Lock file name created in the output directory while a scan runs.
pub const LOCK_FILE_NAME: &str = ".earscan.lock";

/// Age after which a lock file is considered abandoned even when its
/// holder cannot be checked.
pub const LOCK_STALE_AFTER: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 60 * 60);

/// File names written to the output directory.
pub mod artifacts {
    /// Checkpoint file.
    pub const CHECKPOINT: &str = "checkpoint.json";
    /// Final result set.
    pub const RESULTS_JSON: &str = "results.json";
    /// Final result set as a flat table.
    pub const RESULTS_CSV: &str = "results.csv";
    /// Ranked summary of the most interesting files.
    pub const TOP_FILES: &str = "top_files.txt";
    /// Suffix for in-progress atomic writes.
    pub const TEMP_SUFFIX: &str = ".tmp";
}

/// Versioned artifact schema identifiers.
pub mod schema {
    /// Format tag stored in checkpoint files.
    pub const CHECKPOINT_FORMAT: &str = "earscan-checkpoint";
    /// Current checkpoint schema version.
    pub const CHECKPOINT_VERSION: u32 = 1;
    /// Format tag stored in result files.
    pub const RESULTS_FORMAT: &str = "earscan-results";
    /// Current result schema version.
    pub const RESULTS_VERSION: u32 = 1;
}

/// EARS binary record layout.
pub mod ears {
    /// Size of one record in bytes.
    pub const RECORD_SIZE: usize = 512;
    /// Size of the record header in bytes.
    pub const HEADER_SIZE: usize = 12;
    /// Number of 16-bit samples following each header.
    pub const SAMPLES_PER_RECORD: usize = 250;
    /// Acoustic sample rate in Hz.
    pub const SAMPLE_RATE: u32 = 192_000;
    /// Rate of the timing counter embedded in record headers, in Hz.
    pub const TIMESTAMP_RATE: f64 = 32_000.0;
    /// Byte offset of the timing counter within the header.
    pub const TIMESTAMP_OFFSET: usize = 6;
    /// Offset subtracted from the counter's high byte.
    pub const TIMESTAMP_HIGH_BIAS: f64 = 14.0;
    /// Divisor applied to the biased high byte.
    pub const TIMESTAMP_HIGH_DIVISOR: f64 = 16.0;

    /// Epoch for recorders whose file names start with `7`
    /// (2015-10-27T00:00:00Z, Unix seconds).
    pub const EPOCH_2015_UNIX_SECS: i64 = 1_445_904_000;
    /// Epoch for all other recorders (2000-01-01T00:00:00Z, Unix seconds).
    pub const EPOCH_2000_UNIX_SECS: i64 = 946_684_800;
}

/// Chirp detector defaults.
pub mod chirp {
    /// FFT window length in samples.
    pub const WINDOW_LEN: usize = 1024;
    /// Overlap between consecutive windows in samples.
    pub const OVERLAP: usize = 512;
    /// Lower edge of the search band in Hz.
    pub const BAND_MIN_HZ: f64 = 3_000.0;
    /// Upper edge of the search band in Hz.
    pub const BAND_MAX_HZ: f64 = 30_000.0;
    /// Threshold above the frame median, in robust standard deviations.
    pub const THRESHOLD_SIGMAS: f64 = 3.0;
    /// Minimum peak prominence over the frame median in dB.
    pub const MIN_PROMINENCE_DB: f64 = 10.0;
    /// Largest frequency step allowed between linked peaks in Hz.
    pub const MAX_JUMP_HZ: f64 = 1_000.0;
    /// Largest frame gap bridged inside one track.
    pub const MAX_GAP_FRAMES: usize = 5;
    /// Shortest track kept, in seconds.
    pub const MIN_DURATION_SECS: f64 = 0.1;
    /// Fewest accepted frames in a kept track.
    pub const MIN_POINTS: usize = 3;
}

/// Click-train detector defaults.
pub mod clicks {
    /// Moving-average length applied to the energy envelope, in seconds.
    pub const SMOOTHING_SECS: f64 = 0.000_2;
    /// Threshold above the envelope median, in robust standard deviations.
    pub const THRESHOLD_SIGMAS: f64 = 10.0;
    /// Threshold floor as a fraction of the envelope maximum.
    pub const RELATIVE_FLOOR: f64 = 1e-3;
    /// Minimum spacing between accepted clicks, in seconds.
    pub const REFRACTORY_SECS: f64 = 0.001;
    /// Inter-click interval that ends a train, in seconds.
    pub const MAX_ICI_SECS: f64 = 0.25;
    /// Fewest clicks in a kept train.
    pub const MIN_CLICKS: usize = 5;
    /// Smallest click count a train may ever be configured with.
    pub const MIN_CLICKS_FLOOR: usize = 2;
    /// Largest ICI coefficient of variation for a kept train.
    pub const MAX_CV: f64 = 0.5;
}

/// Wavelet denoising defaults.
pub mod denoise {
    /// Decomposition depth.
    pub const LEVEL: usize = 5;
    /// Deepest decomposition accepted in configuration.
    pub const MAX_LEVEL: usize = 12;

    /// Daubechies-4 scaling (reconstruction low-pass) filter.
    pub const DB4: [f64; 8] = [
        0.230_377_813_308_855_23,
        0.714_846_570_552_541_5,
        0.630_880_767_929_590_4,
        -0.027_983_769_416_983_85,
        -0.187_034_811_718_881_14,
        0.030_841_381_835_986_965,
        0.032_883_011_666_982_945,
        -0.010_597_401_784_997_278,
    ];

    /// Daubechies-8 scaling (reconstruction low-pass) filter.
    pub const DB8: [f64; 16] = [
        0.054_415_842_243_081_61,
        0.312_871_590_914_465_9,
        0.675_630_736_298_012_8,
        0.585_354_683_654_869_1,
        -0.015_829_105_256_023_893,
        -0.284_015_542_962_428_1,
        0.000_472_484_573_997_972_54,
        0.128_747_426_620_186,
        -0.017_369_301_002_022_11,
        -0.044_088_253_931_064_72,
        0.013_981_027_917_015_516,
        0.008_746_094_047_015_655,
        -0.004_870_352_993_010_66,
        -0.000_391_740_372_995_977_1,
        0.000_675_449_405_998_556_8,
        -0.000_117_476_784_002_281_92,
    ];
}

/// Broadband SNR estimation.
pub mod snr {
    /// Block length used for energy statistics, in seconds.
    pub const BLOCK_SECS: f64 = 0.01;
    /// Percentile of block energies taken as signal.
    pub const SIGNAL_PERCENTILE: f64 = 95.0;
    /// Percentile of block energies taken as noise.
    pub const NOISE_PERCENTILE: f64 = 10.0;
    /// Energy floor that keeps logarithms finite.
    pub const ENERGY_FLOOR: f64 = 1e-12;
}

/// Interestingness score weights and saturation points.
pub mod score {
    /// Upper bound of the total score.
    pub const MAX_TOTAL: f64 = 100.0;

    /// Chirp sub-score cap.
    pub const CHIRP_MAX: f64 = 40.0;
    /// Points for chirp coverage.
    pub const CHIRP_COVERAGE_POINTS: f64 = 20.0;
    /// Chirp coverage fraction that earns full points.
    pub const CHIRP_COVERAGE_SATURATION: f64 = 0.5;
    /// Points for mean sweep range.
    pub const CHIRP_RANGE_POINTS: f64 = 10.0;
    /// Sweep range that earns full points, in Hz.
    pub const CHIRP_RANGE_SATURATION_HZ: f64 = 10_000.0;
    /// Points for mean sweep rate.
    pub const CHIRP_RATE_POINTS: f64 = 5.0;
    /// Sweep rate that earns full points, in Hz/s.
    pub const CHIRP_RATE_SATURATION_HZ_PER_S: f64 = 20_000.0;
    /// Points for the number of chirps.
    pub const CHIRP_COUNT_POINTS: f64 = 5.0;
    /// Chirp count that earns full points.
    pub const CHIRP_COUNT_SATURATION: f64 = 20.0;

    /// Click sub-score cap.
    pub const CLICK_MAX: f64 = 40.0;
    /// Points for click-train coverage.
    pub const CLICK_COVERAGE_POINTS: f64 = 15.0;
    /// Click-train coverage fraction that earns full points.
    pub const CLICK_COVERAGE_SATURATION: f64 = 0.5;
    /// Points for the total click count.
    pub const CLICK_COUNT_POINTS: f64 = 15.0;
    /// Click count that earns full points.
    pub const CLICK_COUNT_SATURATION: f64 = 200.0;
    /// Points for ICI regularity.
    pub const CLICK_REGULARITY_POINTS: f64 = 10.0;
    /// CV at which regularity earns nothing.
    pub const CLICK_REGULARITY_CV_LIMIT: f64 = 0.5;

    /// SNR sub-score cap.
    pub const SNR_MAX: f64 = 20.0;
    /// SNR that earns full points, in dB.
    pub const SNR_CEILING_DB: f64 = 30.0;
}

/// Default number of rows in the ranked summary.
pub const DEFAULT_TOP_N: usize = 20;

/// Power floor added before converting spectra to dB.
pub const POWER_FLOOR: f64 = 1e-12;

/// Scale factor from robust MAD to standard deviation under a normal model.
pub const MAD_TO_SIGMA: f64 = 1.4826;
