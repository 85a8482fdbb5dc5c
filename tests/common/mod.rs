//! Synthetic EARS files and signals shared by the integration tests.

#![allow(dead_code)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// Samples per second written by the recorder.
pub const FS: u32 = 192_000;

/// Samples per 512-byte record.
pub const SAMPLES_PER_RECORD: usize = 250;

/// Encode samples as EARS records. The timing counter starts at
/// `start_ticks` and advances with every record; the final record is
/// zero-padded.
pub fn encode_ears(samples: &[i16], start_ticks: u64) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, chunk) in samples.chunks(SAMPLES_PER_RECORD).enumerate() {
        // 250 samples at 192 kHz span 250 / 6 ticks of the 32 kHz counter.
        let ticks = start_ticks + (i as u64 * 250) / 6;
        let mut header = [0u8; 12];
        header[6] = 14;
        header[7..12].copy_from_slice(&ticks.to_be_bytes()[3..8]);
        out.extend_from_slice(&header);
        for &s in chunk {
            out.extend_from_slice(&s.to_be_bytes());
        }
        for _ in chunk.len()..SAMPLES_PER_RECORD {
            out.extend_from_slice(&0i16.to_be_bytes());
        }
    }
    out
}

/// Write an EARS file named `name` under `dir` from unit-scale samples.
pub fn write_ears_file(dir: &Path, name: &str, samples: &[f64], start_ticks: u64) -> PathBuf {
    let quantized: Vec<i16> = samples
        .iter()
        .map(|&v| (v * 32_767.0).round().clamp(-32_768.0, 32_767.0) as i16)
        .collect();
    let path = dir.join(name);
    std::fs::write(&path, encode_ears(&quantized, start_ticks)).unwrap();
    path
}

/// Uniform noise in `[-amplitude, amplitude)`.
pub fn noise(n: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
}

/// Add a linear sweep from `f0` to `f1` Hz, `secs` long, starting at sample
/// `start`, with 2 ms raised-cosine edges.
pub fn add_sweep(signal: &mut [f64], start: usize, secs: f64, f0: f64, f1: f64, amplitude: f64) {
    let fs = f64::from(FS);
    let n = (secs * fs) as usize;
    let k = (f1 - f0) / secs;
    let fade = (0.002 * fs) as usize;
    for i in 0..n {
        let t = i as f64 / fs;
        let gain = if i < fade {
            0.5 * (1.0 - (PI * i as f64 / fade as f64).cos())
        } else if i >= n - fade {
            0.5 * (1.0 - (PI * (n - 1 - i) as f64 / fade as f64).cos())
        } else {
            1.0
        };
        signal[start + i] += amplitude * gain * (2.0 * PI * (f0 * t + 0.5 * k * t * t)).sin();
    }
}

/// Add a short 30 kHz Gaussian-windowed pulse centred on each position.
pub fn add_clicks(signal: &mut [f64], positions: &[usize], amplitude: f64) {
    for &pos in positions {
        for k in -60i64..=60 {
            let idx = (pos as i64 + k) as usize;
            let t = k as f64 / f64::from(FS);
            let gain = (-(t / 0.000_05).powi(2)).exp();
            signal[idx] += amplitude * gain * (2.0 * PI * 30_000.0 * t).cos();
        }
    }
}

/// Write a manifest listing `paths`.
pub fn write_manifest(dir: &Path, paths: &[PathBuf]) -> PathBuf {
    let manifest = dir.join("files.txt");
    let body: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    std::fs::write(&manifest, body.join("\n")).unwrap();
    manifest
}
