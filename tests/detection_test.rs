//! End-to-end detection on synthetic EARS files.

mod common;

use common::{FS, add_clicks, add_sweep, noise, write_ears_file};
use earscan::detect::{ChirpDetector, ChirpParams, ClickParams, ClickTrainDetector};
use earscan::ears::decode_ears_file;
use earscan::pipeline::{EarsAnalyzer, FileAnalyzer};
use tempfile::TempDir;

#[test]
fn test_sweep_survives_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut signal = noise(FS as usize, 0.005, 21);
    add_sweep(&mut signal, 48_000, 0.5, 5_000.0, 15_000.0, 0.4);
    let path = write_ears_file(dir.path(), "71621DC7.190", &signal, 0);

    let record = decode_ears_file(&path).unwrap();
    let chirps = ChirpDetector::new(ChirpParams::default())
        .unwrap()
        .detect(&record)
        .unwrap();

    assert_eq!(chirps.len(), 1, "{chirps:?}");
    let chirp = &chirps[0];
    assert!((chirp.min_freq_hz() - 5_000.0).abs() < 500.0);
    assert!((chirp.max_freq_hz() - 15_000.0).abs() < 500.0);
    assert!((chirp.start_secs() - 0.25).abs() < 0.02);
    assert!((chirp.end_secs() - 0.75).abs() < 0.02);
    assert!((chirp.sweep_rate_hz_per_s() - 20_000.0).abs() < 2_000.0);
}

#[test]
fn test_click_train_survives_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut signal = noise(FS as usize, 0.001, 22);
    let positions: Vec<usize> = (0..20).map(|i| 19_200 + i * 1_920).collect();
    add_clicks(&mut signal, &positions, 0.5);
    let path = write_ears_file(dir.path(), "71621DC8.190", &signal, 0);

    let record = decode_ears_file(&path).unwrap();
    let trains = ClickTrainDetector::new(ClickParams::default())
        .detect(&record)
        .unwrap();

    assert_eq!(trains.len(), 1, "{trains:?}");
    assert_eq!(trains[0].n_clicks(), 20);
    assert!((trains[0].mean_ici_secs() - 0.01).abs() < 0.000_5);
    assert!(trains[0].ici_cv() < 0.05);
}

#[test]
fn test_one_second_sweep_in_silence() {
    let dir = TempDir::new().unwrap();
    let mut signal = vec![0.0; FS as usize * 3 / 2];
    add_sweep(&mut signal, 48_000, 1.0, 5_000.0, 15_000.0, 0.5);
    let path = write_ears_file(dir.path(), "71621DD0.190", &signal, 0);

    let record = decode_ears_file(&path).unwrap();
    let chirps = ChirpDetector::new(ChirpParams::default())
        .unwrap()
        .detect(&record)
        .unwrap();

    assert_eq!(chirps.len(), 1, "{chirps:?}");
    let chirp = &chirps[0];
    // Two analysis windows of slack at 1024 samples each.
    let frame_slack = 2.0 * 1024.0 / f64::from(FS);
    assert!((chirp.duration_secs() - 1.0).abs() <= frame_slack, "{chirp:?}");
    let rate = chirp.sweep_rate_hz_per_s();
    assert!((rate - 10_000.0).abs() <= 500.0, "rate {rate}");
    assert!((chirp.min_freq_hz() - 5_000.0).abs() < 500.0);
    assert!((chirp.max_freq_hz() - 15_000.0).abs() < 500.0);
}

#[test]
fn test_twenty_pulses_in_silence() {
    let dir = TempDir::new().unwrap();
    let mut signal = vec![0.0; FS as usize / 2];
    let positions: Vec<usize> = (0..20).map(|i| 9_600 + i * 1_920).collect();
    add_clicks(&mut signal, &positions, 0.5);
    let path = write_ears_file(dir.path(), "71621DD1.190", &signal, 0);

    let record = decode_ears_file(&path).unwrap();
    let trains = ClickTrainDetector::new(ClickParams::default())
        .detect(&record)
        .unwrap();

    assert_eq!(trains.len(), 1, "{trains:?}");
    assert_eq!(trains[0].n_clicks(), 20);
    assert!((trains[0].mean_ici_secs() - 0.010).abs() < 0.000_1);
    assert!(trains[0].ici_cv() < 0.01);
}

#[test]
fn test_analyzer_scores_rich_file_above_quiet_file() {
    let dir = TempDir::new().unwrap();

    let mut rich = noise(FS as usize, 0.001, 23);
    add_sweep(&mut rich, 20_000, 0.4, 8_000.0, 18_000.0, 0.3);
    // Clicks start 0.3 s after the sweep ends so the two never share a train.
    let positions: Vec<usize> = (0..20).map(|i| 153_600 + i * 1_500).collect();
    add_clicks(&mut rich, &positions, 0.5);
    let rich_path = write_ears_file(dir.path(), "7000AAAA.190", &rich, 0);

    let quiet = noise(FS as usize, 0.001, 24);
    let quiet_path = write_ears_file(dir.path(), "7000BBBB.190", &quiet, 0);

    let analyzer = EarsAnalyzer::new(ChirpParams::default(), ClickParams::default()).unwrap();
    let rich_report = analyzer.analyze(&rich_path).unwrap();
    let quiet_report = analyzer.analyze(&quiet_path).unwrap();

    assert!(rich_report.is_hit());
    assert!(rich_report.n_chirps >= 1);
    assert_eq!(rich_report.n_click_trains, 1);
    assert!(!quiet_report.is_hit());
    assert!(rich_report.score > quiet_report.score);
    assert!((0.0..=100.0).contains(&rich_report.score));
}
