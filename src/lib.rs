//! earscan - find chirps and click trains in EARS underwater recordings.
//!
//! The crate decodes EARS binary recordings, runs a chirp detector and a
//! click-train detector over them, scores each recording's
//! interestingness and drives a resumable, checkpointed scan over large
//! collections of files.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod detect;
pub mod ears;
pub mod error;
pub mod locking;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod utils;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, InspectArgs, ScanArgs};
use config::{Config, config_file_path, load_default_config, save_default_config, validate_config};
use output::create_reporter;
use pipeline::{BatchScheduler, CancelToken, EarsAnalyzer, ScanOptions, ScanOutcome};
use tracing::{error, info, warn};

pub use error::{Error, Result};

/// How a successful invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The command finished its work.
    Completed,
    /// A scan stopped early on Ctrl+C; its checkpoint can be resumed.
    Interrupted,
}

/// Main entry point for the earscan CLI.
pub fn run() -> Result<RunStatus> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    match cli.command {
        Command::Scan(args) => {
            let config = load_default_config()?;
            run_scan(&args, config, cli.quiet, cancel)
        }
        Command::Inspect(args) => {
            let config = load_default_config()?;
            inspect_file(&args, &config)?;
            Ok(RunStatus::Completed)
        }
        Command::Config { action } => {
            handle_config_command(action)?;
            Ok(RunStatus::Completed)
        }
    }
}

/// Initialize the logging subscriber based on verbosity.
fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// First Ctrl+C asks the scan to wind down; a second one leaves at once.
fn install_interrupt_handler(cancel: CancelToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        if cancel.cancel() {
            locking::cleanup_all_locks();
            std::process::exit(130); // 128 + SIGINT(2)
        }
        eprintln!(
            "Interrupt received: finishing in-flight files and saving a checkpoint (Ctrl+C again to quit now)"
        );
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

/// Merge command-line overrides into the loaded configuration.
fn apply_scan_overrides(config: &mut Config, args: &ScanArgs) {
    if let Some(n) = args.n_files {
        config.scan.n_files = n;
    }
    if let Some(k) = args.checkpoint_interval {
        config.scan.checkpoint_interval = k;
    }
    if let Some(workers) = args.workers {
        config.scan.workers = workers;
    }
    if args.seed.is_some() {
        config.scan.seed = args.seed;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir.clone_from(dir);
    }
    if let Some(top_n) = args.top_n {
        config.output.top_n = top_n;
    }
    if args.no_csv {
        config.output.write_csv = false;
    }
    if let Some(progress) = args.progress {
        config.output.progress = progress;
    }
}

fn run_scan(args: &ScanArgs, mut config: Config, quiet: bool, cancel: CancelToken) -> Result<RunStatus> {
    apply_scan_overrides(&mut config, args);
    validate_config(&config)?;

    let options = ScanOptions {
        manifest: args.manifest.clone(),
        n_files: config.scan.n_files,
        output_dir: config.output.dir.clone(),
        checkpoint_interval: config.scan.checkpoint_interval,
        resume: args.resume,
        seed: config.scan.seed,
        workers: config.scan.workers,
        top_n: config.output.top_n,
        write_csv: config.output.write_csv,
    };

    let analyzer = EarsAnalyzer::new(config.chirp.clone(), config.clicks.clone())?
        .with_denoise(config.denoise.clone())?;
    let show_bar = !quiet && !args.no_progress;
    let reporter = create_reporter(config.output.progress, show_bar);

    let mut scheduler = BatchScheduler::new(options, &analyzer, reporter.as_ref(), cancel);
    match scheduler.run() {
        Ok(ScanOutcome::Completed(summary)) => {
            info!(
                "Scanned {} files: {} scored, {} failed",
                summary.n_analyzed + summary.n_errors,
                summary.n_analyzed,
                summary.n_errors
            );
            Ok(RunStatus::Completed)
        }
        Ok(ScanOutcome::Interrupted { .. }) => Ok(RunStatus::Interrupted),
        Err(e) => {
            error!("Scan failed: {e}");
            Err(e)
        }
    }
}

#[allow(clippy::print_stdout)]
fn inspect_file(args: &InspectArgs, config: &Config) -> Result<()> {
    let record = ears::decode_ears_file(&args.file)?;

    println!("File:             {}", args.file.display());
    println!("Start:            {}", record.start().to_rfc3339());
    println!("End:              {}", record.end().to_rfc3339());
    println!("Duration:         {:.3} s", record.duration_secs());
    println!("Sample rate:      {} Hz", record.sample_rate());
    println!("Samples:          {}", record.len());
    println!(
        "Timestamp changes: {}",
        record.header_timestamps().len().saturating_sub(1)
    );

    if !args.detect {
        return Ok(());
    }

    let analyzer = EarsAnalyzer::new(config.chirp.clone(), config.clicks.clone())?
        .with_denoise(config.denoise.clone())?;
    let analysis = analyzer.analyze_record(&record)?;

    println!();
    println!("Chirps: {}", analysis.chirps.len());
    for chirp in &analysis.chirps {
        println!(
            "  {:>8.3}-{:<8.3} s  {:>7.0}-{:<7.0} Hz  {:>+9.0} Hz/s  {:>6.1} dB",
            chirp.start_secs(),
            chirp.end_secs(),
            chirp.min_freq_hz(),
            chirp.max_freq_hz(),
            chirp.sweep_rate_hz_per_s(),
            chirp.mean_power_db()
        );
    }
    println!("Click trains: {}", analysis.trains.len());
    for train in &analysis.trains {
        println!(
            "  {:>8.3}-{:<8.3} s  {:>4} clicks  ICI {:.4} s  CV {:.3}",
            train.start_secs(),
            train.end_secs(),
            train.n_clicks(),
            train.mean_ici_secs(),
            train.ici_cv()
        );
    }
    println!("SNR: {:.1} dB", analysis.snr_db);
    println!(
        "Score: {:.1} (chirp {:.1}, click {:.1}, snr {:.1})",
        analysis.breakdown.total,
        analysis.breakdown.chirp,
        analysis.breakdown.click,
        analysis.breakdown.snr
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            let rendered =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{rendered}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
