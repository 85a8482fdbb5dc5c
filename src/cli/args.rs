//! CLI argument definitions.

use crate::cli::validators::{parse_positive, parse_workers};
use crate::config::ProgressFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Find chirps and click trains in EARS underwater recordings.
#[derive(Debug, Parser)]
#[command(name = "earscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Only log warnings and errors; also hides the progress bar.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample files from a manifest and score them, with checkpoints.
    Scan(ScanArgs),
    /// Decode one file and print what it contains.
    Inspect(InspectArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for `earscan scan`.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// File listing candidate recordings, one path per line.
    #[arg(short, long, env = "EARSCAN_MANIFEST")]
    pub manifest: PathBuf,

    /// Number of files to sample.
    #[arg(short = 'n', long, value_parser = parse_positive, env = "EARSCAN_N_FILES")]
    pub n_files: Option<usize>,

    /// Directory for checkpoint and results.
    #[arg(short, long, env = "EARSCAN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Save a checkpoint every K processed files.
    #[arg(
        short = 'k',
        long,
        value_parser = parse_positive,
        env = "EARSCAN_CHECKPOINT_INTERVAL"
    )]
    pub checkpoint_interval: Option<usize>,

    /// Continue from the checkpoint in the output directory.
    #[arg(long)]
    pub resume: bool,

    /// Sampler seed for a reproducible draw.
    #[arg(long, env = "EARSCAN_SEED")]
    pub seed: Option<u64>,

    /// Analysis worker threads.
    #[arg(short = 'j', long, value_parser = parse_workers, env = "EARSCAN_WORKERS")]
    pub workers: Option<usize>,

    /// Rows in top_files.txt.
    #[arg(long, value_parser = parse_positive)]
    pub top_n: Option<usize>,

    /// Skip results.csv.
    #[arg(long)]
    pub no_csv: bool,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Progress output style.
    #[arg(long, value_enum, env = "EARSCAN_PROGRESS")]
    pub progress: Option<ProgressFormat>,
}

/// Arguments for `earscan inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// EARS file to decode.
    pub file: PathBuf,

    /// Also run the detectors and print the score.
    #[arg(long)]
    pub detect: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_scan() {
        let cli = Cli::try_parse_from([
            "earscan",
            "scan",
            "--manifest",
            "files.txt",
            "-n",
            "100",
            "-k",
            "10",
            "--resume",
            "--seed",
            "42",
            "-j",
            "4",
            "-q",
        ])
        .unwrap();
        assert!(cli.quiet);
        let Command::Scan(args) = cli.command else {
            unreachable!("parsed scan");
        };
        assert_eq!(args.manifest, PathBuf::from("files.txt"));
        assert_eq!(args.n_files, Some(100));
        assert_eq!(args.checkpoint_interval, Some(10));
        assert!(args.resume);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.workers, Some(4));
    }

    #[test]
    fn test_cli_rejects_zero_interval() {
        let cli = Cli::try_parse_from(["earscan", "scan", "-m", "f.txt", "-k", "0"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_inspect() {
        let cli = Cli::try_parse_from(["earscan", "inspect", "71621DC7.190", "--detect", "-vv"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Inspect(args) = cli.command else {
            unreachable!("parsed inspect");
        };
        assert!(args.detect);
    }

    #[test]
    fn test_cli_parse_progress_format() {
        let cli = Cli::try_parse_from([
            "earscan",
            "scan",
            "-m",
            "f.txt",
            "--progress",
            "ndjson",
        ])
        .unwrap();
        let Command::Scan(args) = cli.command else {
            unreachable!("parsed scan");
        };
        assert_eq!(args.progress, Some(ProgressFormat::Ndjson));
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["earscan", "config", "show"]);
        assert!(cli.is_ok());
    }
}
