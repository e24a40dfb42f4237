//! Command-line parsing for the `dmx` binary.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the segmentation/summary code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Strategy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dmx", version, about = "DMX binning and post-fit DMX summaries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build DMX bins from a TOA CSV and print the bin table.
    Bins(BinsArgs),
    /// Per-bin TOA counts and spans for a fitted model.
    Stats(StatsArgs),
    /// Mean-subtracted DMX values with corrected uncertainties (dmxparse).
    Parse(ParseArgs),
    /// Write a synthetic dual-band TOA campaign as CSV.
    Simulate(SimulateArgs),
}

/// Options for building bins.
#[derive(Debug, Parser, Clone)]
pub struct BinsArgs {
    /// TOA CSV with `mjd` and `freq` columns.
    #[arg(long, value_name = "CSV")]
    pub toas: PathBuf,

    /// Binning algorithm.
    #[arg(long, value_enum, default_value_t = Strategy::Windowed)]
    pub strategy: Strategy,

    /// Frequency (MHz) separating the low and high bands.
    #[arg(long = "divide", default_value_t = 1000.0)]
    pub divide_freq: f64,

    /// Maximum low/high pairing distance in days (nearest strategy).
    #[arg(long, default_value_t = 15.0)]
    pub max_diff: f64,

    /// Padding in days added to each bin (nearest strategy).
    #[arg(long, default_value_t = 0.01)]
    pub offset: f64,

    /// Window width in days (windowed strategy).
    #[arg(long, default_value_t = 15.0)]
    pub binwidth: f64,

    /// Also print par-file lines for the bins.
    #[arg(long)]
    pub parfile: bool,

    /// Also print the dates that could not be binned.
    #[arg(long)]
    pub unusable: bool,

    /// Write the model with the installed bins as fit JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

/// Options for `dmx stats`.
#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// TOA CSV with `mjd` and `freq` columns.
    #[arg(long, value_name = "CSV")]
    pub toas: PathBuf,

    /// Fit JSON holding the DMX parameters.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,
}

/// Options for `dmx parse`.
#[derive(Debug, Parser)]
pub struct ParseArgs {
    /// Fit JSON holding the DMX parameters and (optionally) the covariance.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Write `dmxparse.out` to the working directory.
    #[arg(long)]
    pub save: bool,

    /// Write the `dmxparse.out` table to this path instead.
    #[arg(long, value_name = "PATH", conflicts_with = "save")]
    pub out: Option<PathBuf>,

    /// Ignore the covariance in the fit file and use raw uncertainties.
    #[arg(long)]
    pub no_covariance: bool,

    /// Print the DMX covariance block.
    #[arg(long)]
    pub show_covariance: bool,
}

/// Options for `dmx simulate`.
#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Number of observing sessions.
    #[arg(long, default_value_t = 24)]
    pub sessions: usize,

    /// Days between sessions.
    #[arg(long, default_value_t = 30.0)]
    pub cadence: f64,

    /// MJD of the first session.
    #[arg(long, default_value_t = 55000.0)]
    pub start_mjd: f64,

    /// Maximum days between the two band visits of a session.
    #[arg(long, default_value_t = 3.0)]
    pub band_gap: f64,

    /// TOAs per band per session.
    #[arg(long, default_value_t = 4)]
    pub toas_per_band: usize,

    /// Probability that a session loses one band.
    #[arg(long, default_value_t = 0.1)]
    pub drop_prob: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_defaults() {
        let cli = Cli::parse_from(["dmx", "bins", "--toas", "t.csv"]);
        let Command::Bins(args) = cli.command else {
            panic!("expected bins");
        };
        assert_eq!(args.strategy, Strategy::Windowed);
        assert_eq!(args.divide_freq, 1000.0);
        assert_eq!(args.binwidth, 15.0);
        assert!(!args.parfile);
    }

    #[test]
    fn strategy_parses_lowercase() {
        let cli = Cli::parse_from(["dmx", "bins", "--toas", "t.csv", "--strategy", "nearest"]);
        let Command::Bins(args) = cli.command else {
            panic!("expected bins");
        };
        assert_eq!(args.strategy, Strategy::Nearest);
    }

    #[test]
    fn parse_save_conflicts_with_out() {
        let res = Cli::try_parse_from(["dmx", "parse", "--fit", "f.json", "--save", "--out", "x"]);
        assert!(res.is_err());
    }
}
