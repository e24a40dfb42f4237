//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - loads TOAs and fit files
//! - runs binning, dmxstats, or dmxparse
//! - prints reports and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{BinsArgs, Command, ParseArgs, SimulateArgs, StatsArgs};
use crate::data::{CampaignConfig, generate_campaign};
use crate::domain::SegmentConfig;
use crate::error::DmxError;
use crate::io::{FitFile, load_toas, read_fit_json, write_fit_json, write_toas_csv};
use crate::math::CovarianceProvider;
use crate::model::dmx_epochs;

pub mod pipeline;

/// Entry point for the `dmx` binary.
pub fn run() -> Result<(), DmxError> {
    init_logging();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Bins(args) => handle_bins(args),
        Command::Stats(args) => handle_stats(args),
        Command::Parse(args) => handle_parse(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// `RUST_LOG` filter, defaulting to `info`; logs go to stderr so reports on
/// stdout stay clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_bins(args: BinsArgs) -> Result<(), DmxError> {
    let config = segment_config_from_args(&args);
    let ingest = load_toas(&args.toas)?;
    for e in &ingest.row_errors {
        eprintln!("line {}: {}", e.line, e.message);
    }

    let run = pipeline::run_segmentation(&ingest.toas, &config)?;

    println!("{}", crate::report::format_bin_table(&run.segmentation));
    if args.unusable {
        println!("{}", crate::report::format_unusable(&run.segmentation));
    }
    if args.parfile {
        println!(
            "{}",
            crate::report::format_parfile_lines(&run.segmentation, config.max_diff)
        );
    }

    if let Some(path) = &args.export_model {
        write_fit_json(path, &FitFile::from_model(&run.model, None))?;
    }
    Ok(())
}

fn handle_stats(args: StatsArgs) -> Result<(), DmxError> {
    let ingest = load_toas(&args.toas)?;
    let model = read_fit_json(&args.fit)?.model()?;
    let stats = crate::report::dmxstats(&model, &ingest.toas)?;
    print!("{}", crate::report::format_dmxstats(&stats));
    Ok(())
}

fn handle_parse(args: ParseArgs) -> Result<(), DmxError> {
    let fit = read_fit_json(&args.fit)?;
    let model = fit.model()?;
    let covariance = if args.no_covariance { None } else { fit.covariance()? };
    let provider = covariance.as_ref().map(|c| c as &dyn CovarianceProvider);

    let summary = match &args.out {
        Some(path) => crate::summary::dmxparse_to(&model, provider, path)?,
        None => crate::summary::dmxparse(&model, provider, args.save)?,
    };
    println!("{}", crate::report::format_summary(&summary));

    if args.show_covariance {
        if let Some(cov) = &covariance {
            let names: Vec<String> = dmx_epochs(&model).iter().map(|e| e.value_name()).collect();
            println!("{}", crate::report::format_covariance(&cov.sub_matrix(&names)));
        }
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), DmxError> {
    let config = campaign_config_from_args(&args);
    let toas = generate_campaign(&config)?;
    write_toas_csv(&args.out, &toas)?;
    println!("Wrote {} TOAs to {}", toas.len(), args.out.display());
    Ok(())
}

pub fn segment_config_from_args(args: &BinsArgs) -> SegmentConfig {
    SegmentConfig {
        strategy: args.strategy,
        divide_freq: args.divide_freq,
        max_diff: args.max_diff,
        offset: args.offset,
        binwidth: args.binwidth,
    }
}

pub fn campaign_config_from_args(args: &SimulateArgs) -> CampaignConfig {
    CampaignConfig {
        sessions: args.sessions,
        cadence: args.cadence,
        start_mjd: args.start_mjd,
        band_gap: args.band_gap,
        toas_per_band: args.toas_per_band,
        drop_prob: args.drop_prob,
        seed: args.seed,
        ..CampaignConfig::default()
    }
}
