use anyhow::{Context, Result};
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, LogArgs, SamplingArgs};
use feeder_curation_tools::sampling::run_sampling;
use feeder_curation_tools::ToolConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sample_observations",
    about = "Select a stratified, capped sample of videos from the observation log"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    log: LogArgs,
    #[command(flatten)]
    sampling: SamplingArgs,
    /// Where to write the sample snapshot.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    cfg.apply_log_args(&args.log);
    cfg.apply_sampling_args(&args.sampling);
    if let Some(path) = args.snapshot {
        cfg.snapshot_path = path;
    }

    let outcome = run_sampling(&cfg).context("sampling failed")?;
    print!("{}", outcome.summary);
    println!("Snapshot written to {}", cfg.snapshot_path.display());
    Ok(())
}
