use anyhow::{Context, Result};
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, DatasetArgs, LogArgs, SamplingArgs};
use feeder_curation_tools::sampling::run_sampling;
use feeder_curation_tools::stop::StopWatch;
use feeder_curation_tools::{assemble_from_config, ToolConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "curate",
    about = "Sample the observation log and build the dataset in one run"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    log: LogArgs,
    #[command(flatten)]
    sampling: SamplingArgs,
    #[command(flatten)]
    dataset: DatasetArgs,
    #[arg(long)]
    stop_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    cfg.apply_log_args(&args.log);
    cfg.apply_sampling_args(&args.sampling);
    cfg.apply_dataset_args(&args.dataset);
    cfg.validate().context("invalid configuration")?;

    let outcome = run_sampling(&cfg).context("sampling failed")?;
    print!("{}", outcome.summary);

    let stop = StopWatch::start(args.stop_file);
    let summary =
        assemble_from_config(&cfg, &outcome.snapshot, &stop.flag).context("dataset assembly failed")?;
    print!("{summary}");
    Ok(())
}
