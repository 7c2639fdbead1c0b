use anyhow::{Context, Result};
use bird_dataset::load_snapshot;
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, DatasetArgs};
use feeder_curation_tools::stop::StopWatch;
use feeder_curation_tools::{assemble_from_config, ToolConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "build_dataset",
    about = "Rebuild the image/label dataset from a sample snapshot"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    dataset: DatasetArgs,
    /// Abandon remaining videos once this file exists.
    #[arg(long)]
    stop_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    cfg.apply_dataset_args(&args.dataset);

    let snapshot = load_snapshot(&cfg.snapshot_path).context("load sample snapshot")?;
    let stop = StopWatch::start(args.stop_file);
    let summary = assemble_from_config(&cfg, &snapshot, &stop.flag).context("dataset assembly failed")?;
    print!("{summary}");
    println!("Dataset written to {}", cfg.dataset_root.display());
    Ok(())
}
