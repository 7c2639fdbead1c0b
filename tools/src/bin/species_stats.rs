use anyhow::{Context, Result};
use bird_dataset::{read_observations, write_atomic};
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, LogArgs};
use feeder_curation_tools::stats::species_stats;
use feeder_curation_tools::ToolConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "species_stats", about = "Per-species video counts of the observation log")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    log: LogArgs,
    /// JSON report path.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    cfg.apply_log_args(&args.log);
    let output = args.output.unwrap_or_else(|| cfg.stats_path.clone());

    let log = read_observations(&cfg.log_path, &cfg.log).context("read observation log")?;
    let stats = species_stats(&log);
    let mut body = serde_json::to_vec_pretty(&stats)?;
    body.push(b'\n');
    write_atomic(&output, &body).with_context(|| format!("write {}", output.display()))?;

    println!("Total entries: {}", stats.total_entries);
    println!("Unique species: {}", stats.unique_species);
    for occ in &stats.occurrences {
        println!("  {}: {}", occ.species, occ.videos);
    }
    println!("Report written to {}", output.display());
    Ok(())
}
