use anyhow::{Context, Result};
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs};
use data_contracts::{DatasetLayout, Split};
use feeder_curation_tools::overlay::overlay_split;
use feeder_curation_tools::ToolConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "overlay_labels", about = "Draw label boxes onto dataset images")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    /// Dataset root (defaults to the configured one).
    #[arg(long)]
    dataset_root: Option<PathBuf>,
    #[arg(long, default_value = "train", value_parser = ["train", "val", "test"])]
    split: String,
    /// Output directory (defaults to "<dataset_root>/overlays/<split>").
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    let root = args.dataset_root.unwrap_or_else(|| cfg.dataset_root.clone());
    let split = Split::ALL
        .into_iter()
        .find(|s| s.dir_name() == args.split)
        .unwrap_or(Split::Train);
    let layout = DatasetLayout::new(root);
    let out_dir = args
        .out
        .unwrap_or_else(|| layout.root.join("overlays").join(split.dir_name()));

    let n = overlay_split(
        &layout.images_dir(split),
        &layout.labels_dir(split),
        &out_dir,
        cfg.annotate.geometry,
    )?;
    println!("{n} overlays written to {}", out_dir.display());
    Ok(())
}
