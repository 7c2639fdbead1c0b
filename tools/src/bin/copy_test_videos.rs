use anyhow::{Context, Result};
use bird_dataset::load_snapshot;
use clap::Parser;
use cli_support::{init_tracing, ConfigArgs, TestExportArgs};
use feeder_curation_tools::export::copy_test_videos;
use feeder_curation_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "copy_test_videos",
    about = "Copy every Test-split source video into a held-out folder"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    export: TestExportArgs,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = ToolConfig::load_from(args.config.config.as_deref()).context("load tool config")?;
    let out_dir = args.export.resolve_output(&cfg.dataset_root);

    let snapshot = load_snapshot(&cfg.snapshot_path).context("load sample snapshot")?;
    let report = copy_test_videos(&snapshot, &cfg.resolver(), &out_dir, args.export.dry_run)
        .with_context(|| format!("copy into {}", out_dir.display()))?;
    println!(
        "{} test videos {} to {} ({} missing)",
        report.copied.len(),
        if args.export.dry_run { "would be copied" } else { "copied" },
        out_dir.display(),
        report.missing.len()
    );
    Ok(())
}
