use clap::Args;
use std::path::PathBuf;

/// Alternate tool config file; otherwise `FEEDER_CURATION_CONFIG` or `./feeder-curation.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Observation log location and sentinels.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Tab-separated observation log.
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Species value meaning "not annotated".
    #[arg(long)]
    pub na_label: Option<String>,
    /// Species value for rows with nothing to box.
    #[arg(long)]
    pub no_subject_label: Option<String>,
}

/// Sampling overrides; unset flags fall back to the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SamplingArgs {
    /// Minimum rows for a species to keep its own class.
    #[arg(long)]
    pub threshold: Option<usize>,
    /// Max Train/Validation videos per species.
    #[arg(long)]
    pub cap: Option<usize>,
    /// Max Test videos per species.
    #[arg(long)]
    pub test_cap: Option<usize>,
    /// Records from this year are held out for Test.
    #[arg(long)]
    pub test_year: Option<i32>,
    /// Probability of Train vs. Validation for a non-test video.
    #[arg(long)]
    pub train_probability: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_parser = ["even_index", "probabilistic"])]
    pub strategy: Option<String>,
}

/// Dataset assembly overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct DatasetArgs {
    /// Sample snapshot JSON.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
    /// Output root; deleted and recreated on every build.
    #[arg(long)]
    pub dataset_root: Option<PathBuf>,
    #[arg(long)]
    pub videos_root: Option<PathBuf>,
    /// Directory of per-video `<stem>.jsonl` detections.
    #[arg(long)]
    pub detections_root: Option<PathBuf>,
    /// Process every Nth frame.
    #[arg(long)]
    pub frame_stride: Option<u64>,
    #[arg(long, value_parser = ["center", "corner"])]
    pub geometry: Option<String>,
    /// Annotation worker threads.
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Destination for held-out test videos.
#[derive(Debug, Clone, Args)]
pub struct TestExportArgs {
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// List what would be copied without copying.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl TestExportArgs {
    /// Defaults to "<dataset_root>_test_videos" beside the dataset.
    pub fn resolve_output(&self, dataset_root: &std::path::Path) -> PathBuf {
        if let Some(out) = &self.output {
            return out.clone();
        }
        let mut base = dataset_root.to_path_buf();
        let suffix = base
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| format!("{s}_test_videos"))
            .unwrap_or_else(|| "test_videos".to_string());
        base.set_file_name(suffix);
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        sampling: SamplingArgs,
        #[command(flatten)]
        export: TestExportArgs,
    }

    #[test]
    fn flattened_groups_parse() {
        let cli = Cli::parse_from([
            "bin",
            "--cap",
            "10",
            "--strategy",
            "probabilistic",
            "--test-year",
            "2022",
        ]);
        assert_eq!(cli.sampling.cap, Some(10));
        assert_eq!(cli.sampling.strategy.as_deref(), Some("probabilistic"));
        assert_eq!(cli.sampling.test_year, Some(2022));
        assert!(cli.sampling.threshold.is_none());
        assert!(!cli.export.dry_run);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["bin", "--strategy", "random"]).is_err());
    }

    #[test]
    fn export_output_defaults_beside_dataset() {
        let args = TestExportArgs {
            output: None,
            dry_run: false,
        };
        assert_eq!(
            args.resolve_output(std::path::Path::new("/data/feeder_dataset")),
            PathBuf::from("/data/feeder_dataset_test_videos")
        );
    }
}
