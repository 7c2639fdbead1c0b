use bird_dataset::{
    read_observations, sample_observations, save_snapshot, write_atomic, CurationError,
    CurationResult, SampleOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::ToolConfig;

/// Read the log, select the sample, and persist the snapshot plus the
/// sampling report. Snapshot write failure is fatal.
pub fn run_sampling(cfg: &ToolConfig) -> CurationResult<SampleOutcome> {
    cfg.sampling.validate()?;
    let log = read_observations(&cfg.log_path, &cfg.log)?;
    let mut rng = StdRng::seed_from_u64(cfg.sampling.seed);
    let outcome = sample_observations(&log, &cfg.log, &cfg.sampling, &mut rng)?;

    save_snapshot(&cfg.snapshot_path, &outcome.snapshot)?;
    let mut report =
        serde_json::to_vec_pretty(&outcome.summary).map_err(|source| CurationError::Json {
            path: cfg.sampling_report_path.clone(),
            source,
        })?;
    report.push(b'\n');
    write_atomic(&cfg.sampling_report_path, &report).map_err(|source| CurationError::Io {
        path: cfg.sampling_report_path.clone(),
        source,
    })?;
    info!(
        snapshot = %cfg.snapshot_path.display(),
        report = %cfg.sampling_report_path.display(),
        selected = outcome.snapshot.len(),
        "sample snapshot written"
    );
    Ok(outcome)
}
