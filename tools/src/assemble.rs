//! Dataset assembly: reset the output tree, write the class manifest, then
//! annotate every sampled video on a worker pool and summarize the run.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use annotator::{
    AnnotateConfig, AnnotateError, SidecarDetectorFactory, VideoAnnotator, VideoJob, VideoResolver,
};
use bird_dataset::{read_class_list, write_atomic, CurationError, ManifestPaths, ManifestWriter};
use data_contracts::{DatasetLayout, SampleSnapshot, Split};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use vision_core::interfaces::{DetectorFactory, VideoOpener};

use crate::config::ToolConfig;

/// Fatal assembly errors. Per-video failures never surface here.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Curation(#[from] CurationError),
    #[error("refusing to reset dataset root {0}")]
    UnsafeRoot(PathBuf),
    #[error("failed to reset dataset root {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("class list {path} does not cover the sample: {source}")]
    ClassList {
        path: PathBuf,
        #[source]
        source: data_contracts::ContractError,
    },
    #[error("no detections root configured (set annotate.detections_root or --detections-root)")]
    NoDetectionsRoot,
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to write run summary {path}: {source}")]
    SummaryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct AssemblyOptions {
    pub layout: DatasetLayout,
    pub manifest_paths: ManifestPaths,
    pub summary_path: PathBuf,
    pub resolver: VideoResolver,
    pub annotate: AnnotateConfig,
    pub workers: usize,
    /// Inputs the dataset root must not contain.
    pub protected: Vec<PathBuf>,
}

impl AssemblyOptions {
    pub fn from_config(cfg: &ToolConfig) -> Self {
        Self {
            layout: DatasetLayout::new(&cfg.dataset_root),
            manifest_paths: ManifestPaths {
                manifest: cfg.manifest_path(),
                classes: cfg.classes_path(),
            },
            summary_path: cfg.summary_path(),
            resolver: cfg.resolver(),
            annotate: cfg.annotate.annotate_config(),
            workers: cfg.annotate.workers,
            protected: cfg.input_paths(),
        }
    }
}

/// Skip reason tag for videos that completed without a single pair.
pub const SKIP_NO_DETECTIONS: &str = "no_detections";
pub const SKIP_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesTally {
    pub selected: usize,
    pub test: usize,
    pub videos_with_pairs: usize,
    pub pairs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFailure {
    pub local_id: String,
    pub stage: String,
    pub cause: String,
}

/// Durable record of one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub selected: usize,
    pub videos_with_pairs: usize,
    pub pairs_written: u64,
    pub classes: Vec<String>,
    pub per_species: BTreeMap<String, SpeciesTally>,
    /// Reason -> number of videos that produced no pairs for it.
    pub skipped: BTreeMap<String, usize>,
    /// Videos stopped mid-stream whose pairs so far are kept and counted.
    #[serde(default)]
    pub partial: Vec<String>,
    pub failures: Vec<VideoFailure>,
}

impl RunSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Videos with pairs: {} / {} selected ({} image/label pairs)",
            self.videos_with_pairs, self.selected, self.pairs_written
        )?;
        if !self.partial.is_empty() {
            writeln!(f, "Stopped mid-video (pairs kept): {}", self.partial.len())?;
        }
        writeln!(f, "Skipped: {}", self.skipped_total())?;
        for (reason, n) in &self.skipped {
            writeln!(f, "  {reason}: {n}")?;
        }
        writeln!(f, "Per species (selected / test / pairs):")?;
        for name in &self.classes {
            if let Some(t) = self.per_species.get(name) {
                writeln!(f, "  {name}: {} / {} / {}", t.selected, t.test, t.pairs)?;
            }
        }
        Ok(())
    }
}

enum JobOutcome {
    Done(annotator::VideoReport),
    Failed(AnnotateError),
    /// Carries the partial report when the stop arrived mid-video.
    Cancelled(Option<annotator::VideoReport>),
}

/// Delete and recreate `<root>` with the six split leaves.
///
/// The root is refused when it names `.`/`..`, the filesystem root, the
/// working directory or one of its ancestors, or an ancestor of any path in
/// `protected` (pipeline inputs that must survive the reset).
pub fn reset_output(layout: &DatasetLayout, protected: &[PathBuf]) -> Result<(), AssembleError> {
    let root = &layout.root;
    let reset_err = |path: &Path, source| AssembleError::Reset {
        path: path.to_path_buf(),
        source,
    };
    let unsafe_root = || AssembleError::UnsafeRoot(root.clone());
    if root.as_os_str().is_empty()
        || matches!(
            root.components().next_back(),
            None | Some(
                Component::CurDir
                    | Component::ParentDir
                    | Component::RootDir
                    | Component::Prefix(_)
            )
        )
    {
        return Err(unsafe_root());
    }
    let resolved = resolve_path(root).map_err(|e| reset_err(root, e))?;
    if resolved.parent().is_none() {
        return Err(unsafe_root());
    }
    let cwd = std::env::current_dir().map_err(|e| reset_err(root, e))?;
    let cwd = resolve_path(&cwd).map_err(|e| reset_err(root, e))?;
    if cwd.starts_with(&resolved) {
        return Err(unsafe_root());
    }
    for path in protected {
        let path = resolve_path(path).map_err(|e| reset_err(path, e))?;
        if path.starts_with(&resolved) {
            warn!(root = %root.display(), input = %path.display(), "dataset root contains a pipeline input");
            return Err(unsafe_root());
        }
    }
    if root.exists() {
        fs::remove_dir_all(root).map_err(|e| reset_err(root, e))?;
    }
    for dir in layout.leaf_dirs() {
        fs::create_dir_all(&dir).map_err(|e| reset_err(&dir, e))?;
    }
    Ok(())
}

/// Build the dataset for `snapshot`. Only manifest, class-list, and summary
/// write failures abort; every per-video problem is recorded and skipped.
pub fn assemble_dataset(
    opts: &AssemblyOptions,
    snapshot: &SampleSnapshot,
    opener: &dyn VideoOpener,
    detectors: &dyn DetectorFactory,
    cancel: &AtomicBool,
) -> Result<RunSummary, AssembleError> {
    reset_output(&opts.layout, &opts.protected)?;

    let writer = ManifestWriter::new(opts.manifest_paths.clone(), opts.layout.clone());
    writer.write_for(snapshot)?;
    let classes = read_class_list(&opts.manifest_paths.classes)?;
    classes
        .covers(snapshot)
        .map_err(|source| AssembleError::ClassList {
            path: opts.manifest_paths.classes.clone(),
            source,
        })?;
    info!(
        classes = classes.len(),
        manifest = %opts.manifest_paths.manifest.display(),
        "class manifest written"
    );

    let mut jobs = Vec::with_capacity(snapshot.len());
    let mut outcomes: Vec<(usize, JobOutcome)> = Vec::with_capacity(snapshot.len());
    for (seq, entry) in snapshot.iter().enumerate() {
        let class_id = classes
            .class_id(&entry.species)
            .map_err(|source| AssembleError::ClassList {
                path: opts.manifest_paths.classes.clone(),
                source,
            })?;
        match opts.resolver.resolve(&entry.local_id) {
            Ok(video_path) => jobs.push(VideoJob {
                seq,
                local_id: entry.local_id.clone(),
                video_path,
                class_id,
                split: entry.split,
            }),
            Err(err) => outcomes.push((seq, JobOutcome::Failed(err))),
        }
    }

    let annotator = VideoAnnotator::new(opts.annotate.clone(), opts.layout.clone());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers.max(1))
        .thread_name(|i| format!("annotate-{i}"))
        .build()?;
    let annotated: Vec<(usize, JobOutcome)> = pool.install(|| {
        jobs.par_iter()
            .map(|job| (job.seq, run_job(&annotator, job, opener, detectors, cancel)))
            .collect()
    });
    outcomes.extend(annotated);
    outcomes.sort_by_key(|(seq, _)| *seq);

    let summary = summarize(snapshot, classes.names(), &outcomes);
    let mut body = serde_json::to_vec_pretty(&summary).map_err(|e| AssembleError::SummaryWrite {
        path: opts.summary_path.clone(),
        source: e.into(),
    })?;
    body.push(b'\n');
    write_atomic(&opts.summary_path, &body).map_err(|source| AssembleError::SummaryWrite {
        path: opts.summary_path.clone(),
        source,
    })?;
    info!(
        selected = summary.selected,
        with_pairs = summary.videos_with_pairs,
        pairs = summary.pairs_written,
        skipped = summary.skipped_total(),
        summary = %opts.summary_path.display(),
        "dataset assembled"
    );
    Ok(summary)
}

/// [`assemble_dataset`] with the configured frame source and sidecar detections.
pub fn assemble_from_config(
    cfg: &ToolConfig,
    snapshot: &SampleSnapshot,
    cancel: &AtomicBool,
) -> Result<RunSummary, AssembleError> {
    cfg.validate()?;
    let root = cfg
        .annotate
        .detections_root
        .as_ref()
        .ok_or(AssembleError::NoDetectionsRoot)?;
    let detectors = SidecarDetectorFactory::new(root);
    let opener = cfg.annotate.video_opener();
    assemble_dataset(
        &AssemblyOptions::from_config(cfg),
        snapshot,
        opener.as_ref(),
        &detectors,
        cancel,
    )
}

fn run_job(
    annotator: &VideoAnnotator,
    job: &VideoJob,
    opener: &dyn VideoOpener,
    detectors: &dyn DetectorFactory,
    cancel: &AtomicBool,
) -> JobOutcome {
    if cancel.load(Ordering::Relaxed) {
        return JobOutcome::Cancelled(None);
    }
    let result = opener
        .open(&job.video_path)
        .map_err(AnnotateError::from)
        .and_then(|mut source| {
            let mut detector = detectors.build(&job.video_path)?;
            annotator.annotate(job, source.as_mut(), detector.as_mut(), cancel)
        });
    match result {
        Ok(report) if report.cancelled => JobOutcome::Cancelled(Some(report)),
        Ok(report) => JobOutcome::Done(report),
        Err(err) => {
            warn!(local_id = %job.local_id, stage = err.kind(), "video skipped: {err}");
            JobOutcome::Failed(err)
        }
    }
}

fn summarize(
    snapshot: &SampleSnapshot,
    classes: &[String],
    outcomes: &[(usize, JobOutcome)],
) -> RunSummary {
    let mut summary = RunSummary {
        selected: snapshot.len(),
        classes: classes.to_vec(),
        ..RunSummary::default()
    };
    for entry in snapshot.iter() {
        let tally = summary.per_species.entry(entry.species.clone()).or_default();
        tally.selected += 1;
        if entry.split == Split::Test {
            tally.test += 1;
        }
    }
    let entries = snapshot.entries();
    for (seq, outcome) in outcomes {
        let entry = &entries[*seq];
        let reason = match outcome {
            JobOutcome::Done(report) | JobOutcome::Cancelled(Some(report))
                if report.frames_written > 0 =>
            {
                summary.videos_with_pairs += 1;
                summary.pairs_written += report.frames_written;
                let tally = summary.per_species.entry(entry.species.clone()).or_default();
                tally.videos_with_pairs += 1;
                tally.pairs += report.frames_written;
                if report.cancelled {
                    summary.partial.push(entry.local_id.clone());
                }
                continue;
            }
            JobOutcome::Done(_) => SKIP_NO_DETECTIONS,
            JobOutcome::Cancelled(_) => SKIP_CANCELLED,
            JobOutcome::Failed(err) => {
                summary.failures.push(VideoFailure {
                    local_id: entry.local_id.clone(),
                    stage: err.kind().to_string(),
                    cause: err.to_string(),
                });
                err.kind()
            }
        };
        *summary.skipped.entry(reason.to_string()).or_default() += 1;
    }
    summary
}

/// Canonical form of `path`, or its absolute form when it does not exist yet.
fn resolve_path(path: &Path) -> std::io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(p) => Ok(p),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::path::absolute(path),
        Err(e) => Err(e),
    }
}
