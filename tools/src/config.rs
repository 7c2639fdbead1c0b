use std::path::{Path, PathBuf};

use annotator::{AnnotateConfig, FfmpegOpener, ImageDirOpener, VideoResolver};
use bird_dataset::{CurationError, CurationResult, LogConfig, SamplingConfig, SamplingStrategy};
use cli_support::{DatasetArgs, LogArgs, SamplingArgs};
use data_contracts::LabelGeometry;
use serde::Deserialize;
use tracing::warn;
use vision_core::interfaces::{LabelRemap, VideoOpener};

const DEFAULT_CONFIG_NAME: &str = "feeder-curation.toml";
pub const CONFIG_ENV: &str = "FEEDER_CURATION_CONFIG";

/// How sampled videos are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSourceKind {
    #[default]
    Ffmpeg,
    /// Each "video" is a directory of pre-extracted frame images.
    ImageDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateSettings {
    pub frame_stride: u64,
    pub geometry: LabelGeometry,
    pub bird_class_ids: (u32, u32),
    pub logged_extension: String,
    pub stored_extension: String,
    pub detections_root: Option<PathBuf>,
    pub workers: usize,
    pub jpeg_quality: u8,
    pub frame_source: FrameSourceKind,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
}

impl Default for AnnotateSettings {
    fn default() -> Self {
        Self {
            frame_stride: 3,
            geometry: LabelGeometry::Center,
            bird_class_ids: (14, 24),
            logged_extension: "h264".to_string(),
            stored_extension: "mp4".to_string(),
            detections_root: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            jpeg_quality: 90,
            frame_source: FrameSourceKind::Ffmpeg,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
        }
    }
}

impl AnnotateSettings {
    pub fn annotate_config(&self) -> AnnotateConfig {
        AnnotateConfig {
            frame_stride: self.frame_stride,
            geometry: self.geometry,
            remap: LabelRemap {
                bird_ids: self.bird_class_ids.0..=self.bird_class_ids.1,
            },
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn video_opener(&self) -> Box<dyn VideoOpener> {
        match self.frame_source {
            FrameSourceKind::Ffmpeg => Box::new(FfmpegOpener {
                ffmpeg: self.ffmpeg_bin.clone(),
                ffprobe: self.ffprobe_bin.clone(),
            }),
            FrameSourceKind::ImageDir => Box::new(ImageDirOpener),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub log_path: PathBuf,
    pub videos_root: PathBuf,
    pub dataset_root: PathBuf,
    pub snapshot_path: PathBuf,
    pub sampling_report_path: PathBuf,
    pub stats_path: PathBuf,
    manifest_path: Option<PathBuf>,
    classes_path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    pub log: LogConfig,
    pub sampling: SamplingConfig,
    pub annotate: AnnotateSettings,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let artifacts = PathBuf::from("artifacts");
        Self {
            log_path: PathBuf::from("data/observations.tsv"),
            videos_root: PathBuf::from("data/videos"),
            dataset_root: PathBuf::from("datasets/feeder"),
            snapshot_path: artifacts.join("sample_snapshot.json"),
            sampling_report_path: artifacts.join("sampling_report.json"),
            stats_path: artifacts.join("species_stats.json"),
            manifest_path: None,
            classes_path: None,
            summary_path: None,
            log: LogConfig::default(),
            sampling: SamplingConfig::default(),
            annotate: AnnotateSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ToolConfigFile {
    log_path: Option<String>,
    videos_root: Option<String>,
    dataset_root: Option<String>,
    snapshot_path: Option<String>,
    sampling_report_path: Option<String>,
    stats_path: Option<String>,
    manifest_path: Option<String>,
    classes_path: Option<String>,
    summary_path: Option<String>,
    log: Option<LogSection>,
    sampling: Option<SamplingSection>,
    annotate: Option<AnnotateSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LogSection {
    id_column: Option<String>,
    species_column: Option<String>,
    date_column: Option<String>,
    site_column: Option<String>,
    na_label: Option<String>,
    no_subject_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SamplingSection {
    occurrence_threshold: Option<usize>,
    cap: Option<usize>,
    test_cap: Option<usize>,
    test_year: Option<i32>,
    train_probability: Option<f64>,
    seed: Option<u64>,
    strategy: Option<SamplingStrategy>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnotateSection {
    frame_stride: Option<u64>,
    geometry: Option<LabelGeometry>,
    bird_class_ids: Option<[u32; 2]>,
    logged_extension: Option<String>,
    stored_extension: Option<String>,
    detections_root: Option<String>,
    workers: Option<usize>,
    jpeg_quality: Option<u8>,
    frame_source: Option<FrameSourceKind>,
    ffmpeg_bin: Option<String>,
    ffprobe_bin: Option<String>,
}

impl ToolConfig {
    /// `FEEDER_CURATION_CONFIG`, then `./feeder-curation.toml`, then defaults.
    pub fn load() -> CurationResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let default = Path::new(DEFAULT_CONFIG_NAME);
        if default.exists() {
            return Self::from_path(default);
        }
        Ok(Self::default())
    }

    /// Explicit `--config` wins over [`ToolConfig::load`].
    pub fn load_from(explicit: Option<&Path>) -> CurationResult<Self> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => Self::load(),
        }
    }

    pub fn from_path(path: &Path) -> CurationResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| CurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
            .map_err(|e| CurationError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        let file: ToolConfigFile = toml::from_str(raw).map_err(|e| e.to_string())?;
        let cfg = Self::from_file(file);
        cfg.warn_if_unusual();
        Ok(cfg)
    }

    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = ToolConfig::default();
        let path_or = |v: Option<String>, d: PathBuf| v.map(|v| expand_path(&v)).unwrap_or(d);

        let log_section = file.log.unwrap_or_default();
        let log = LogConfig {
            id_column: log_section.id_column.unwrap_or(defaults.log.id_column),
            species_column: log_section
                .species_column
                .unwrap_or(defaults.log.species_column),
            date_column: log_section.date_column.unwrap_or(defaults.log.date_column),
            site_column: log_section.site_column.unwrap_or(defaults.log.site_column),
            na_label: log_section.na_label.unwrap_or(defaults.log.na_label),
            no_subject_label: log_section
                .no_subject_label
                .unwrap_or(defaults.log.no_subject_label),
        };

        let s = file.sampling.unwrap_or_default();
        let sd = defaults.sampling;
        let sampling = SamplingConfig {
            occurrence_threshold: s.occurrence_threshold.unwrap_or(sd.occurrence_threshold),
            cap: s.cap.unwrap_or(sd.cap),
            test_cap: s.test_cap.unwrap_or(sd.test_cap),
            test_year: s.test_year.or(sd.test_year),
            train_probability: s.train_probability.unwrap_or(sd.train_probability),
            seed: s.seed.unwrap_or(sd.seed),
            strategy: s.strategy.unwrap_or(sd.strategy),
        };

        let a = file.annotate.unwrap_or_default();
        let ad = defaults.annotate;
        let annotate = AnnotateSettings {
            frame_stride: a.frame_stride.unwrap_or(ad.frame_stride),
            geometry: a.geometry.unwrap_or(ad.geometry),
            bird_class_ids: a
                .bird_class_ids
                .map(|[lo, hi]| (lo, hi))
                .unwrap_or(ad.bird_class_ids),
            logged_extension: a.logged_extension.unwrap_or(ad.logged_extension),
            stored_extension: a.stored_extension.unwrap_or(ad.stored_extension),
            detections_root: a.detections_root.map(|v| expand_path(&v)),
            workers: a.workers.unwrap_or(ad.workers),
            jpeg_quality: a.jpeg_quality.unwrap_or(ad.jpeg_quality),
            frame_source: a.frame_source.unwrap_or(ad.frame_source),
            ffmpeg_bin: path_or(a.ffmpeg_bin, ad.ffmpeg_bin),
            ffprobe_bin: path_or(a.ffprobe_bin, ad.ffprobe_bin),
        };

        ToolConfig {
            log_path: path_or(file.log_path, defaults.log_path),
            videos_root: path_or(file.videos_root, defaults.videos_root),
            dataset_root: path_or(file.dataset_root, defaults.dataset_root),
            snapshot_path: path_or(file.snapshot_path, defaults.snapshot_path),
            sampling_report_path: path_or(
                file.sampling_report_path,
                defaults.sampling_report_path,
            ),
            stats_path: path_or(file.stats_path, defaults.stats_path),
            manifest_path: file.manifest_path.map(|v| expand_path(&v)),
            classes_path: file.classes_path.map(|v| expand_path(&v)),
            summary_path: file.summary_path.map(|v| expand_path(&v)),
            log,
            sampling,
            annotate,
        }
    }

    /// Pipeline inputs that a dataset reset must never delete.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.log_path.clone(),
            self.videos_root.clone(),
            self.snapshot_path.clone(),
        ];
        paths.extend(self.annotate.detections_root.clone());
        paths
    }

    /// Defaults to `<dataset_root>/dataset.yaml`.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.dataset_root.join("dataset.yaml"))
    }

    /// Defaults to `<dataset_root>/classes.json`.
    pub fn classes_path(&self) -> PathBuf {
        self.classes_path
            .clone()
            .unwrap_or_else(|| self.dataset_root.join("classes.json"))
    }

    /// Defaults to `<dataset_root>/curation_summary.json`.
    pub fn summary_path(&self) -> PathBuf {
        self.summary_path
            .clone()
            .unwrap_or_else(|| self.dataset_root.join("curation_summary.json"))
    }

    pub fn resolver(&self) -> VideoResolver {
        VideoResolver::new(&self.videos_root).with_extensions(
            &self.annotate.logged_extension,
            &self.annotate.stored_extension,
        )
    }

    pub fn apply_log_args(&mut self, args: &LogArgs) {
        if let Some(v) = &args.log {
            self.log_path = v.clone();
        }
        if let Some(v) = &args.na_label {
            self.log.na_label = v.clone();
        }
        if let Some(v) = &args.no_subject_label {
            self.log.no_subject_label = v.clone();
        }
    }

    pub fn apply_sampling_args(&mut self, args: &SamplingArgs) {
        let s = &mut self.sampling;
        if let Some(v) = args.threshold {
            s.occurrence_threshold = v;
        }
        if let Some(v) = args.cap {
            s.cap = v;
        }
        if let Some(v) = args.test_cap {
            s.test_cap = v;
        }
        if args.test_year.is_some() {
            s.test_year = args.test_year;
        }
        if let Some(v) = args.train_probability {
            s.train_probability = v;
        }
        if let Some(v) = args.seed {
            s.seed = v;
        }
        match args.strategy.as_deref() {
            Some("even_index") => s.strategy = SamplingStrategy::EvenIndex,
            Some("probabilistic") => s.strategy = SamplingStrategy::Probabilistic,
            _ => {}
        }
    }

    pub fn apply_dataset_args(&mut self, args: &DatasetArgs) {
        if let Some(v) = &args.snapshot {
            self.snapshot_path = v.clone();
        }
        if let Some(v) = &args.dataset_root {
            self.dataset_root = v.clone();
        }
        if let Some(v) = &args.videos_root {
            self.videos_root = v.clone();
        }
        if let Some(v) = &args.detections_root {
            self.annotate.detections_root = Some(v.clone());
        }
        if let Some(v) = args.frame_stride {
            self.annotate.frame_stride = v;
        }
        match args.geometry.as_deref() {
            Some("center") => self.annotate.geometry = LabelGeometry::Center,
            Some("corner") => self.annotate.geometry = LabelGeometry::Corner,
            _ => {}
        }
        if let Some(v) = args.workers {
            self.annotate.workers = v;
        }
    }

    /// Rejects values no stage can run with.
    pub fn validate(&self) -> CurationResult<()> {
        self.sampling.validate()?;
        let a = &self.annotate;
        if a.frame_stride == 0 {
            return Err(CurationError::InvalidConfig(
                "annotate.frame_stride must be at least 1".into(),
            ));
        }
        if a.bird_class_ids.0 > a.bird_class_ids.1 {
            return Err(CurationError::InvalidConfig(format!(
                "annotate.bird_class_ids is an empty range {}..={}",
                a.bird_class_ids.0, a.bird_class_ids.1
            )));
        }
        if a.workers == 0 {
            return Err(CurationError::InvalidConfig(
                "annotate.workers must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&a.jpeg_quality) {
            return Err(CurationError::InvalidConfig(format!(
                "annotate.jpeg_quality must be within 1..=100, got {}",
                a.jpeg_quality
            )));
        }
        Ok(())
    }

    fn warn_if_unusual(&self) {
        if self.annotate.detections_root.is_none() {
            warn!("tools config: annotate.detections_root is unset; build_dataset will need --detections-root");
        }
        if self.sampling.test_year.is_none() {
            warn!("tools config: sampling.test_year is unset; no Test split will be drawn");
        }
        if self.log.na_label == self.log.no_subject_label {
            warn!("tools config: log.na_label equals log.no_subject_label");
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

/// Replace `${VAR}`; unknown variables are left as written.
fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = &rest[start + 2..start + 2 + len];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + 3 + len]),
        }
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variables_only() {
        std::env::set_var("FEEDER_CURATION_TEST_DIR", "/srv/birds");
        assert_eq!(
            expand_env("${FEEDER_CURATION_TEST_DIR}/videos"),
            "/srv/birds/videos"
        );
        assert_eq!(expand_env("${NOT_SET_FEEDER_X}/a"), "${NOT_SET_FEEDER_X}/a");
        assert_eq!(expand_env("plain/${unterminated"), "plain/${unterminated");
        assert_eq!(expand_env("ünï/${FEEDER_CURATION_TEST_DIR}"), "ünï//srv/birds");
    }

    #[test]
    fn derived_paths_follow_dataset_root() {
        let cfg = ToolConfig::from_toml("dataset_root = \"/tmp/ds\"\n").unwrap();
        assert_eq!(cfg.manifest_path(), PathBuf::from("/tmp/ds/dataset.yaml"));
        assert_eq!(cfg.classes_path(), PathBuf::from("/tmp/ds/classes.json"));
        assert_eq!(
            cfg.summary_path(),
            PathBuf::from("/tmp/ds/curation_summary.json")
        );
    }

    #[test]
    fn cli_overrides_beat_file_values() {
        let mut cfg =
            ToolConfig::from_toml("[sampling]\ncap = 20\nstrategy = \"even_index\"\n").unwrap();
        cfg.apply_sampling_args(&SamplingArgs {
            cap: Some(7),
            strategy: Some("probabilistic".into()),
            ..Default::default()
        });
        assert_eq!(cfg.sampling.cap, 7);
        assert_eq!(cfg.sampling.strategy, SamplingStrategy::Probabilistic);
        assert_eq!(cfg.sampling.test_cap, 5);
    }
}
