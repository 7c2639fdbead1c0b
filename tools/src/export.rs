//! Copies the held-out Test videos into their own folder.

use std::fs;
use std::path::{Path, PathBuf};

use annotator::VideoResolver;
use data_contracts::{SampleSnapshot, Split};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub copied: Vec<PathBuf>,
    pub missing: Vec<String>,
}

/// Destination name: id stem plus the stored extension.
pub fn export_name(local_id: &str, resolver: &VideoResolver) -> PathBuf {
    let stem = Path::new(local_id)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| local_id.to_string());
    PathBuf::from(format!("{stem}.{}", resolver.stored_extension))
}

/// Copy every `Test` entry's resolved video into `out_dir`. Unresolvable
/// videos are reported, not fatal.
pub fn copy_test_videos(
    snapshot: &SampleSnapshot,
    resolver: &VideoResolver,
    out_dir: &Path,
    dry_run: bool,
) -> std::io::Result<ExportReport> {
    if !dry_run {
        fs::create_dir_all(out_dir)?;
    }
    let mut report = ExportReport::default();
    for entry in snapshot.iter().filter(|e| e.split == Split::Test) {
        let source = match resolver.resolve(&entry.local_id) {
            Ok(p) => p,
            Err(err) => {
                warn!(local_id = %entry.local_id, "test video not exported: {err}");
                report.missing.push(entry.local_id.clone());
                continue;
            }
        };
        let dest = out_dir.join(export_name(&entry.local_id, resolver));
        if !dry_run {
            fs::copy(&source, &dest)?;
        }
        info!(from = %source.display(), to = %dest.display(), dry_run, "test video");
        report.copied.push(dest);
    }
    Ok(report)
}
