//! Draws label boxes back onto dataset images for visual inspection.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use data_contracts::{BoxLabel, LabelGeometry};
use vision_core::overlay::draw_label;

/// Overlay every `<id>.jpg` in `images_dir` that has a `<id>.txt` in
/// `labels_dir`; results go to `out_dir` under the same file name.
/// Returns the number of images written.
pub fn overlay_split(
    images_dir: &Path,
    labels_dir: &Path,
    out_dir: &Path,
    geometry: LabelGeometry,
) -> Result<usize> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let mut images: Vec<PathBuf> = fs::read_dir(images_dir)
        .with_context(|| format!("read {}", images_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("jpg"))
        .collect();
    images.sort();

    let mut written = 0;
    for img_path in images {
        let Some(stem) = img_path.file_stem() else {
            continue;
        };
        let label_path = labels_dir.join(stem).with_extension("txt");
        let Ok(raw) = fs::read_to_string(&label_path) else {
            tracing::debug!(image = %img_path.display(), "no label; skipped");
            continue;
        };
        let mut img = image::open(&img_path)
            .with_context(|| format!("open {}", img_path.display()))?
            .into_rgb8();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let label = BoxLabel::parse(line, geometry)
                .with_context(|| format!("parse {}", label_path.display()))?;
            if !draw_label(&mut img, label.corners(), label.class_id, 3) {
                tracing::debug!(label = %label_path.display(), "box not drawable");
            }
        }
        let out_path = out_dir.join(img_path.file_name().unwrap_or(stem));
        img.save(&out_path)
            .with_context(|| format!("write {}", out_path.display()))?;
        written += 1;
    }
    Ok(written)
}
