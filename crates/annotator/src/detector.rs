//! Detector adapter over precomputed detections.
//!
//! The general-purpose detector runs outside this pipeline and leaves one
//! JSON-lines file per video, `<root>/<video stem>.jsonl`, each line
//! `{"frame": N, "detections": [{"class_id", "confidence", "bbox"}]}` in the
//! detector's own output order.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use vision_core::interfaces::{Detector, DetectorError, DetectorFactory, Frame, RawDetection};

#[derive(Deserialize)]
struct FrameDetections {
    frame: u64,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

pub struct SidecarDetector {
    by_frame: HashMap<u64, Vec<RawDetection>>,
}

impl SidecarDetector {
    pub fn from_path(path: &Path) -> Result<Self, DetectorError> {
        let unavailable = |msg: String| DetectorError::Unavailable {
            path: path.to_path_buf(),
            msg,
        };
        let raw = fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let mut by_frame = HashMap::new();
        for (i, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: FrameDetections = serde_json::from_str(line)
                .map_err(|e| unavailable(format!("line {}: {e}", i + 1)))?;
            by_frame
                .entry(parsed.frame)
                .or_insert_with(Vec::new)
                .extend(parsed.detections);
        }
        Ok(Self { by_frame })
    }
}

impl Detector for SidecarDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        Ok(self.by_frame.get(&frame.id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct SidecarDetectorFactory {
    pub root: PathBuf,
}

impl SidecarDetectorFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn sidecar_path(&self, video: &Path) -> PathBuf {
        let mut name = video
            .file_stem()
            .unwrap_or(video.as_os_str())
            .to_os_string();
        name.push(".jsonl");
        self.root.join(name)
    }
}

impl DetectorFactory for SidecarDetectorFactory {
    fn build(&self, video: &Path) -> Result<Box<dyn Detector + Send>, DetectorError> {
        Ok(Box::new(SidecarDetector::from_path(&self.sidecar_path(video))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u64) -> Frame {
        Frame {
            id,
            size: (8, 8),
            rgb: vec![0; 192],
        }
    }

    #[test]
    fn serves_detections_by_frame_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("clip_3.jsonl"),
            concat!(
                r#"{"frame":0,"detections":[{"class_id":0,"confidence":0.9,"bbox":[1,1,4,4]},{"class_id":14,"confidence":0.5,"bbox":[2,2,6,6]}]}"#,
                "\n\n",
                r#"{"frame":3}"#,
                "\n"
            ),
        )
        .unwrap();
        let factory = SidecarDetectorFactory::new(dir.path());
        let mut det = factory.build(Path::new("/videos/clip_3.mp4")).unwrap();
        let out = det.detect(&frame(0)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].class_id, 0);
        assert_eq!(out[1].bbox, [2.0, 2.0, 6.0, 6.0]);
        assert!(det.detect(&frame(3)).unwrap().is_empty());
        assert!(det.detect(&frame(9)).unwrap().is_empty());
    }

    #[test]
    fn missing_sidecar_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let factory = SidecarDetectorFactory::new(dir.path());
        assert!(matches!(
            factory.build(Path::new("nope.mp4")),
            Err(DetectorError::Unavailable { .. })
        ));
    }

    #[test]
    fn sidecar_path_uses_video_stem() {
        let factory = SidecarDetectorFactory::new("/det");
        assert_eq!(
            factory.sidecar_path(Path::new("/v/2021/clip.v2.mp4")),
            PathBuf::from("/det/clip.v2.jsonl")
        );
    }
}
