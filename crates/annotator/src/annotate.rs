use data_contracts::{BoxLabel, DatasetLayout, LabelGeometry, Split};
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use vision_core::interfaces::{
    DetectedLabel, Detector, Frame, FrameSource, LabelRemap, RawDetection, VideoError,
};

use crate::error::AnnotateError;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateConfig {
    /// Only frames with `id % frame_stride == 0` reach the detector. 1 keeps every frame.
    pub frame_stride: u64,
    pub geometry: LabelGeometry,
    pub remap: LabelRemap,
    pub jpeg_quality: u8,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            frame_stride: 3,
            geometry: LabelGeometry::Center,
            remap: LabelRemap::default(),
            jpeg_quality: 90,
        }
    }
}

/// One resolved sample entry ready for annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    /// Position of the entry in the snapshot; prefixes every artifact id.
    pub seq: usize,
    pub local_id: String,
    pub video_path: PathBuf,
    pub class_id: usize,
    pub split: Split,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReport {
    pub local_id: String,
    pub frames_decoded: u64,
    pub frames_sampled: u64,
    pub frames_written: u64,
    pub frames_no_detection: u64,
    pub frames_detector_failed: u64,
    pub cancelled: bool,
}

impl VideoReport {
    /// Completed without emitting a single pair.
    pub fn had_no_detections(&self) -> bool {
        !self.cancelled && self.frames_written == 0
    }
}

/// Fixed-width artifact id; unique across videos and sortable within one.
pub fn annotation_id(seq: usize, frame_id: u64) -> String {
    format!("{seq:08}_{frame_id:04}")
}

/// First detection, in detector order, that remaps to a bird.
///
/// Later birds in the same frame are ignored even when they score higher.
pub fn select_subject<'a>(
    detections: &'a [RawDetection],
    remap: &LabelRemap,
) -> Option<&'a RawDetection> {
    detections
        .iter()
        .find(|d| remap.label(d.class_id) == DetectedLabel::Bird)
}

pub struct VideoAnnotator {
    cfg: AnnotateConfig,
    layout: DatasetLayout,
}

impl VideoAnnotator {
    pub fn new(cfg: AnnotateConfig, layout: DatasetLayout) -> Self {
        Self { cfg, layout }
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Annotate one video. On error every pair already written for this
    /// video is removed before the error is returned.
    pub fn annotate(
        &self,
        job: &VideoJob,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        cancel: &AtomicBool,
    ) -> Result<VideoReport, AnnotateError> {
        let mut written = Vec::new();
        match self.run(job, source, detector, cancel, &mut written) {
            Ok(report) => {
                info!(
                    local_id = %job.local_id,
                    split = %job.split,
                    decoded = report.frames_decoded,
                    written = report.frames_written,
                    cancelled = report.cancelled,
                    "video annotated"
                );
                Ok(report)
            }
            Err(err) => {
                for path in &written {
                    if let Err(e) = fs::remove_file(path) {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            warn!(path = %path.display(), "rollback failed: {e}");
                        }
                    }
                }
                warn!(
                    local_id = %job.local_id,
                    removed = written.len(),
                    "video aborted: {err}"
                );
                Err(err)
            }
        }
    }

    fn run(
        &self,
        job: &VideoJob,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        cancel: &AtomicBool,
        written: &mut Vec<PathBuf>,
    ) -> Result<VideoReport, AnnotateError> {
        let stride = self.cfg.frame_stride.max(1);
        let images_dir = self.layout.images_dir(job.split);
        let labels_dir = self.layout.labels_dir(job.split);
        let mut report = VideoReport {
            local_id: job.local_id.clone(),
            ..VideoReport::default()
        };

        loop {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            let Some(frame) = source.next_frame()? else {
                break;
            };
            report.frames_decoded += 1;
            if frame.id % stride != 0 {
                continue;
            }
            report.frames_sampled += 1;

            let detections = match detect_with_retry(detector, &frame) {
                Some(d) => d,
                None => {
                    report.frames_detector_failed += 1;
                    continue;
                }
            };
            let Some(subject) = select_subject(&detections, &self.cfg.remap) else {
                report.frames_no_detection += 1;
                continue;
            };

            let label =
                BoxLabel::from_pixel_box(job.class_id, subject.bbox, frame.size, self.cfg.geometry)
                    .map_err(|source| AnnotateError::Label {
                        local_id: job.local_id.clone(),
                        frame_id: frame.id,
                        source,
                    })?;
            let id = annotation_id(job.seq, frame.id);
            let image_path = images_dir.join(format!("{id}.jpg"));
            let label_path = labels_dir.join(format!("{id}.txt"));

            written.push(image_path.clone());
            self.write_image(&job.video_path, &frame, &image_path)?;
            written.push(label_path.clone());
            fs::write(&label_path, label.to_line()).map_err(|source| AnnotateError::Write {
                path: label_path.clone(),
                source,
            })?;
            report.frames_written += 1;
            debug!(local_id = %job.local_id, frame = frame.id, %id, "pair written");
        }
        Ok(report)
    }

    fn write_image(&self, video: &Path, frame: &Frame, path: &Path) -> Result<(), AnnotateError> {
        let img = frame.to_image().ok_or_else(|| VideoError::Decode {
            path: video.to_path_buf(),
            frame_id: frame.id,
            msg: format!(
                "buffer of {} bytes does not match {}x{}",
                frame.rgb.len(),
                frame.size.0,
                frame.size.1
            ),
        })?;
        let file = File::create(path).map_err(|source| AnnotateError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut out, self.cfg.jpeg_quality);
        img.write_with_encoder(encoder)
            .map_err(|source| AnnotateError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        out.flush().map_err(|source| AnnotateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One retry, then the frame is skipped.
fn detect_with_retry(detector: &mut dyn Detector, frame: &Frame) -> Option<Vec<RawDetection>> {
    match detector.detect(frame) {
        Ok(d) => Some(d),
        Err(first) => {
            debug!(frame = frame.id, "detector failed, retrying: {first}");
            match detector.detect(frame) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(frame = frame.id, "detector failed twice, skipping frame: {e}");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: [0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn first_bird_wins_regardless_of_confidence() {
        let dets = [det(0, 0.99), det(15, 0.3), det(14, 0.95)];
        let chosen = select_subject(&dets, &LabelRemap::default()).unwrap();
        assert_eq!(chosen.class_id, 15);
    }

    #[test]
    fn no_bird_means_no_subject() {
        let dets = [det(0, 0.9), det(25, 0.9), det(13, 0.9)];
        assert!(select_subject(&dets, &LabelRemap::default()).is_none());
        assert!(select_subject(&[], &LabelRemap::default()).is_none());
    }

    #[test]
    fn ids_are_fixed_width_and_ordered() {
        assert_eq!(annotation_id(7, 3), "00000007_0003");
        assert_eq!(annotation_id(12, 12345), "00000012_12345");
        assert!(annotation_id(1, 9) < annotation_id(1, 12));
        assert_ne!(annotation_id(1, 12), annotation_id(11, 2));
    }
}
