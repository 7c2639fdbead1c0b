use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A decoded video frame in packed RGB8.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index of the frame within its video.
    pub id: u64,
    /// Image dimensions (width, height).
    pub size: (u32, u32),
    pub rgb: Vec<u8>,
}

impl Frame {
    pub fn to_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.size.0, self.size.1, self.rgb.clone())
    }
}

/// One raw detector output in the detector's own taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    /// Pixel corners \[x1,y1,x2,y2\].
    pub bbox: [f32; 4],
}

/// Logical label after collapsing the detector taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLabel {
    Bird,
    Other(u32),
}

/// Collapses a contiguous range of raw class ids into [`DetectedLabel::Bird`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRemap {
    pub bird_ids: RangeInclusive<u32>,
}

impl Default for LabelRemap {
    /// Animal categories 14..=24 of the COCO-trained general detector.
    fn default() -> Self {
        Self { bird_ids: 14..=24 }
    }
}

impl LabelRemap {
    pub fn label(&self, raw_class: u32) -> DetectedLabel {
        if self.bird_ids.contains(&raw_class) {
            DetectedLabel::Bird
        } else {
            DetectedLabel::Other(raw_class)
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector unavailable for {path}: {msg}")]
    Unavailable { path: PathBuf, msg: String },
    #[error("inference failed on frame {frame_id}: {msg}")]
    Inference { frame_id: u64, msg: String },
}

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("cannot open video {path}: {msg}")]
    Open { path: PathBuf, msg: String },
    #[error("decode failed in {path} at frame {frame_id}: {msg}")]
    Decode {
        path: PathBuf,
        frame_id: u64,
        msg: String,
    },
}

/// Runs inference on a frame. Calls are blocking.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError>;
}

/// Builds one detector per video; each worker owns its detectors.
pub trait DetectorFactory: Send + Sync {
    fn build(&self, video: &Path) -> Result<Box<dyn Detector + Send>, DetectorError>;
}

/// Sequential frames of one video.
pub trait FrameSource {
    fn dimensions(&self) -> (u32, u32);
    /// `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// Opens a resolved video path as a frame source.
pub trait VideoOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource + Send>, VideoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_collapses_animal_range() {
        let remap = LabelRemap::default();
        assert_eq!(remap.label(14), DetectedLabel::Bird);
        assert_eq!(remap.label(24), DetectedLabel::Bird);
        assert_eq!(remap.label(0), DetectedLabel::Other(0));
        assert_eq!(remap.label(25), DetectedLabel::Other(25));
    }

    #[test]
    fn frame_to_image_checks_buffer_len() {
        let frame = Frame {
            id: 0,
            size: (2, 2),
            rgb: vec![0; 12],
        };
        assert!(frame.to_image().is_some());
        let short = Frame {
            rgb: vec![0; 5],
            ..frame
        };
        assert!(short.to_image().is_none());
    }
}
