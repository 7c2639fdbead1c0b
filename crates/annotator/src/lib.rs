//! Turns sampled videos into image/label pairs with a pretrained detector.
//!
//! - [`resolver`]: logged identifier -> video path on disk
//! - [`source`]: ffmpeg and image-directory frame sources
//! - [`detector`]: sidecar-detections detector factory
//! - [`annotate`]: per-video frame loop, subject selection, artifact writing

pub mod annotate;
pub mod detector;
pub mod error;
pub mod resolver;
pub mod source;

pub use annotate::{select_subject, AnnotateConfig, VideoAnnotator, VideoJob, VideoReport};
pub use detector::{SidecarDetector, SidecarDetectorFactory};
pub use error::AnnotateError;
pub use resolver::VideoResolver;
pub use source::{FfmpegOpener, ImageDirOpener};
