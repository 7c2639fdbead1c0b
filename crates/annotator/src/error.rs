use std::path::PathBuf;
use thiserror::Error;
use vision_core::interfaces::{DetectorError, VideoError};

/// Failures that abort one video; the batch continues.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("source video for {local_id} not found (tried {tried})")]
    MissingSourceVideo { local_id: String, tried: PathBuf },
    #[error(transparent)]
    DecodeFailure(#[from] VideoError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error("write failed at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image encode failed at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid label for {local_id} frame {frame_id}: {source}")]
    Label {
        local_id: String,
        frame_id: u64,
        #[source]
        source: data_contracts::ContractError,
    },
}

impl AnnotateError {
    /// Short tag used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            AnnotateError::MissingSourceVideo { .. } => "missing_source_video",
            AnnotateError::DecodeFailure(_) => "decode_failure",
            AnnotateError::Detector(_) => "detector_unavailable",
            AnnotateError::Write { .. } | AnnotateError::Image { .. } => "write_failure",
            AnnotateError::Label { .. } => "invalid_label",
        }
    }
}
