//! Shared data contracts for the curation pipeline: observation records,
//! sample snapshots, class manifests, and per-frame label files.

pub mod label;
pub mod manifest;
pub mod observation;
pub mod sample;

pub use label::{BoxLabel, LabelGeometry};
pub use manifest::{ClassManifest, DatasetLayout};
pub use observation::ObservationRecord;
pub use sample::{SampleEntry, SampleSnapshot, Split};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ContractError {
    #[error("label line has {0} fields, expected 5")]
    LabelFieldCount(usize),
    #[error("label field {index} is not a number: {raw:?}")]
    LabelNumber { index: usize, raw: String },
    #[error("label coordinates out of [0,1]: {0:?}")]
    LabelOutOfRange([f64; 4]),
    #[error("label box has min > max: {0:?}")]
    LabelInverted([f64; 4]),
    #[error("frame dimensions must be non-zero, got {0}x{1}")]
    EmptyFrame(u32, u32),
    #[error("local_id {0:?} appears more than once in the sample")]
    DuplicateLocalId(String),
    #[error("class manifest lists {0:?} more than once")]
    DuplicateClass(String),
    #[error("species {0:?} is not in the class manifest")]
    UnknownClass(String),
}
