//! Sampling side of the curation pipeline.
//!
//! This crate provides utilities for:
//! - Reading the tab-separated observation log
//! - Counting species and folding rare ones into `"Other"`
//! - Stratified, seedable sample selection with a held-out test year
//! - Persisting the sample snapshot and writing the class manifest atomically

pub mod frequency;
pub mod log_reader;
pub mod manifest_writer;
pub mod sampler;
pub mod snapshot;
pub mod types;

pub use frequency::{analyze_species, SpeciesCounts, OTHER_SPECIES};
pub use log_reader::{read_observations, LogConfig, ObservationLog, ObservationReader};
pub use manifest_writer::{read_class_list, ManifestPaths, ManifestWriter};
pub use sampler::{sample_observations, SampleOutcome, SamplingConfig, SamplingStrategy};
pub use snapshot::{load_snapshot, save_snapshot, write_atomic};
pub use types::*;
