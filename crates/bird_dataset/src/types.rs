//! Error definitions and the selection summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type CurationResult<T> = Result<T, CurationError>;

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("observation log {path} cannot be opened: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("observation log {path} has no {column:?} column")]
    MissingColumn { path: PathBuf, column: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write class manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write sample snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid class list at {path}: {source}")]
    Contract {
        path: PathBuf,
        #[source]
        source: data_contracts::ContractError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A log row that could not be turned into an observation. Recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct MalformedRecord {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesSelection {
    pub selected: usize,
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Counts reported after sampling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub rows_read: usize,
    pub rows_malformed: usize,
    pub rows_na: usize,
    pub rows_no_subject: usize,
    pub unique_ids: usize,
    pub conflicting_ids: usize,
    pub species_total: usize,
    pub species_eligible: usize,
    pub folded_species: Vec<String>,
    pub selected: usize,
    pub per_species: BTreeMap<String, SpeciesSelection>,
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Selected {} of {} videos ({} rows read, {} malformed, {} NA, {} no-subject, {} conflicting ids)",
            self.selected,
            self.unique_ids,
            self.rows_read,
            self.rows_malformed,
            self.rows_na,
            self.rows_no_subject,
            self.conflicting_ids
        )?;
        writeln!(
            f,
            "Species: {} total, {} kept as classes, {} folded into Other",
            self.species_total,
            self.species_eligible,
            self.folded_species.len()
        )?;
        for (species, sel) in &self.per_species {
            writeln!(
                f,
                " - {species}: selected={} train={} val={} test={}",
                sel.selected, sel.train, sel.validation, sel.test
            )?;
        }
        Ok(())
    }
}
