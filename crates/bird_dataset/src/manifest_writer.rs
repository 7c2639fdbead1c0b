//! Class manifest (YAML for the trainer) plus the companion class list.

use data_contracts::{ClassManifest, DatasetLayout, SampleSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

use crate::snapshot::write_atomic;
use crate::types::{CurationError, CurationResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPaths {
    /// YAML manifest consumed by the trainer.
    pub manifest: PathBuf,
    /// Ordered JSON array of class names.
    pub classes: PathBuf,
}

impl ManifestPaths {
    /// Defaults inside the dataset root.
    pub fn in_root(layout: &DatasetLayout) -> Self {
        Self {
            manifest: layout.root.join("dataset.yaml"),
            classes: layout.root.join("classes.json"),
        }
    }
}

pub struct ManifestWriter {
    pub paths: ManifestPaths,
    pub layout: DatasetLayout,
}

impl ManifestWriter {
    pub fn new(paths: ManifestPaths, layout: DatasetLayout) -> Self {
        Self { paths, layout }
    }

    /// Derive the class list from the sample and write both artifacts.
    pub fn write_for(&self, snapshot: &SampleSnapshot) -> CurationResult<ClassManifest> {
        let manifest = ClassManifest::from_snapshot(snapshot);
        self.write(&manifest)?;
        Ok(manifest)
    }

    pub fn write(&self, manifest: &ClassManifest) -> CurationResult<()> {
        let root = std::path::absolute(&self.layout.root).map_err(|e| {
            CurationError::ManifestWrite {
                path: self.paths.manifest.clone(),
                source: e,
            }
        })?;
        write_atomic(&self.paths.manifest, manifest.to_yaml(&root).as_bytes()).map_err(|e| {
            CurationError::ManifestWrite {
                path: self.paths.manifest.clone(),
                source: e,
            }
        })?;

        let mut classes = serde_json::to_vec_pretty(manifest).map_err(|e| CurationError::Json {
            path: self.paths.classes.clone(),
            source: e,
        })?;
        classes.push(b'\n');
        write_atomic(&self.paths.classes, &classes).map_err(|e| CurationError::ManifestWrite {
            path: self.paths.classes.clone(),
            source: e,
        })?;
        tracing::info!(
            manifest = %self.paths.manifest.display(),
            classes = manifest.len(),
            "class manifest written"
        );
        Ok(())
    }
}

/// Load the companion class list written by [`ManifestWriter`].
pub fn read_class_list(path: &Path) -> CurationResult<ClassManifest> {
    let raw = fs::read(path).map_err(|e| CurationError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let names: Vec<String> = serde_json::from_slice(&raw).map_err(|e| CurationError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    ClassManifest::new(names).map_err(|e| CurationError::Contract {
        path: path.to_path_buf(),
        source: e,
    })
}
