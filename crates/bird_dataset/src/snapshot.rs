//! Durable sample snapshot and atomic file replacement.

use data_contracts::SampleSnapshot;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::types::{CurationError, CurationResult};

/// Replace `path` with `bytes` via a temp file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn save_snapshot(path: &Path, snapshot: &SampleSnapshot) -> CurationResult<()> {
    let mut json = serde_json::to_vec_pretty(snapshot).map_err(|e| CurationError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    json.push(b'\n');
    write_atomic(path, &json).map_err(|e| CurationError::SnapshotWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), entries = snapshot.len(), "sample snapshot saved");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> CurationResult<SampleSnapshot> {
    let raw = fs::read(path).map_err(|e| CurationError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&raw).map_err(|e| CurationError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::{SampleEntry, Split};

    #[test]
    fn snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/filtered_species_dict.json");
        let snapshot = SampleSnapshot::new(vec![
            SampleEntry {
                local_id: "b.h264".into(),
                species: "Robin".into(),
                split: Split::Test,
            },
            SampleEntry {
                local_id: "a.h264".into(),
                species: "Wren".into(),
                split: Split::Train,
            },
        ])
        .unwrap();
        save_snapshot(&path, &snapshot).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old contents that are longer").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CurationError::Io { .. }));
    }
}
