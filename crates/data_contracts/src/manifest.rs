use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::sample::{SampleSnapshot, Split};
use crate::ContractError;

/// Output tree: `<root>/images/<split>/<id>.jpg`, `<root>/labels/<split>/<id>.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self, split: Split) -> PathBuf {
        self.root.join(Self::images_rel(split))
    }

    pub fn labels_dir(&self, split: Split) -> PathBuf {
        self.root.join("labels").join(split.dir_name())
    }

    /// Relative image directory as written into the manifest.
    pub fn images_rel(split: Split) -> String {
        format!("images/{}", split.dir_name())
    }

    /// All six leaf directories.
    pub fn leaf_dirs(&self) -> Vec<PathBuf> {
        Split::ALL
            .iter()
            .flat_map(|s| [self.images_dir(*s), self.labels_dir(*s)])
            .collect()
    }
}

/// Ordered class list; the index of a name is its detector class id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassManifest {
    names: Vec<String>,
}

impl ClassManifest {
    pub fn new(names: Vec<String>) -> Result<Self, ContractError> {
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ContractError::DuplicateClass(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Classes of a sample in first-seen order.
    pub fn from_snapshot(snapshot: &SampleSnapshot) -> Self {
        Self {
            names: snapshot.species_in_order(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn class_id(&self, species: &str) -> Result<usize, ContractError> {
        self.names
            .iter()
            .position(|n| n == species)
            .ok_or_else(|| ContractError::UnknownClass(species.to_string()))
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Every species of the snapshot must have a class id.
    pub fn covers(&self, snapshot: &SampleSnapshot) -> Result<(), ContractError> {
        for entry in snapshot.iter() {
            self.class_id(&entry.species)?;
        }
        Ok(())
    }

    /// YAML document consumed by the trainer.
    pub fn to_yaml(&self, dataset_root: &Path) -> String {
        let mut yaml = format!("path: {}\n", yaml_scalar(&dataset_root.to_string_lossy()));
        yaml.push_str(&format!("train: {}\n", DatasetLayout::images_rel(Split::Train)));
        yaml.push_str(&format!("val: {}\n", DatasetLayout::images_rel(Split::Validation)));
        yaml.push_str(&format!("test: {}\n", DatasetLayout::images_rel(Split::Test)));
        yaml.push_str("names:\n");
        for (i, name) in self.names.iter().enumerate() {
            yaml.push_str(&format!("  {i}: {}\n", yaml_scalar(name)));
        }
        yaml
    }
}

fn yaml_scalar(raw: &str) -> String {
    let plain = !raw.is_empty()
        && raw.trim() == raw
        && !raw.starts_with(['-', '?', '!', '&', '*', '[', '{', '@', '`', '"', '\'', '%', '|', '>'])
        && !raw.contains(": ")
        && !raw.contains(" #")
        && !raw.ends_with(':')
        && raw.parse::<f64>().is_err()
        && !matches!(
            raw.to_ascii_lowercase().as_str(),
            "null" | "~" | "true" | "false" | "yes" | "no" | "on" | "off"
        );
    if plain {
        raw.to_string()
    } else {
        format!("'{}'", raw.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleEntry;

    fn snapshot(species: &[&str]) -> SampleSnapshot {
        SampleSnapshot::new(
            species
                .iter()
                .enumerate()
                .map(|(i, s)| SampleEntry {
                    local_id: format!("v{i}"),
                    species: s.to_string(),
                    split: Split::Train,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn first_seen_order() {
        let manifest = ClassManifest::from_snapshot(&snapshot(&["A", "B", "A", "Other", "B"]));
        assert_eq!(manifest.names(), ["A", "B", "Other"]);
        assert_eq!(manifest.class_id("Other"), Ok(2));
        assert_eq!(
            manifest.class_id("C"),
            Err(ContractError::UnknownClass("C".into()))
        );
    }

    #[test]
    fn rejects_duplicates() {
        let err = ClassManifest::new(vec!["A".into(), "A".into()]).unwrap_err();
        assert_eq!(err, ContractError::DuplicateClass("A".into()));
    }

    #[test]
    fn yaml_document() {
        let manifest = ClassManifest::new(vec!["Great tit".into(), "Robin: juvenile".into()]).unwrap();
        let yaml = manifest.to_yaml(Path::new("/data/birds"));
        assert_eq!(
            yaml,
            "path: /data/birds\ntrain: images/train\nval: images/val\ntest: images/test\nnames:\n  0: Great tit\n  1: 'Robin: juvenile'\n"
        );
    }

    #[test]
    fn layout_has_six_leaves() {
        let layout = DatasetLayout::new("/tmp/ds");
        let leaves = layout.leaf_dirs();
        assert_eq!(leaves.len(), 6);
        assert!(leaves.contains(&PathBuf::from("/tmp/ds/labels/val")));
        assert!(leaves.contains(&PathBuf::from("/tmp/ds/images/test")));
    }
}
