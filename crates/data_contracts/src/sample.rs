use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::ContractError;

/// Mutually exclusive dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    /// Leaf directory name under `images/` and `labels/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Split::Train => "Train",
            Split::Validation => "Validation",
            Split::Test => "Test",
        })
    }
}

/// One selected source video with its post-reclassification species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub local_id: String,
    pub species: String,
    pub split: Split,
}

#[derive(Serialize, Deserialize)]
struct EntryBody {
    species: String,
    split: Split,
}

/// Ordered, duplicate-free sample keyed by `local_id`.
///
/// Serialized as a JSON object `local_id -> {species, split}` whose key order
/// is the sample order, so every consumer derives the same class order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSnapshot {
    entries: Vec<SampleEntry>,
}

impl SampleSnapshot {
    pub fn new(entries: Vec<SampleEntry>) -> Result<Self, ContractError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.local_id.as_str()) {
                return Err(ContractError::DuplicateLocalId(entry.local_id.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SampleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, local_id: &str) -> Option<&SampleEntry> {
        self.entries.iter().find(|e| e.local_id == local_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleEntry> {
        self.entries.iter()
    }

    /// Distinct species in first-seen order.
    pub fn species_in_order(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.species.as_str()))
            .map(|e| e.species.clone())
            .collect()
    }
}

impl Serialize for SampleSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.local_id,
                &EntryBody {
                    species: entry.species.clone(),
                    split: entry.split,
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SampleSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = SampleSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of local_id to {species, split}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((local_id, body)) = access.next_entry::<String, EntryBody>()? {
                    entries.push(SampleEntry {
                        local_id,
                        species: body.species,
                        split: body.split,
                    });
                }
                SampleSnapshot::new(entries).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, species: &str, split: Split) -> SampleEntry {
        SampleEntry {
            local_id: id.into(),
            species: species.into(),
            split,
        }
    }

    #[test]
    fn rejects_duplicate_local_ids() {
        let err = SampleSnapshot::new(vec![
            entry("a", "Robin", Split::Train),
            entry("a", "Wren", Split::Test),
        ])
        .unwrap_err();
        assert_eq!(err, ContractError::DuplicateLocalId("a".into()));
    }

    #[test]
    fn json_keeps_sample_order() {
        let snapshot = SampleSnapshot::new(vec![
            entry("zeta", "Wren", Split::Train),
            entry("alpha", "Robin", Split::Validation),
            entry("mid", "Wren", Split::Test),
        ])
        .unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
        assert!(json.contains(r#""split":"Validation""#));

        let back: SampleSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.species_in_order(), vec!["Wren", "Robin"]);
    }

    #[test]
    fn duplicate_keys_in_json_fail_to_load() {
        let raw = r#"{"a":{"species":"Robin","split":"Train"},"a":{"species":"Wren","split":"Test"}}"#;
        assert!(serde_json::from_str::<SampleSnapshot>(raw).is_err());
    }

    #[test]
    fn split_directories() {
        let dirs: Vec<_> = Split::ALL.iter().map(Split::dir_name).collect();
        assert_eq!(dirs, vec!["train", "val", "test"]);
    }
}
