//! Raw per-species occurrence statistics over the observation log.

use std::collections::HashMap;

use bird_dataset::ObservationLog;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesOccurrence {
    pub species: String,
    pub videos: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesStats {
    /// Distinct video ids with a non-NA species.
    pub total_entries: usize,
    pub unique_species: usize,
    /// Most frequent first; ties by name.
    pub occurrences: Vec<SpeciesOccurrence>,
}

/// Count videos per species before any folding. Each id counts once,
/// under the species of its first row.
pub fn species_stats(log: &ObservationLog) -> SpeciesStats {
    let mut by_id: HashMap<&str, &str> = HashMap::new();
    for record in &log.records {
        if let Some(species) = record.species.as_deref() {
            by_id.entry(record.local_id.as_str()).or_insert(species);
        }
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for species in by_id.values() {
        *counts.entry(*species).or_default() += 1;
    }
    let mut occurrences: Vec<SpeciesOccurrence> = counts
        .into_iter()
        .map(|(species, videos)| SpeciesOccurrence {
            species: species.to_string(),
            videos,
        })
        .collect();
    occurrences.sort_by(|a, b| b.videos.cmp(&a.videos).then_with(|| a.species.cmp(&b.species)));
    SpeciesStats {
        total_entries: by_id.len(),
        unique_species: occurrences.len(),
        occurrences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::ObservationRecord;
    use std::path::PathBuf;

    fn rec(id: &str, species: Option<&str>) -> ObservationRecord {
        ObservationRecord {
            local_id: id.to_string(),
            species: species.map(str::to_string),
            date: "2021-05-01".to_string(),
            site: None,
        }
    }

    #[test]
    fn counts_unique_ids_and_skips_na() {
        let log = ObservationLog {
            path: PathBuf::from("log.tsv"),
            records: vec![
                rec("a", Some("Great tit")),
                rec("a", Some("Great tit")),
                rec("b", Some("Blue tit")),
                rec("c", Some("Great tit")),
                rec("d", None),
                rec("e", Some("No bird")),
            ],
            malformed: Vec::new(),
        };
        let stats = species_stats(&log);
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.unique_species, 3);
        assert_eq!(
            stats.occurrences[0],
            SpeciesOccurrence {
                species: "Great tit".into(),
                videos: 2
            }
        );
        assert_eq!(stats.occurrences[1].species, "Blue tit");
        assert_eq!(stats.occurrences[2].species, "No bird");
    }
}
