//! Per-species occurrence counting and rare-species folding.

use data_contracts::ObservationRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Synthetic class that absorbs every species below the occurrence threshold.
pub const OTHER_SPECIES: &str = "Other";

/// Post-fold species counts in first-seen order, `"Other"` last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    counts: Vec<(String, usize)>,
    /// Species folded into `"Other"`, in first-seen order.
    pub folded: Vec<String>,
    /// Distinct species before folding.
    pub species_total: usize,
    pub rows_na: usize,
    pub rows_no_subject: usize,
}

impl SpeciesCounts {
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(s, c)| (s.as_str(), *c))
    }

    pub fn get(&self, species: &str) -> Option<usize> {
        self.counts.iter().find(|(s, _)| s == species).map(|(_, c)| *c)
    }

    /// Class position of an eligible species, used to order the sample.
    pub fn rank(&self, class: &str) -> Option<usize> {
        self.counts.iter().position(|(s, _)| s == class)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Class a raw species is sampled under: itself if kept, `"Other"` if folded,
    /// `None` for species that were never counted.
    pub fn class_of<'a>(&'a self, species: &'a str) -> Option<&'a str> {
        if species != OTHER_SPECIES && self.get(species).is_some() {
            return Some(species);
        }
        if self.folded.iter().any(|f| f == species) || species == OTHER_SPECIES {
            return self.get(OTHER_SPECIES).map(|_| OTHER_SPECIES);
        }
        None
    }
}

/// Count rows per species, skipping NA and the no-subject label, then fold
/// every species with fewer than `threshold` rows into `"Other"`.
pub fn analyze_species<'a, I>(records: I, threshold: usize, no_subject_label: &str) -> SpeciesCounts
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut raw: HashMap<String, usize> = HashMap::new();
    let mut rows_na = 0usize;
    let mut rows_no_subject = 0usize;
    for record in records {
        let Some(species) = record.species.as_deref() else {
            rows_na += 1;
            continue;
        };
        if species == no_subject_label {
            rows_no_subject += 1;
            continue;
        }
        let count = raw.entry(species.to_string()).or_insert_with(|| {
            order.push(species.to_string());
            0
        });
        *count += 1;
    }

    let mut counts = Vec::new();
    let mut folded = Vec::new();
    let mut other = 0usize;
    for species in &order {
        let count = raw[species];
        if species == OTHER_SPECIES {
            other += count;
        } else if count < threshold {
            other += count;
            folded.push(species.clone());
        } else {
            counts.push((species.clone(), count));
        }
    }
    if other > 0 {
        counts.push((OTHER_SPECIES.to_string(), other));
    }
    tracing::info!(
        species = order.len(),
        kept = counts.len(),
        folded = folded.len(),
        threshold,
        "species frequencies analyzed"
    );
    SpeciesCounts {
        counts,
        folded,
        species_total: order.len(),
        rows_na,
        rows_no_subject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(spec: &[(&str, usize)]) -> Vec<ObservationRecord> {
        let mut out = Vec::new();
        for (species, n) in spec {
            for i in 0..*n {
                out.push(ObservationRecord {
                    local_id: format!("{species}_{i}"),
                    species: (*species != "NA").then(|| species.to_string()),
                    date: "2021-01-01".into(),
                    site: None,
                });
            }
        }
        out
    }

    #[test]
    fn folds_species_below_threshold() {
        let records = rows(&[("A", 500), ("C", 50), ("B", 250), ("NA", 7), ("No bird", 3)]);
        let counts = analyze_species(&records, 200, "No bird");
        let listed: Vec<_> = counts.iter().collect();
        assert_eq!(listed, vec![("A", 500), ("B", 250), ("Other", 50)]);
        assert_eq!(counts.folded, vec!["C"]);
        assert_eq!(counts.species_total, 3);
        assert_eq!(counts.rows_na, 7);
        assert_eq!(counts.rows_no_subject, 3);
        assert_eq!(counts.class_of("C"), Some("Other"));
        assert_eq!(counts.class_of("A"), Some("A"));
        assert_eq!(counts.class_of("Z"), None);
    }

    #[test]
    fn no_kept_species_is_below_threshold() {
        let records = rows(&[("A", 3), ("B", 9), ("C", 10), ("D", 1)]);
        let counts = analyze_species(&records, 10, "No bird");
        for (species, count) in counts.iter() {
            assert!(species == OTHER_SPECIES || count >= 10, "{species}={count}");
        }
        assert_eq!(counts.get(OTHER_SPECIES), Some(13));
    }

    #[test]
    fn logged_other_merges_into_bucket() {
        let records = rows(&[("Other", 4), ("A", 5), ("B", 1)]);
        let counts = analyze_species(&records, 2, "No bird");
        let listed: Vec<_> = counts.iter().collect();
        assert_eq!(listed, vec![("A", 5), ("Other", 5)]);
    }

    #[test]
    fn threshold_one_keeps_everything() {
        let records = rows(&[("A", 1), ("B", 2)]);
        let counts = analyze_species(&records, 1, "No bird");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get(OTHER_SPECIES), None);
        assert!(counts.folded.is_empty());
    }
}
