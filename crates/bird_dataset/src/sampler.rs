//! Stratified, seedable selection of source videos with a held-out test year.

use data_contracts::{SampleEntry, SampleSnapshot, Split};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::frequency::{analyze_species, SpeciesCounts};
use crate::log_reader::{LogConfig, ObservationLog};
use crate::types::{CurationError, CurationResult, SelectionSummary, SpeciesSelection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Evenly spaced draw per (species, year) stratum.
    #[default]
    EvenIndex,
    /// Single pass with inclusion probability `2 * cap / (count + 1)`.
    Probabilistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Species with fewer rows are folded into `"Other"`.
    pub occurrence_threshold: usize,
    /// Max Train/Validation videos per species.
    pub cap: usize,
    /// Max Test videos per species.
    pub test_cap: usize,
    /// Records from this year are only eligible for Test.
    pub test_year: Option<i32>,
    /// Probability of Train (vs. Validation) for a non-test video.
    pub train_probability: f64,
    pub seed: u64,
    pub strategy: SamplingStrategy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            occurrence_threshold: 300,
            cap: 50,
            test_cap: 5,
            test_year: None,
            train_probability: 0.8,
            seed: 0,
            strategy: SamplingStrategy::EvenIndex,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> CurationResult<()> {
        if self.occurrence_threshold == 0 {
            return Err(CurationError::InvalidConfig(
                "occurrence_threshold must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.train_probability) {
            return Err(CurationError::InvalidConfig(format!(
                "train_probability must be within [0, 1], got {}",
                self.train_probability
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub snapshot: SampleSnapshot,
    pub counts: SpeciesCounts,
    pub summary: SelectionSummary,
}

/// One unique, eligible source video.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    local_id: &'a str,
    class: &'a str,
    rank: usize,
    year: Option<i32>,
}

/// Count species, fold rare ones, then select and split the sample.
pub fn sample_observations<R: Rng + ?Sized>(
    log: &ObservationLog,
    log_cfg: &LogConfig,
    cfg: &SamplingConfig,
    rng: &mut R,
) -> CurationResult<SampleOutcome> {
    cfg.validate()?;
    let counts = analyze_species(&log.records, cfg.occurrence_threshold, &log_cfg.no_subject_label);

    let mut first_class: HashMap<&str, &str> = HashMap::new();
    let mut conflicting: HashSet<&str> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    for record in &log.records {
        let Some(species) = record.species.as_deref() else {
            continue;
        };
        if species == log_cfg.no_subject_label {
            continue;
        }
        let Some(class) = counts.class_of(species) else {
            continue;
        };
        match first_class.get(record.local_id.as_str()) {
            Some(prev) => {
                if *prev != class && conflicting.insert(record.local_id.as_str()) {
                    tracing::warn!(
                        local_id = %record.local_id,
                        kept = prev,
                        ignored = class,
                        "local id logged with conflicting species; keeping first"
                    );
                }
            }
            None => {
                first_class.insert(record.local_id.as_str(), class);
                candidates.push(Candidate {
                    local_id: &record.local_id,
                    class,
                    rank: counts.rank(class).unwrap_or(usize::MAX),
                    year: record.year(),
                });
            }
        }
    }

    let mut picks = match cfg.strategy {
        SamplingStrategy::EvenIndex => select_even_index(&candidates, cfg, rng),
        SamplingStrategy::Probabilistic => select_probabilistic(&candidates, &counts, cfg, rng),
    };
    picks.sort_by_key(|(c, _)| c.rank);

    let mut entries = Vec::with_capacity(picks.len());
    for (candidate, is_test) in picks {
        let split = if is_test {
            Split::Test
        } else if rng.random_bool(cfg.train_probability) {
            Split::Train
        } else {
            Split::Validation
        };
        entries.push(SampleEntry {
            local_id: candidate.local_id.to_string(),
            species: candidate.class.to_string(),
            split,
        });
    }
    let snapshot = SampleSnapshot::new(entries)
        .map_err(|e| CurationError::InvalidConfig(format!("sample invariant broken: {e}")))?;

    let summary = summarize(log, &counts, &snapshot, candidates.len(), conflicting.len());
    tracing::info!(
        selected = summary.selected,
        unique_ids = summary.unique_ids,
        strategy = ?cfg.strategy,
        seed = cfg.seed,
        "sample selected"
    );
    Ok(SampleOutcome {
        snapshot,
        counts,
        summary,
    })
}

fn is_test_year(candidate: &Candidate, cfg: &SamplingConfig) -> bool {
    cfg.test_year.is_some() && candidate.year == cfg.test_year
}

fn select_even_index<'a, R: Rng + ?Sized>(
    candidates: &[Candidate<'a>],
    cfg: &SamplingConfig,
    rng: &mut R,
) -> Vec<(Candidate<'a>, bool)> {
    let mut by_class: BTreeMap<usize, Vec<Candidate<'a>>> = BTreeMap::new();
    for c in candidates {
        by_class.entry(c.rank).or_default().push(*c);
    }

    let mut picks = Vec::new();
    for members in by_class.values() {
        let (test_pool, rest): (Vec<Candidate>, Vec<Candidate>) =
            members.iter().partition(|c| is_test_year(c, cfg));

        let mut strata: BTreeMap<Option<i32>, Vec<Candidate>> = BTreeMap::new();
        for c in rest {
            strata.entry(c.year).or_default().push(c);
        }
        let sizes: Vec<usize> = strata.values().map(Vec::len).collect();
        let quotas = allocate_quota(cfg.cap, &sizes);
        for (stratum, quota) in strata.values().zip(quotas) {
            let mut idx = even_indices(stratum.len(), quota);
            idx.shuffle(rng);
            picks.extend(idx.into_iter().map(|i| (stratum[i], false)));
        }

        let mut idx = even_indices(test_pool.len(), cfg.test_cap);
        idx.shuffle(rng);
        picks.extend(idx.into_iter().map(|i| (test_pool[i], true)));
    }
    picks
}

fn select_probabilistic<'a, R: Rng + ?Sized>(
    candidates: &[Candidate<'a>],
    counts: &SpeciesCounts,
    cfg: &SamplingConfig,
    rng: &mut R,
) -> Vec<(Candidate<'a>, bool)> {
    let mut kept: HashMap<usize, usize> = HashMap::new();
    let mut kept_test: HashMap<usize, usize> = HashMap::new();
    let mut picks = Vec::new();
    for c in candidates {
        if is_test_year(c, cfg) {
            // Test bypasses the probabilistic gate, first come first selected.
            let n = kept_test.entry(c.rank).or_default();
            if *n < cfg.test_cap {
                *n += 1;
                picks.push((*c, true));
            }
            continue;
        }
        let n = kept.entry(c.rank).or_default();
        if *n >= cfg.cap {
            continue;
        }
        let total = counts.get(c.class).unwrap_or(0) as f64;
        let p = (2.0 * cfg.cap as f64 / (total + 1.0)).min(1.0);
        if rng.random::<f64>() < p {
            *n += 1;
            picks.push((*c, false));
        }
    }
    picks
}

/// `m` indices evenly spaced over `[0, k-1]`, rounded half to even. Distinct
/// whenever `m <= k`; `m` is clamped to `k`.
pub(crate) fn even_indices(k: usize, m: usize) -> Vec<usize> {
    let m = m.min(k);
    match m {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let step = (k - 1) as f64 / (m - 1) as f64;
            let mut idx: Vec<usize> = (0..m)
                .map(|i| (i as f64 * step).round_ties_even() as usize)
                .collect();
            idx.dedup();
            idx
        }
    }
}

/// Spread `cap` over strata as evenly as their sizes allow.
pub(crate) fn allocate_quota(cap: usize, sizes: &[usize]) -> Vec<usize> {
    let mut quotas = vec![0usize; sizes.len()];
    let mut remaining = cap.min(sizes.iter().sum());
    while remaining > 0 {
        let open: Vec<usize> = (0..sizes.len()).filter(|&i| quotas[i] < sizes[i]).collect();
        let share = (remaining / open.len()).max(1);
        for i in open {
            if remaining == 0 {
                break;
            }
            let add = share.min(sizes[i] - quotas[i]).min(remaining);
            quotas[i] += add;
            remaining -= add;
        }
    }
    quotas
}

fn summarize(
    log: &ObservationLog,
    counts: &SpeciesCounts,
    snapshot: &SampleSnapshot,
    unique_ids: usize,
    conflicting_ids: usize,
) -> SelectionSummary {
    let mut per_species: BTreeMap<String, SpeciesSelection> = BTreeMap::new();
    for entry in snapshot.iter() {
        let sel = per_species.entry(entry.species.clone()).or_default();
        sel.selected += 1;
        match entry.split {
            Split::Train => sel.train += 1,
            Split::Validation => sel.validation += 1,
            Split::Test => sel.test += 1,
        }
    }
    SelectionSummary {
        rows_read: log.rows_read(),
        rows_malformed: log.malformed.len(),
        rows_na: counts.rows_na,
        rows_no_subject: counts.rows_no_subject,
        unique_ids,
        conflicting_ids,
        species_total: counts.species_total,
        species_eligible: counts.len(),
        folded_species: counts.folded.clone(),
        selected: snapshot.len(),
        per_species,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_indices_cover_the_range() {
        assert_eq!(even_indices(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(even_indices(5, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(even_indices(7, 1), vec![0]);
        assert_eq!(even_indices(3, 10), vec![0, 1, 2]);
        assert!(even_indices(0, 3).is_empty());
        assert!(even_indices(4, 0).is_empty());
    }

    #[test]
    fn even_indices_are_distinct_and_bounded() {
        for k in 1..60 {
            for m in 1..=k {
                let idx = even_indices(k, m);
                assert_eq!(idx.len(), m, "k={k} m={m}");
                assert!(idx.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(*idx.last().unwrap(), if m == 1 { 0 } else { k - 1 });
            }
        }
    }

    #[test]
    fn quota_fills_small_strata_first() {
        assert_eq!(allocate_quota(50, &[10, 100, 100]), vec![10, 20, 20]);
        assert_eq!(allocate_quota(10, &[3, 3]), vec![3, 3]);
        assert_eq!(allocate_quota(5, &[4, 4]), vec![3, 2]);
        assert_eq!(allocate_quota(0, &[4, 4]), vec![0, 0]);
        assert!(allocate_quota(7, &[]).is_empty());
    }
}
