//! Shared phase-1/phase-2 state: the concurrent `probe → UID → pairs`
//! structure (§4.6 "Phase 1 concurrency").

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::probe::ProbeReference;

/// One candidate pair recorded in a UID bucket: its position in the input
/// stream and its total base quality, used to pick a representative in
/// phase 2 (§4.6 step 2).
#[derive(Debug, Clone, Copy)]
pub struct QualityIndexedPair {
    pub pair_ordinal: u64,
    pub total_quality: u32,
}

/// `UID -> candidate pairs` for one [`ProbeReference`]. Safe for concurrent
/// insert from any phase-1 worker (§4.6: "the outer map, each inner map, and
/// each value set must be safe for concurrent insert/read").
pub type UidBucket = DashMap<String, Mutex<Vec<QualityIndexedPair>>>;

/// The full `ProbeReference -> UID -> candidate pairs` structure mutated
/// during phase 1 and iterated (read-only, in deterministic order) during
/// phase 2.
#[derive(Default)]
pub struct ClassificationMap {
    buckets: DashMap<ProbeReference, UidBucket>,
}

impl ClassificationMap {
    pub fn new() -> Self {
        ClassificationMap::default()
    }

    /// Inserts `(pair_ordinal, total_quality)` into `UidBucket[probe_ref][uid]`
    /// (§4.6 step 5), creating the probe and UID entries on first use.
    pub fn insert(&self, probe_ref: ProbeReference, uid: String, entry: QualityIndexedPair) {
        let bucket = self.buckets.entry(probe_ref).or_default();
        bucket.entry(uid).or_default().lock().push(entry);
    }

    /// `ProbeReference`s present, ordered by `(sequence_name, probe_id,
    /// match_strand)` (§4.6 phase 2 step 1's deterministic-iteration rule —
    /// [`ProbeReference`]'s `Ord` impl already encodes that order).
    pub fn probe_refs_in_order(&self) -> Vec<ProbeReference> {
        let mut refs: Vec<ProbeReference> = self.buckets.iter().map(|entry| entry.key().clone()).collect();
        refs.sort();
        refs
    }

    /// All `(uid, candidates)` pairs recorded for `probe_ref`, or an empty
    /// vector if the probe was never matched.
    pub fn uid_buckets_for(&self, probe_ref: &ProbeReference) -> Vec<(String, Vec<QualityIndexedPair>)> {
        match self.buckets.get(probe_ref) {
            Some(bucket) => bucket.iter().map(|entry| (entry.key().clone(), entry.value().lock().clone())).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MatchStrand, Probe, Strand};
    use crate::sequence::PackedSequence;
    use std::sync::Arc;

    fn probe_ref(id: &str, seq_name: &str) -> ProbeReference {
        let probe = Probe {
            id: id.to_string(),
            sequence_name: seq_name.to_string(),
            extension_primer_start: 1,
            extension_primer_stop: 5,
            capture_target_start: 6,
            capture_target_stop: 20,
            ligation_primer_start: 100,
            ligation_primer_stop: 105,
            strand: Strand::Forward,
            extension_primer_sequence: PackedSequence::new(b"ACGTA").unwrap(),
            ligation_primer_sequence: PackedSequence::new(b"TGCAT").unwrap(),
        };
        ProbeReference::new(Arc::new(probe), MatchStrand::Forward)
    }

    #[test]
    fn insert_and_retrieve_bucket() {
        let map = ClassificationMap::new();
        let pr = probe_ref("p1", "chr1");
        map.insert(pr.clone(), "AAAA".to_string(), QualityIndexedPair { pair_ordinal: 0, total_quality: 100 });
        map.insert(pr.clone(), "AAAA".to_string(), QualityIndexedPair { pair_ordinal: 1, total_quality: 200 });

        let buckets = map.uid_buckets_for(&pr);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].0, "AAAA");
        assert_eq!(buckets[0].1.len(), 2);
    }

    #[test]
    fn probe_refs_ordered_by_sequence_then_id() {
        let map = ClassificationMap::new();
        map.insert(probe_ref("p2", "chr2"), "A".to_string(), QualityIndexedPair { pair_ordinal: 0, total_quality: 1 });
        map.insert(probe_ref("p1", "chr1"), "A".to_string(), QualityIndexedPair { pair_ordinal: 1, total_quality: 1 });

        let refs = map.probe_refs_in_order();
        assert_eq!(refs.iter().map(|r| r.probe.sequence_name.as_str()).collect::<Vec<_>>(), vec!["chr1", "chr2"]);
    }
}
