//! [`ProbeIndex`]: a k-mer inverted index over probe capture targets (§4.4).

use std::collections::HashMap;
use std::sync::Arc;

use foldhash::fast::RandomState;

use crate::probe::types::{MatchStrand, Probe, ProbeReference};
use crate::sequence::PackedSequence;

type FoldMap<K, V> = HashMap<K, V, RandomState>;

struct KmerEntry {
    probe_ref: ProbeReference,
    offset_in_capture_target: usize,
}

/// K-mer inverted index over probe capture targets, used to narrow an
/// arbitrary read tail down to the one or two probes it could plausibly
/// belong to (§4.4).
pub struct ProbeIndex {
    k: usize,
    min_kmer_hits: usize,
    table: FoldMap<u64, Vec<KmerEntry>>,
}

impl ProbeIndex {
    /// Builds the index over `probes`. For every probe, both the forward
    /// capture-target sequence and its reverse complement are indexed
    /// independently as distinct [`MatchStrand`] entries, per §4.4 "for
    /// every probe and both strands".
    pub fn build(probes: &[Arc<Probe>], k: usize, min_kmer_hits: usize, capture_targets: impl Fn(&Probe) -> PackedSequence) -> Self {
        let mut table: FoldMap<u64, Vec<KmerEntry>> = FoldMap::default();

        for probe in probes {
            let forward = capture_targets(probe);
            let reverse = forward.reverse_complement();

            for (strand, target) in [(MatchStrand::Forward, &forward), (MatchStrand::Reverse, &reverse)] {
                let probe_ref = ProbeReference::new(Arc::clone(probe), strand);
                for (offset, kmer) in target.iter_kmers(k) {
                    table
                        .entry(kmer)
                        .or_default()
                        .push(KmerEntry { probe_ref: probe_ref.clone(), offset_in_capture_target: offset });
                }
            }
        }

        ProbeIndex { k, min_kmer_hits, table }
    }

    /// Returns the `ProbeReference`s tied at the maximum diagonal-consistent
    /// hit count, provided that maximum is at least `min_kmer_hits`. Empty on
    /// insufficient evidence (§4.4 step 3).
    pub fn best_candidates(&self, query: &PackedSequence) -> Vec<ProbeReference> {
        // Per ProbeReference: running diagonal and its current consecutive
        // streak length, plus the best streak observed so far (§4.4 step 2).
        struct Tally {
            current_diagonal: i64,
            current_count: u32,
            best_count: u32,
        }

        let mut tallies: FoldMap<ProbeReference, Tally> = FoldMap::default();

        if query.len() >= self.k {
            for (query_offset, kmer) in query.iter_kmers(self.k) {
                let Some(entries) = self.table.get(&kmer) else { continue };
                for entry in entries {
                    let diagonal = query_offset as i64 - entry.offset_in_capture_target as i64;
                    let tally = tallies.entry(entry.probe_ref.clone()).or_insert(Tally {
                        current_diagonal: diagonal,
                        current_count: 0,
                        best_count: 0,
                    });
                    if tally.current_count > 0 && tally.current_diagonal == diagonal {
                        tally.current_count += 1;
                    } else {
                        tally.current_diagonal = diagonal;
                        tally.current_count = 1;
                    }
                    tally.best_count = tally.best_count.max(tally.current_count);
                }
            }
        }

        let max_count = tallies.values().map(|t| t.best_count).max().unwrap_or(0);
        if (max_count as usize) < self.min_kmer_hits {
            return Vec::new();
        }

        let mut winners: Vec<ProbeReference> =
            tallies.into_iter().filter(|(_, t)| t.best_count == max_count).map(|(pr, _)| pr).collect();
        winners.sort();
        winners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::types::Strand;

    fn probe(id: &str, capture_target: &str) -> (Arc<Probe>, PackedSequence) {
        let seq = PackedSequence::new(capture_target.as_bytes()).unwrap();
        let p = Probe {
            id: id.to_string(),
            sequence_name: "chr1".to_string(),
            extension_primer_start: 1,
            extension_primer_stop: 5,
            capture_target_start: 6,
            capture_target_stop: 6 + capture_target.len() as u64 - 1,
            ligation_primer_start: 100,
            ligation_primer_stop: 105,
            strand: Strand::Forward,
            extension_primer_sequence: PackedSequence::new(b"ACGTA").unwrap(),
            ligation_primer_sequence: PackedSequence::new(b"TGCAT").unwrap(),
        };
        (Arc::new(p), seq)
    }

    fn build_index(probes: &[(Arc<Probe>, PackedSequence)], k: usize, min_hits: usize) -> ProbeIndex {
        let ids: Vec<Arc<Probe>> = probes.iter().map(|(p, _)| Arc::clone(p)).collect();
        let lookup: HashMap<String, PackedSequence> =
            probes.iter().map(|(p, s)| (p.id.clone(), s.clone())).collect();
        ProbeIndex::build(&ids, k, min_hits, |p| lookup[&p.id].clone())
    }

    #[test]
    fn exact_match_wins_with_enough_hits() {
        let probes = vec![probe("p1", "ACGTACGTACGTACGTACGT"), probe("p2", "TTTTTTTTTTTTTTTTTTTT")];
        let index = build_index(&probes, 6, 3);
        let query = PackedSequence::new(b"ACGTACGTACGTACGTACGT").unwrap();
        let cands = index.best_candidates(&query);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].probe.id, "p1");
        assert_eq!(cands[0].match_strand, MatchStrand::Forward);
    }

    #[test]
    fn insufficient_hits_returns_empty() {
        let probes = vec![probe("p1", "ACGTACGTACGTACGTACGT")];
        let index = build_index(&probes, 6, 20);
        let query = PackedSequence::new(b"ACGTACGTACGTACGTACGT").unwrap();
        assert!(index.best_candidates(&query).is_empty());
    }

    #[test]
    fn reverse_complement_query_matches_reverse_strand() {
        let probes = vec![probe("p1", "ACGTACGTACGTACGTACGT")];
        let index = build_index(&probes, 6, 3);
        let query = PackedSequence::new(b"ACGTACGTACGTACGTACGT").unwrap().reverse_complement();
        let cands = index.best_candidates(&query);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].match_strand, MatchStrand::Reverse);
    }

    #[test]
    fn unrelated_query_yields_no_candidates() {
        let probes = vec![probe("p1", "ACGTACGTACGTACGTACGT")];
        let index = build_index(&probes, 6, 3);
        let query = PackedSequence::new(b"TTTTTTTTTTTTTTTTTTTT").unwrap();
        assert!(index.best_candidates(&query).is_empty());
    }
}
