//! [`Probe`] and [`ProbeReference`] (§3).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::sequence::PackedSequence;

/// The genomic strand a probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

/// An immutable capture probe (§3 "Probe"). `*_start`/`*_stop` fields are
/// 1-based inclusive coordinates within `sequence_name`, consistent with
/// [`crate::genome::GenomeStore::fetch`]'s coordinate convention.
#[derive(Debug, Clone)]
pub struct Probe {
    pub id: String,
    pub sequence_name: String,
    pub extension_primer_start: u64,
    pub extension_primer_stop: u64,
    pub capture_target_start: u64,
    pub capture_target_stop: u64,
    pub ligation_primer_start: u64,
    pub ligation_primer_stop: u64,
    pub strand: Strand,
    pub extension_primer_sequence: PackedSequence,
    pub ligation_primer_sequence: PackedSequence,
}

/// Which strand of a probe's capture-target sequence a k-mer hit or mapping
/// decision is referring to (§3 "ProbeReference": "Two strands per probe are
/// indexed independently").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchStrand {
    Forward,
    Reverse,
}

impl MatchStrand {
    #[inline]
    pub fn opposite(self) -> MatchStrand {
        match self {
            MatchStrand::Forward => MatchStrand::Reverse,
            MatchStrand::Reverse => MatchStrand::Forward,
        }
    }
}

/// A `(Probe, probe_strand_used_for_match)` pair (§3 "ProbeReference").
///
/// Equality, hashing, and ordering are all defined purely in terms of
/// `probe.id` and `match_strand` (never the sequence payload), since this
/// type is used as a map key throughout [`crate::pipeline`] and
/// [`crate::probe::ProbeIndex`] and two `ProbeReference`s naming the same
/// probe/strand combination must always collide.
#[derive(Debug, Clone)]
pub struct ProbeReference {
    pub probe: Arc<Probe>,
    pub match_strand: MatchStrand,
}

impl ProbeReference {
    pub fn new(probe: Arc<Probe>, match_strand: MatchStrand) -> Self {
        ProbeReference { probe, match_strand }
    }
}

impl PartialEq for ProbeReference {
    fn eq(&self, other: &Self) -> bool {
        self.probe.id == other.probe.id && self.match_strand == other.match_strand
    }
}

impl Eq for ProbeReference {}

impl Hash for ProbeReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.probe.id.hash(state);
        self.match_strand.hash(state);
    }
}

impl PartialOrd for ProbeReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProbeReference {
    /// Orders by `sequence_name`, then `probe_id`, per §4.6 phase 2's
    /// deterministic-iteration requirement.
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.probe.sequence_name, &self.probe.id, self.match_strand).cmp(&(
            &other.probe.sequence_name,
            &other.probe.id,
            other.match_strand,
        ))
    }
}
