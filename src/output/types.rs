//! Output record types assembled by [`super::OutputAssembler`] (§4.7, §6
//! "Output").

use crate::align::Cigar;

/// Which mate of a pair a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateSlot {
    First,
    Second,
}

/// One mapped or unmapped output record, before mate cross-referencing.
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub mate: MateSlot,
    pub header: String,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub ref_index: Option<usize>,
    pub position: Option<i64>,
    pub negative_strand: bool,
    pub unmapped: bool,
    pub cigar: Option<Cigar>,
    pub mapping_quality: u8,

    // populated by `OutputAssembler::finalize` via cross-reference.
    pub mate_ref_index: Option<usize>,
    pub mate_position: Option<i64>,
    pub mate_negative_strand: bool,
    pub mate_unmapped: bool,

    // custom BAM attributes (§6 "Output"): EI, LI, UG, PI, ML, EE.
    pub extension_uid: String,
    pub ligation_uid: String,
    pub uid_group: String,
    pub probe_id: String,
    pub mapped_read_length: u32,
    pub extension_error: Option<String>,

    /// SAM `MD` string against the fetched capture-target reference, set
    /// alongside `cigar` whenever extension succeeds (§6 "MD/NM attributes
    /// where available"). `NM` itself needs no separate field since it's
    /// just `cigar.edit_distance()`.
    pub md_tag: Option<String>,
}

/// A first-of-pair / second-of-pair record pair, the unit
/// [`super::OutputAssembler`] sorts and writes (§4.7).
#[derive(Debug, Clone)]
pub struct OutputPair {
    pub pair_ordinal: u64,
    pub first: OutputRecord,
    pub second: OutputRecord,
}

impl OutputPair {
    /// `(ref_index, position)` used as the primary sort key in
    /// [`super::OutputAssembler::finalize`], with unmapped pairs (no
    /// `ref_index`) sorting last.
    pub(crate) fn sort_key(&self) -> (usize, i64, u64) {
        (
            self.first.ref_index.unwrap_or(usize::MAX),
            self.first.position.unwrap_or(i64::MAX),
            self.pair_ordinal,
        )
    }
}
