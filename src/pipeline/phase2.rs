//! Phase 2 — select, extend, assemble (§4.6 "Phase 2 — Select, Extend,
//! Assemble").

use std::collections::HashMap;

use rayon::prelude::*;

use crate::align::GlobalAligner;
use crate::config::PipelineConfig;
use crate::genome::GenomeStore;
use crate::output::{MateSlot, OutputAssembler, OutputPair, OutputRecord, SideChannelWriter};
use crate::pipeline::phase1::OrdinalPair;
use crate::pipeline::state::ClassificationMap;
use crate::pipeline::telemetry::RunTelemetry;
use crate::probe::{MatchStrand, ProbeReference};
use crate::sequence::PackedSequence;
use crate::uid::UidExtractor;

/// A pair selected as a (probe, UID) bucket's representative (§4.6 step 2).
struct Selection {
    ordinal: u64,
    probe_ref: ProbeReference,
    uid: String,
}

/// Picks, for every (probe, UID) bucket, the entry with maximum
/// `total_quality`, ties broken by smallest `pair_ordinal` (§4.6 step 2,
/// documented tie-break rule). Iterates `ProbeReference`s in the map's
/// already-deterministic order (§4.6 step 1).
fn select_representatives(classification: &ClassificationMap, telemetry: &RunTelemetry) -> Vec<Selection> {
    let mut selected = Vec::new();
    for probe_ref in classification.probe_refs_in_order() {
        for (uid, candidates) in classification.uid_buckets_for(&probe_ref) {
            let Some(best) = candidates
                .iter()
                .min_by_key(|c| (std::cmp::Reverse(c.total_quality), c.pair_ordinal))
            else {
                continue;
            };
            if candidates.len() > 1 {
                telemetry.record_duplicates_removed(candidates.len() as u64 - 1);
            }
            selected.push(Selection { ordinal: best.pair_ordinal, probe_ref: probe_ref.clone(), uid });
        }
    }
    selected
}

/// Runs phase 2 across the representatives selected from `classification`,
/// bounded by a second admission-permit pool of size `W` (§4.6 step 3), and
/// hands finished pairs to `assembler`.
#[allow(clippy::too_many_arguments)]
pub fn run_phase2(
    pool: &rayon::ThreadPool,
    pairs: &[OrdinalPair],
    classification: &ClassificationMap,
    genome: &GenomeStore,
    aligner: &GlobalAligner,
    uid_extractor: &UidExtractor,
    config: &PipelineConfig,
    sequence_index: &HashMap<String, usize>,
    assembler: &OutputAssembler,
    telemetry: &RunTelemetry,
    side_channels: &dyn SideChannelWriter,
) {
    let representatives = select_representatives(classification, telemetry);

    pool.install(|| {
        representatives.par_iter().for_each(|selection| {
            let Some(pair) = pairs.get(selection.ordinal as usize) else {
                log::warn!("phase2: selected ordinal {} has no materialized pair", selection.ordinal);
                return;
            };
            extend_one_pair(pair, selection, genome, aligner, uid_extractor, config, sequence_index, assembler, telemetry, side_channels);
        });
    });
}

#[allow(clippy::too_many_arguments)]
fn extend_one_pair(
    pair: &OrdinalPair,
    selection: &Selection,
    genome: &GenomeStore,
    aligner: &GlobalAligner,
    uid_extractor: &UidExtractor,
    config: &PipelineConfig,
    sequence_index: &HashMap<String, usize>,
    assembler: &OutputAssembler,
    telemetry: &RunTelemetry,
    side_channels: &dyn SideChannelWriter,
) {
    let probe = &selection.probe_ref.probe;
    let ref_index = sequence_index.get(&probe.sequence_name).copied();

    let reference = match genome.fetch(&probe.sequence_name, probe.capture_target_start, probe.capture_target_stop) {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("phase2: capture-target fetch failed for probe {}: {e}", probe.id);
            None
        }
    };

    let seq1 = PackedSequence::from_iupac(&pair.read1.sequence).ok();
    let seq2 = PackedSequence::from_iupac(&pair.read2.sequence).ok();

    let tail1 = seq1.as_ref().and_then(|s| {
        let primer = match selection.probe_ref.match_strand {
            MatchStrand::Forward => probe.extension_primer_sequence.clone(),
            MatchStrand::Reverse => probe.extension_primer_sequence.reverse_complement(),
        };
        extract_tail(uid_extractor, aligner, s, &pair.read1.quality, &primer, true, &pair.read1.header, side_channels)
    });
    let tail2 = seq2.as_ref().and_then(|s| {
        let primer = match selection.probe_ref.match_strand {
            MatchStrand::Forward => probe.ligation_primer_sequence.reverse_complement(),
            MatchStrand::Reverse => probe.ligation_primer_sequence.clone(),
        };
        extract_tail(uid_extractor, aligner, s, &pair.read2.quality, &primer, false, &pair.read2.header, side_channels)
    });

    let (first, first_error) =
        extend_mate(MateSlot::First, &pair.read1.header, tail1.as_ref(), reference.as_ref(), aligner, selection, config, ref_index, true);
    let (second, second_error) =
        extend_mate(MateSlot::Second, &pair.read2.header, tail2.as_ref(), reference.as_ref(), aligner, selection, config, ref_index, false);

    if let Some(reason) = first_error.or(second_error) {
        let _ = side_channels.write_unable_to_align(&pair.read1, &pair.read2, &reason);
        telemetry.record_unable_to_align();
    } else {
        telemetry.record_mapped();
    }

    assembler.push(OutputPair { pair_ordinal: pair.ordinal, first, second });
}

/// Extracts a mate's probe-facing tail sequence and quality, reusing
/// [`UidExtractor`] in its generic primer-trim capacity. `is_mate_one`
/// selects between the UID-reporting path and the plain trim path; both
/// collapse to the same tail in fixed-length mode.
#[allow(clippy::too_many_arguments)]
fn extract_tail(
    uid_extractor: &UidExtractor,
    aligner: &GlobalAligner,
    read_sequence: &PackedSequence,
    read_quality: &[u8],
    primer: &PackedSequence,
    is_mate_one: bool,
    read_header: &str,
    side_channels: &dyn SideChannelWriter,
) -> Option<(PackedSequence, Vec<u8>)> {
    if is_mate_one {
        uid_extractor
            .extract_uid(aligner, read_sequence, read_quality, primer, read_header, side_channels)
            .ok()
            .map(|e| (e.tail_sequence, e.tail_quality))
    } else {
        uid_extractor
            .trim_mate_two(aligner, read_sequence, read_quality, primer, read_header, side_channels)
            .ok()
            .map(|t| (t.tail_sequence, t.tail_quality))
    }
}

/// Aligns one mate's tail against the fetched capture-target reference and
/// builds its (still mate-field-incomplete) [`OutputRecord`]. Per §4.6
/// "Extension task" + §7, a failure here never aborts the pipeline: the
/// mate is emitted unmapped with an `extension_error` string, not discarded.
#[allow(clippy::too_many_arguments)]
fn extend_mate(
    mate: MateSlot,
    header: &str,
    tail: Option<&(PackedSequence, Vec<u8>)>,
    reference: Option<&PackedSequence>,
    aligner: &GlobalAligner,
    selection: &Selection,
    config: &PipelineConfig,
    ref_index: Option<usize>,
    is_mate_one: bool,
) -> (OutputRecord, Option<String>) {
    let base = OutputRecord {
        mate,
        header: header.to_string(),
        sequence: Vec::new(),
        quality: Vec::new(),
        ref_index: None,
        position: None,
        negative_strand: false,
        unmapped: true,
        cigar: None,
        mapping_quality: 0,
        mate_ref_index: None,
        mate_position: None,
        mate_negative_strand: false,
        mate_unmapped: true,
        extension_uid: if is_mate_one { selection.uid.clone() } else { String::new() },
        ligation_uid: if is_mate_one { String::new() } else { selection.uid.clone() },
        uid_group: selection.uid.clone(),
        probe_id: selection.probe_ref.probe.id.clone(),
        mapped_read_length: 0,
        extension_error: None,
        md_tag: None,
    };

    let (Some((tail_seq, tail_qual)), Some(reference)) = (tail, reference) else {
        let reason = "missing tail or reference for extension".to_string();
        return (OutputRecord { extension_error: Some(reason.clone()), ..base }, Some(reason));
    };

    let reference_for_orientation = match (selection.probe_ref.match_strand, is_mate_one) {
        (MatchStrand::Forward, true) | (MatchStrand::Reverse, false) => reference.clone(),
        _ => reference.reverse_complement(),
    };

    let alignment = aligner.align(&reference_for_orientation, tail_seq);
    let position = selection.probe_ref.probe.capture_target_start as i64 - 1 + alignment.index_of_first_match_in_reference as i64;
    let md_tag = alignment.cigar.md_string(&reference_for_orientation);

    let record = OutputRecord {
        sequence: tail_seq.to_text(),
        quality: tail_qual.clone(),
        ref_index,
        position: ref_index.map(|_| position),
        negative_strand: matches!((selection.probe_ref.match_strand, is_mate_one), (MatchStrand::Reverse, true) | (MatchStrand::Forward, false)),
        unmapped: ref_index.is_none(),
        cigar: Some(alignment.cigar),
        mapping_quality: config.mapping_quality_default,
        mapped_read_length: tail_seq.len() as u32,
        md_tag: Some(md_tag),
        ..base
    };
    (record, None)
}
