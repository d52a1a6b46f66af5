//! Phase 1 — classify & group (§4.6 "Phase 1 — Classify & Group").

use rayon::prelude::*;

use crate::align::GlobalAligner;
use crate::config::PipelineConfig;
use crate::io::RawRead;
use crate::output::SideChannelWriter;
use crate::pipeline::state::{ClassificationMap, QualityIndexedPair};
use crate::pipeline::telemetry::RunTelemetry;
use crate::probe::{MatchStrand, ProbeIndex, ProbeReference};
use crate::sequence::PackedSequence;
use crate::uid::UidExtractor;

/// One read pair with its input-order ordinal, materialized up front since
/// FASTQ ingestion is inherently sequential (§6 "Read input").
pub struct OrdinalPair {
    pub ordinal: u64,
    pub read1: RawRead,
    pub read2: RawRead,
}

/// Runs phase 1 across `pairs` inside `pool`, so that no more than `pool`'s
/// thread count pair-classification closures run at once — the rayon pool
/// boundary is the admission-permit pool required by §5.
#[allow(clippy::too_many_arguments)]
pub fn run_phase1(
    pool: &rayon::ThreadPool,
    pairs: &[OrdinalPair],
    probe_index: &ProbeIndex,
    aligner: &GlobalAligner,
    uid_extractor: &UidExtractor,
    config: &PipelineConfig,
    classification: &ClassificationMap,
    telemetry: &RunTelemetry,
    side_channels: &dyn SideChannelWriter,
) {
    pool.install(|| {
        pairs.par_iter().for_each(|pair| {
            classify_one_pair(pair, probe_index, aligner, uid_extractor, config, classification, telemetry, side_channels);
        });
    });
}

/// Classifies a single pair. Never panics on pair-specific data problems: any
/// failure routes the pair to a side channel and returns, per §4.6 "Failure
/// policy inside a task" ("A task must never abort the pipeline").
#[allow(clippy::too_many_arguments)]
fn classify_one_pair(
    pair: &OrdinalPair,
    probe_index: &ProbeIndex,
    aligner: &GlobalAligner,
    uid_extractor: &UidExtractor,
    config: &PipelineConfig,
    classification: &ClassificationMap,
    telemetry: &RunTelemetry,
    side_channels: &dyn SideChannelWriter,
) {
    let seq1 = match PackedSequence::from_iupac(&pair.read1.sequence) {
        Ok(s) => s,
        Err(_) => {
            let _ = side_channels.write_unmapped(&pair.read1, &pair.read2);
            telemetry.record_unmapped();
            return;
        }
    };
    let seq2 = match PackedSequence::from_iupac(&pair.read2.sequence) {
        Ok(s) => s,
        Err(_) => {
            let _ = side_channels.write_unmapped(&pair.read1, &pair.read2);
            telemetry.record_unmapped();
            return;
        }
    };

    // First-pass tails, used only to seed k-mer matching: a fixed-length
    // seed split of both mates (§4.6 step 1's "strip primer-length prefixes
    // ... from both mates"). Diagonal-consistent k-mer scoring is
    // offset-invariant, so probe identification does not require precise
    // primer trimming up front; only the UID itself and the final extension
    // alignment need the authoritative, primer-anchored cut computed below
    // once a unique probe is known. See DESIGN.md (Open Question:
    // UidExtractor/ProbeIndex ordering).
    let split = config.uid_length.min(seq1.len());
    let uid0 = seq1.subsequence(0, split);
    let tail1 = seq1.subsequence(split, seq1.len());

    let split2 = config.uid_length.min(seq2.len());
    let tail2 = seq2.subsequence(split2, seq2.len());

    if tail1.is_empty() || tail2.is_empty() {
        let _ = side_channels.write_unmapped(&pair.read1, &pair.read2);
        telemetry.record_unmapped();
        return;
    }

    let cands1 = probe_index.best_candidates(&tail1);
    let cands2 = probe_index.best_candidates(&tail2);

    let matches: Vec<ProbeReference> = cands1
        .into_iter()
        .filter(|pr1| cands2.iter().any(|pr2| pr1.probe.id == pr2.probe.id && pr1.match_strand != pr2.match_strand))
        .collect();

    if matches.is_empty() {
        let _ = side_channels.write_unmapped(&pair.read1, &pair.read2);
        telemetry.record_unmapped();
        return;
    }
    if matches.len() > 1 {
        let _ = side_channels.write_ambiguous(&pair.read1, &pair.read2, matches.len());
        telemetry.record_ambiguous();
        return;
    }

    let winner = &matches[0];

    let uid = if config.variable_length_uids {
        let primer = match winner.match_strand {
            MatchStrand::Forward => winner.probe.extension_primer_sequence.clone(),
            MatchStrand::Reverse => winner.probe.extension_primer_sequence.reverse_complement(),
        };
        match uid_extractor.extract_uid(aligner, &seq1, &pair.read1.quality, &primer, &pair.read1.header, side_channels) {
            Ok(extracted) => extracted.uid,
            Err(e) => {
                let _ = side_channels.write_unable_to_align(&pair.read1, &pair.read2, &e.to_string());
                telemetry.record_unable_to_align();
                return;
            }
        }
    } else {
        String::from_utf8_lossy(&uid0.to_text()).into_owned()
    };

    let total_quality: u32 = pair.read1.quality.iter().chain(pair.read2.quality.iter()).map(|&q| q as u32).sum();

    let _ = side_channels.write_probe_uid_quality(&winner.probe.id, &uid, total_quality, pair.ordinal);

    classification.insert(winner.clone(), uid, QualityIndexedPair { pair_ordinal: pair.ordinal, total_quality });
}
