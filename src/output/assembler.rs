//! [`OutputAssembler`]: in-memory pair collection, stable sort, and
//! mate-field cross-reference (§4.7, component L7).

use parking_lot::Mutex;

use crate::error::HeatseqError;
use crate::output::sink::BamRecordSink;
use crate::output::types::OutputPair;
use crate::pipeline::RunTelemetry;

/// Collects output pairs from phase 2 extension tasks and, on finalize,
/// sorts and writes them in one atomic pass (§4.7, §5 "finalize is atomic
/// w.r.t. the output file").
#[derive(Default)]
pub struct OutputAssembler {
    pairs: Mutex<Vec<OutputPair>>,
}

impl OutputAssembler {
    pub fn new() -> Self {
        OutputAssembler::default()
    }

    /// Appends a pair produced by an extension task. Safe to call
    /// concurrently from multiple phase-2 workers.
    pub fn push(&self, pair: OutputPair) {
        self.pairs.lock().push(pair);
    }

    /// Performs the stable sort by `(ref_idx, pos, pair_ordinal)` (§4.7),
    /// assigns mate fields by cross-reference, and writes every record
    /// through `sink` in pair order (first-of-pair, then mate).
    pub fn finalize(self, sink: &mut dyn BamRecordSink, telemetry: &RunTelemetry) -> Result<(), HeatseqError> {
        let mut pairs = self.pairs.into_inner();
        pairs.sort_by_key(OutputPair::sort_key);

        for pair in &mut pairs {
            let (first_ref, first_pos, first_neg, first_unmapped) =
                (pair.first.ref_index, pair.first.position, pair.first.negative_strand, pair.first.unmapped);
            let (second_ref, second_pos, second_neg, second_unmapped) =
                (pair.second.ref_index, pair.second.position, pair.second.negative_strand, pair.second.unmapped);

            pair.first.mate_ref_index = second_ref;
            pair.first.mate_position = second_pos;
            pair.first.mate_negative_strand = second_neg;
            pair.first.mate_unmapped = second_unmapped;

            pair.second.mate_ref_index = first_ref;
            pair.second.mate_position = first_pos;
            pair.second.mate_negative_strand = first_neg;
            pair.second.mate_unmapped = first_unmapped;
        }

        for pair in &pairs {
            sink.write_record(&pair.first, pair)?;
            sink.write_record(&pair.second, pair)?;
        }
        sink.finish()?;

        log::info!(
            "phase2 complete: {mapped} mapped, {ambiguous} ambiguous, {unable} unable-to-align, {dups} duplicates removed",
            mapped = telemetry.mapped_count(),
            ambiguous = telemetry.ambiguous_count(),
            unable = telemetry.unable_to_align_count(),
            dups = telemetry.duplicates_removed_count(),
        );
        Ok(())
    }
}
