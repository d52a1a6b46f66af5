//! [`Pipeline`]: orchestrates ingestion, phase 1, the barrier, phase 2, and
//! output finalization (§4.6 "MapFilterExtendPipeline" — component L6).

mod phase1;
mod phase2;
mod state;
mod telemetry;

pub use phase1::OrdinalPair;
pub use state::{ClassificationMap, QualityIndexedPair, UidBucket};
pub use telemetry::RunTelemetry;

use std::collections::HashMap;
use std::sync::Arc;

use crate::align::{AlignmentScorer, GlobalAligner};
use crate::config::PipelineConfig;
use crate::error::HeatseqError;
use crate::genome::GenomeStore;
use crate::io::PairedReadSource;
use crate::output::{BamRecordSink, OutputAssembler, SideChannelWriter};
use crate::probe::{Probe, ProbeIndex};
use crate::uid::UidExtractor;

/// Ties together the genome, probe set, and configuration for one run, and
/// drives the two-phase pipeline over a [`PairedReadSource`] into a
/// [`BamRecordSink`] (§4.6).
pub struct Pipeline {
    config: PipelineConfig,
    genome: GenomeStore,
    probes: Vec<Arc<Probe>>,
    aligner: GlobalAligner,
    uid_extractor: UidExtractor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, genome: GenomeStore, probes: Vec<Arc<Probe>>, scorer: AlignmentScorer) -> Self {
        let uid_extractor = UidExtractor::new(config.uid_length, config.variable_length_uids, config.primer_edit_distance_cutoff_divisor);
        Pipeline { config, genome, probes, aligner: GlobalAligner::new(scorer), uid_extractor }
    }

    /// Sequence names in probe-input order, deduplicated on first
    /// appearance — the `@SQ` order a [`BamRecordSink`] header must match
    /// (§6 "Output").
    pub fn sequence_names(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for probe in &self.probes {
            if !seen.contains(&probe.sequence_name) {
                seen.push(probe.sequence_name.clone());
            }
        }
        seen
    }

    /// Runs the full pipeline: materializes `source` into memory, builds the
    /// probe index, runs phase 1 then phase 2 (each bounded by its own `W`-
    /// sized pool per §5), and finalizes into `sink`. Returns the run's
    /// telemetry on success.
    ///
    /// Structural failures (building the probe index's capture-target
    /// lookup, constructing the worker pools) propagate via `?` (§7); failures
    /// local to a single pair never do.
    pub fn run(
        &self,
        source: &mut impl PairedReadSource,
        sink: &mut dyn BamRecordSink,
        side_channels: &dyn SideChannelWriter,
    ) -> Result<RunTelemetry, HeatseqError> {
        let pairs = materialize_pairs(source)?;
        log::info!("materialized {} read pairs", pairs.len());

        let capture_targets = self.fetch_capture_targets()?;
        let probe_index = ProbeIndex::build(&self.probes, self.config.kmer_size, self.config.min_kmer_hits, |p| {
            capture_targets[&p.id].clone()
        });

        let sequence_index: HashMap<String, usize> =
            self.sequence_names().into_iter().enumerate().map(|(i, name)| (name, i)).collect();

        let phase1_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| HeatseqError::Internal(format!("failed to build phase-1 worker pool: {e}")))?;
        let phase2_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| HeatseqError::Internal(format!("failed to build phase-2 worker pool: {e}")))?;

        let classification = ClassificationMap::new();
        let telemetry = RunTelemetry::default();

        phase1::run_phase1(
            &phase1_pool,
            &pairs,
            &probe_index,
            &self.aligner,
            &self.uid_extractor,
            &self.config,
            &classification,
            &telemetry,
            side_channels,
        );

        let assembler = OutputAssembler::new();
        phase2::run_phase2(
            &phase2_pool,
            &pairs,
            &classification,
            &self.genome,
            &self.aligner,
            &self.uid_extractor,
            &self.config,
            &sequence_index,
            &assembler,
            &telemetry,
            side_channels,
        );

        assembler.finalize(sink, &telemetry)?;

        Ok(telemetry)
    }

    /// Fetches every probe's capture-target region up front, so
    /// [`ProbeIndex::build`]'s closure stays infallible. A fetch failure here
    /// is structural (§7): a probe naming an unknown container or an
    /// out-of-range region means the probe set and genome file disagree, and
    /// the run cannot proceed.
    fn fetch_capture_targets(&self) -> Result<HashMap<String, crate::sequence::PackedSequence>, HeatseqError> {
        let mut targets = HashMap::with_capacity(self.probes.len());
        for probe in &self.probes {
            let seq = self.genome.fetch(&probe.sequence_name, probe.capture_target_start, probe.capture_target_stop)?;
            targets.insert(probe.id.clone(), seq);
        }
        Ok(targets)
    }
}

/// Reads every pair out of `source` into memory, assigning each its input
/// ordinal. FASTQ ingestion is inherently sequential, so this happens before
/// either phase's `rayon` pool is involved (§6 "Read input").
fn materialize_pairs(source: &mut impl PairedReadSource) -> Result<Vec<OrdinalPair>, HeatseqError> {
    let mut pairs = Vec::new();
    let mut ordinal = 0u64;
    while let Some((read1, read2)) = source.next_pair()? {
        pairs.push(OrdinalPair { ordinal, read1, read2 });
        ordinal += 1;
    }
    Ok(pairs)
}
