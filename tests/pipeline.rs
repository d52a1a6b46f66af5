//! End-to-end [`Pipeline`] scenarios: empty input, a single exact match,
//! duplicate collapse, the quality tie-break, an ambiguous pair, and
//! reverse-complement symmetry. Each builds a tiny synthetic genome, a
//! hand-built probe set, and drives `Pipeline::run` against in-memory
//! fixtures rather than real FASTQ/BAM files, following the
//! small-synthetic-genome-plus-hand-built-probe convention already used by
//! the crate's own `#[cfg(test)]` modules (e.g. `probe::index::tests`,
//! `genome::store::tests`).

mod common;

use heatseq_core::align::AlignmentScorer;
use heatseq_core::genome::GenomeStore;
use heatseq_core::output::NullSideChannels;
use heatseq_core::{Pipeline, PipelineConfig};

use common::{InMemoryPairedReadSource, RecordingSink, probe, raw_read, rc, write_test_genome};

/// Ten repeats of `AAGC`: every 8-mer window touches both A-runs, so every
/// 8-mer contains at least one `A`, while its reverse complement contains
/// none (the pattern has zero `T`s) — the forward and reverse indexed
/// entries for a probe built from this sequence never share a k-mer, which
/// keeps phase-1 candidate matching unambiguous in the scenarios below
/// that rely on the forward vs. reverse distinction.
const CAPTURE: &[u8] = b"AAGCAAGCAAGCAAGCAAGCAAGCAAGCAAGCAAGCAAGC";
const UID: &[u8] = b"AAAA";

fn config() -> PipelineConfig {
    PipelineConfig::try_new(4, false, 2, 8, 3, 4, 60).unwrap()
}

#[test]
fn empty_input_produces_no_output_and_zero_telemetry() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE)];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.mapped_count(), 0);
    assert_eq!(telemetry.unmapped_count(), 0);
    assert_eq!(telemetry.ambiguous_count(), 0);
    assert_eq!(telemetry.unable_to_align_count(), 0);
    assert_eq!(telemetry.duplicates_removed_count(), 0);
    assert!(sink.records.is_empty());
    assert!(sink.finished);
}

#[test]
fn single_exact_match_maps_both_mates() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE)];

    let mate1_seq = [UID, CAPTURE].concat();
    let mate2_seq = rc(CAPTURE);
    let quality1 = vec![b'I'; mate1_seq.len()];
    let quality2 = vec![b'I'; mate2_seq.len()];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![(
        raw_read("r1/1", &mate1_seq, &quality1),
        raw_read("r1/2", &mate2_seq, &quality2),
    )]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.mapped_count(), 1);
    assert_eq!(telemetry.unmapped_count(), 0);
    assert_eq!(telemetry.ambiguous_count(), 0);
    assert_eq!(sink.records.len(), 2);

    let mate_one = &sink.records[0];
    assert!(!mate_one.unmapped);
    assert_eq!(mate_one.ref_index, Some(0));
    assert_eq!(mate_one.position, Some(0));
    assert!(!mate_one.negative_strand);
    assert_eq!(mate_one.mapped_read_length, CAPTURE.len() as u32);
    assert_eq!(mate_one.extension_uid, "AAAA");
    assert_eq!(mate_one.probe_id, "p1");
}

#[test]
fn duplicate_pairs_collapse_to_the_higher_quality_candidate() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE)];

    let mate1_seq = [UID, CAPTURE].concat();
    let mate2_seq = rc(CAPTURE);
    let low_quality1 = vec![b'#'; mate1_seq.len()];
    let low_quality2 = vec![b'#'; mate2_seq.len()];
    let high_quality1 = vec![b'I'; mate1_seq.len()];
    let high_quality2 = vec![b'I'; mate2_seq.len()];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![
        (raw_read("dup_low/1", &mate1_seq, &low_quality1), raw_read("dup_low/2", &mate2_seq, &low_quality2)),
        (raw_read("dup_high/1", &mate1_seq, &high_quality1), raw_read("dup_high/2", &mate2_seq, &high_quality2)),
    ]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.mapped_count(), 1);
    assert_eq!(telemetry.duplicates_removed_count(), 1);
    assert_eq!(sink.records.len(), 2);
    assert_eq!(sink.records[0].header, "dup_high/1");
    assert_eq!(sink.records[1].header, "dup_high/2");
}

#[test]
fn equal_quality_duplicates_break_ties_by_earliest_ordinal() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE)];

    let mate1_seq = [UID, CAPTURE].concat();
    let mate2_seq = rc(CAPTURE);
    let quality1 = vec![b'I'; mate1_seq.len()];
    let quality2 = vec![b'I'; mate2_seq.len()];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![
        (raw_read("tie_first/1", &mate1_seq, &quality1), raw_read("tie_first/2", &mate2_seq, &quality2)),
        (raw_read("tie_second/1", &mate1_seq, &quality1), raw_read("tie_second/2", &mate2_seq, &quality2)),
    ]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.duplicates_removed_count(), 1);
    assert_eq!(sink.records.len(), 2);
    assert_eq!(sink.records[0].header, "tie_first/1");
    assert_eq!(sink.records[1].header, "tie_first/2");
}

#[test]
fn pair_matching_two_probes_equally_is_reported_ambiguous() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE), ("chr2", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE), probe("p2", "chr2", CAPTURE)];

    let mate1_seq = [UID, CAPTURE].concat();
    let mate2_seq = rc(CAPTURE);
    let quality1 = vec![b'I'; mate1_seq.len()];
    let quality2 = vec![b'I'; mate2_seq.len()];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![(
        raw_read("ambiguous/1", &mate1_seq, &quality1),
        raw_read("ambiguous/2", &mate2_seq, &quality2),
    )]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.ambiguous_count(), 1);
    assert_eq!(telemetry.mapped_count(), 0);
    assert!(sink.records.is_empty());
}

#[test]
fn reverse_complement_orientation_maps_symmetrically_to_forward() {
    let genome_path = write_test_genome(&[("chr1", CAPTURE)]);
    let genome = GenomeStore::open(&genome_path).unwrap();
    let probes = vec![probe("p1", "chr1", CAPTURE)];

    // Mate one now lands on the probe's reverse-indexed entry and mate two
    // on the forward entry — the mirror image of `single_exact_match_maps_both_mates`.
    let mate1_seq = [UID, &rc(CAPTURE)[..]].concat();
    let mate2_seq = CAPTURE.to_vec();
    let quality1 = vec![b'I'; mate1_seq.len()];
    let quality2 = vec![b'I'; mate2_seq.len()];

    let pipeline = Pipeline::new(config(), genome, probes, AlignmentScorer::default());
    let mut source = InMemoryPairedReadSource::new(vec![(
        raw_read("rev/1", &mate1_seq, &quality1),
        raw_read("rev/2", &mate2_seq, &quality2),
    )]);
    let mut sink = RecordingSink::default();

    let telemetry = pipeline.run(&mut source, &mut sink, &NullSideChannels).unwrap();

    assert_eq!(telemetry.mapped_count(), 1);
    assert_eq!(telemetry.ambiguous_count(), 0);
    assert_eq!(sink.records.len(), 2);

    let mate_one = &sink.records[0];
    assert!(!mate_one.unmapped);
    assert_eq!(mate_one.ref_index, Some(0));
    assert_eq!(mate_one.position, Some(0));
    assert!(mate_one.negative_strand);
    assert_eq!(mate_one.mapped_read_length, CAPTURE.len() as u32);
}
