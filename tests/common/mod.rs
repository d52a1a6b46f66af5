//! Shared fixtures for the end-to-end pipeline tests (`tests/pipeline.rs`),
//! following the `tests/common/` convention of keeping per-test-binary
//! helpers out of the crate's own `#[cfg(test)]` modules.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use heatseq_core::error::HeatseqError;
use heatseq_core::io::{PairedReadSource, RawRead};
use heatseq_core::output::{BamRecordSink, OutputRecord};
use heatseq_core::probe::{Probe, Strand};
use heatseq_core::sequence::PackedSequence;

/// Packs `containers` (name, strict-ACGT bases) into the compact 2-bit
/// genome file format `GenomeStore::open` expects, mirroring
/// `genome::store::tests::write_test_genome` but supporting more than one
/// container for the ambiguous-mapping scenario.
pub fn write_test_genome(containers: &[(&str, &[u8])]) -> tempfile::TempPath {
    let mut body = Vec::new();
    let mut table = String::new();

    for (name, bases) in containers {
        let start = body.len() as u64;
        let mut packed = vec![0u8; bases.len().div_ceil(4)];
        for (i, &b) in bases.iter().enumerate() {
            let code = match b {
                b'A' => 0u8,
                b'C' => 1,
                b'G' => 2,
                b'T' => 3,
                _ => panic!("test fixture must be strict ACGT"),
            };
            let bit_index = i * 2;
            packed[bit_index / 8] |= code << (6 - bit_index % 8);
        }
        body.extend_from_slice(&packed);
        let stop = body.len() as u64;
        table.push_str(&format!("{name}\t{start}\t{stop}\n"));
    }

    let table_offset = body.len() as u64;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&body).unwrap();
    file.write_all(table.as_bytes()).unwrap();
    file.write_all(&table_offset.to_be_bytes()).unwrap();
    file.flush().unwrap();
    file.into_temp_path()
}

/// Reverse complement of ASCII ACGT text, used to build the mate-two side
/// of a matching pair.
pub fn rc(bases: &[u8]) -> Vec<u8> {
    PackedSequence::new(bases).unwrap().reverse_complement().to_text()
}

/// A probe whose capture target spans an entire single-container genome
/// (`capture_target_start = 1`, `capture_target_stop = capture.len()`), so
/// `GenomeStore::fetch` returns exactly `capture`. The primer fields are
/// never exercised under fixed-length UID extraction, so they carry
/// placeholder sequences.
pub fn probe(id: &str, sequence_name: &str, capture: &[u8]) -> Arc<Probe> {
    Arc::new(Probe {
        id: id.to_string(),
        sequence_name: sequence_name.to_string(),
        extension_primer_start: 1,
        extension_primer_stop: 4,
        capture_target_start: 1,
        capture_target_stop: capture.len() as u64,
        ligation_primer_start: 1,
        ligation_primer_stop: 4,
        strand: Strand::Forward,
        extension_primer_sequence: PackedSequence::new(b"TTTT").unwrap(),
        ligation_primer_sequence: PackedSequence::new(b"TTTT").unwrap(),
    })
}

pub fn raw_read(header: &str, sequence: &[u8], quality: &[u8]) -> RawRead {
    RawRead { header: header.to_string(), sequence: sequence.to_vec(), quality: quality.to_vec() }
}

/// A [`PairedReadSource`] over a fixed, in-memory list of pairs — the
/// integration-test analogue of `probe::source::InMemoryProbeSource`.
pub struct InMemoryPairedReadSource {
    pairs: VecDeque<(RawRead, RawRead)>,
}

impl InMemoryPairedReadSource {
    pub fn new(pairs: Vec<(RawRead, RawRead)>) -> Self {
        InMemoryPairedReadSource { pairs: pairs.into() }
    }
}

impl PairedReadSource for InMemoryPairedReadSource {
    fn next_pair(&mut self) -> Result<Option<(RawRead, RawRead)>, HeatseqError> {
        Ok(self.pairs.pop_front())
    }
}

/// A [`BamRecordSink`] that records every written record instead of writing
/// a BAM file, so assertions can inspect [`OutputRecord`] fields directly.
/// Records arrive in `OutputAssembler::finalize`'s sorted, mate-cross-
/// referenced order, first-of-pair immediately followed by second-of-pair.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Vec<OutputRecord>,
    pub finished: bool,
}

impl BamRecordSink for RecordingSink {
    fn write_record(&mut self, record: &OutputRecord, _pair: &heatseq_core::output::OutputPair) -> Result<(), HeatseqError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), HeatseqError> {
        self.finished = true;
        Ok(())
    }
}
