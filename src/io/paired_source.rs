//! [`PairedReadSource`]: the narrow external-collaborator contract for
//! paired read input (§6 "Read input"), plus the crate's one implementation,
//! [`ZoeFastqPairSource`].

use std::path::{Path, PathBuf};

use zoe::data::records::HeaderReadable;
use zoe::prelude::FastQ;

use crate::error::HeatseqError;
use crate::io::{FastQReaderIc, IoThreads, open_fastq_files};
use crate::utils::paired_reads::{CheckedHeaders, ZipPairedReadsExt, ZipReads};

/// A single extracted read: header, raw sequence text, and Phred quality
/// bytes. Kept as plain owned data (not `zoe::FastQ`) so the rest of the
/// crate never depends on the FASTQ parser's internal representation — the
/// narrow contract named by §6.
#[derive(Debug, Clone)]
pub struct RawRead {
    pub header: String,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl From<FastQ> for RawRead {
    fn from(record: FastQ) -> Self {
        RawRead {
            header: record.header().to_string(),
            sequence: record.sequence.as_bytes().to_vec(),
            quality: record.quality.as_bytes().to_vec(),
        }
    }
}

/// A source of `(mate_one, mate_two)` pairs (§6 "Read input"). Pairs are
/// yielded in input order; `pair_ordinal` is the caller's running count.
pub trait PairedReadSource {
    /// Returns the next pair, or `Ok(None)` at end of input.
    fn next_pair(&mut self) -> Result<Option<(RawRead, RawRead)>, HeatseqError>;
}

/// A [`PairedReadSource`] backed by `zoe`'s FASTQ parser over two paired
/// FASTQ(.gz) files, pairing records with [`ZipReads`] (header-checked) the
/// same way the teacher's standalone trimmer pairs mates.
pub struct ZoeFastqPairSource {
    zipped: ZipReads<FastQReaderIc, FastQReaderIc, FastQ, CheckedHeaders>,
    io_threads: Option<IoThreads>,
}

impl ZoeFastqPairSource {
    pub fn open(path1: impl AsRef<Path>, path2: impl AsRef<Path>) -> Result<Self, HeatseqError> {
        let path1: PathBuf = path1.as_ref().to_path_buf();
        let path2: PathBuf = path2.as_ref().to_path_buf();
        let (reader1, reader2, threads) = open_fastq_files(path1, Some(path2))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        let reader2 = reader2.expect("two paths were supplied");

        Ok(ZoeFastqPairSource { zipped: reader1.zip_paired_reads(reader2), io_threads: Some(threads) })
    }

    /// Joins the background decompression threads, if any, and propagates
    /// their errors. Call after [`PairedReadSource::next_pair`] has returned
    /// `Ok(None)`.
    pub fn finalize(&mut self) -> Result<(), HeatseqError> {
        if let Some(threads) = self.io_threads.take() {
            threads.finalize().map_err(HeatseqError::from)?;
        }
        Ok(())
    }
}

impl PairedReadSource for ZoeFastqPairSource {
    fn next_pair(&mut self) -> Result<Option<(RawRead, RawRead)>, HeatseqError> {
        match self.zipped.next() {
            None => Ok(None),
            Some(Ok([r1, r2])) => Ok(Some((RawRead::from(r1), RawRead::from(r2)))),
            Some(Err(e)) => Err(HeatseqError::IoFailure(std::io::Error::other(e.to_string()))),
        }
    }
}
