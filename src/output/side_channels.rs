//! [`SideChannelWriter`]: the five optional tab-separated side-channel
//! outputs (§6 "Side-channel outputs").

use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::HeatseqError;
use crate::io::{RawRead, WriteFileZipStdout, create_writer};

/// Receives records the core pipeline routes away from the main BAM output:
/// ambiguous mappings, per-pair probe/UID/quality detail, primer
/// misalignments, unmapped pairs, and primer alignment detail (§6, §4.6
/// step 5, §4.5). Absence of any one channel must not impair the core
/// pipeline (§6): [`NullSideChannels`] satisfies the trait by discarding
/// everything.
pub trait SideChannelWriter: Send + Sync {
    fn write_ambiguous(&self, read1: &RawRead, read2: &RawRead, candidate_count: usize) -> Result<(), HeatseqError>;
    fn write_probe_uid_quality(&self, probe_id: &str, uid: &str, total_quality: u32, pair_ordinal: u64) -> Result<(), HeatseqError>;
    fn write_unable_to_align(&self, read1: &RawRead, read2: &RawRead, reason: &str) -> Result<(), HeatseqError>;
    fn write_unmapped(&self, read1: &RawRead, read2: &RawRead) -> Result<(), HeatseqError>;
    fn write_primer_alignment_detail(&self, read_header: &str, edit_distance: usize, cutoff: usize) -> Result<(), HeatseqError>;
}

/// Discards everything; the default when no side-channel paths are
/// configured.
#[derive(Default)]
pub struct NullSideChannels;

impl SideChannelWriter for NullSideChannels {
    fn write_ambiguous(&self, _read1: &RawRead, _read2: &RawRead, _candidate_count: usize) -> Result<(), HeatseqError> {
        Ok(())
    }

    fn write_probe_uid_quality(&self, _probe_id: &str, _uid: &str, _total_quality: u32, _pair_ordinal: u64) -> Result<(), HeatseqError> {
        Ok(())
    }

    fn write_unable_to_align(&self, _read1: &RawRead, _read2: &RawRead, _reason: &str) -> Result<(), HeatseqError> {
        Ok(())
    }

    fn write_unmapped(&self, _read1: &RawRead, _read2: &RawRead) -> Result<(), HeatseqError> {
        Ok(())
    }

    fn write_primer_alignment_detail(&self, _read_header: &str, _edit_distance: usize, _cutoff: usize) -> Result<(), HeatseqError> {
        Ok(())
    }
}

/// Opens `path` via [`create_writer`], so a `.gz` extension transparently
/// gzips the channel, and writes the fixed header row.
fn open_tsv(path: impl AsRef<Path>, header: &str) -> Result<Mutex<WriteFileZipStdout>, HeatseqError> {
    let mut writer = create_writer(Some(path))?;
    writeln!(writer, "{header}")?;
    Ok(Mutex::new(writer))
}

/// Writes each channel to its own tab-separated file (optionally gzip
/// compressed, per [`create_writer`]) with a fixed header row, all mutexed
/// per writer (§5 "All writers ... are mutexed per writer"). Any of the five
/// paths may be omitted; that channel becomes a no-op.
#[derive(Default)]
pub struct TsvSideChannels {
    ambiguous: Option<Mutex<WriteFileZipStdout>>,
    probe_uid_quality: Option<Mutex<WriteFileZipStdout>>,
    unable_to_align: Option<Mutex<WriteFileZipStdout>>,
    unmapped: Option<Mutex<WriteFileZipStdout>>,
    primer_alignment_detail: Option<Mutex<WriteFileZipStdout>>,
}

pub struct TsvSideChannelPaths<'a> {
    pub ambiguous: Option<&'a Path>,
    pub probe_uid_quality: Option<&'a Path>,
    pub unable_to_align: Option<&'a Path>,
    pub unmapped: Option<&'a Path>,
    pub primer_alignment_detail: Option<&'a Path>,
}

impl TsvSideChannels {
    pub fn open(paths: TsvSideChannelPaths<'_>) -> Result<Self, HeatseqError> {
        Ok(TsvSideChannels {
            ambiguous: paths.ambiguous.map(|p| open_tsv(p, "read1_header\tread2_header\tcandidate_count")).transpose()?,
            probe_uid_quality: paths
                .probe_uid_quality
                .map(|p| open_tsv(p, "probe_id\tuid\ttotal_quality\tpair_ordinal"))
                .transpose()?,
            unable_to_align: paths.unable_to_align.map(|p| open_tsv(p, "read1_header\tread2_header\treason")).transpose()?,
            unmapped: paths.unmapped.map(|p| open_tsv(p, "read1_header\tread1_sequence\tread2_header\tread2_sequence")).transpose()?,
            primer_alignment_detail: paths
                .primer_alignment_detail
                .map(|p| open_tsv(p, "read_header\tedit_distance\tcutoff"))
                .transpose()?,
        })
    }
}

impl SideChannelWriter for TsvSideChannels {
    fn write_ambiguous(&self, read1: &RawRead, read2: &RawRead, candidate_count: usize) -> Result<(), HeatseqError> {
        if let Some(w) = &self.ambiguous {
            writeln!(w.lock(), "{}\t{}\t{candidate_count}", read1.header, read2.header)?;
        }
        Ok(())
    }

    fn write_probe_uid_quality(&self, probe_id: &str, uid: &str, total_quality: u32, pair_ordinal: u64) -> Result<(), HeatseqError> {
        if let Some(w) = &self.probe_uid_quality {
            writeln!(w.lock(), "{probe_id}\t{uid}\t{total_quality}\t{pair_ordinal}")?;
        }
        Ok(())
    }

    fn write_unable_to_align(&self, read1: &RawRead, read2: &RawRead, reason: &str) -> Result<(), HeatseqError> {
        if let Some(w) = &self.unable_to_align {
            writeln!(w.lock(), "{}\t{}\t{reason}", read1.header, read2.header)?;
        }
        Ok(())
    }

    fn write_unmapped(&self, read1: &RawRead, read2: &RawRead) -> Result<(), HeatseqError> {
        if let Some(w) = &self.unmapped {
            writeln!(
                w.lock(),
                "{}\t{}\t{}\t{}",
                read1.header,
                String::from_utf8_lossy(&read1.sequence),
                read2.header,
                String::from_utf8_lossy(&read2.sequence)
            )?;
        }
        Ok(())
    }

    fn write_primer_alignment_detail(&self, read_header: &str, edit_distance: usize, cutoff: usize) -> Result<(), HeatseqError> {
        if let Some(w) = &self.primer_alignment_detail {
            writeln!(w.lock(), "{read_header}\t{edit_distance}\t{cutoff}")?;
        }
        Ok(())
    }
}
