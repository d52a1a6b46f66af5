//! [`BamRecordSink`]: the narrow external-collaborator contract for output
//! (§6 "Output"), plus the crate's one implementation, [`HtslibBamSink`].

use std::path::Path;

use rust_htslib::bam::header::HeaderRecord;
use rust_htslib::bam::record::{Aux, Cigar as HtsCigarOp, CigarString};
use rust_htslib::bam::{Format, Header, Record, Writer};

use crate::align::CigarOp;
use crate::error::HeatseqError;
use crate::output::types::{MateSlot, OutputPair, OutputRecord};

/// A sink for finished output records (§6 "Output": "External BAM writer
/// accepting a sorted stream plus a header"). Kept narrow — one method to
/// receive a record in its final sorted position, one to flush — so the
/// rest of the crate never depends on `rust_htslib` directly.
pub trait BamRecordSink {
    fn write_record(&mut self, record: &OutputRecord, pair: &OutputPair) -> Result<(), HeatseqError>;
    fn finish(&mut self) -> Result<(), HeatseqError>;
}

/// Writes records to a BAM file via `rust_htslib`, with one `@SQ` line per
/// probe-input sequence name and a single `@RG` derived from the input file
/// names (§6).
pub struct HtslibBamSink {
    writer: Writer,
}

impl HtslibBamSink {
    /// Builds the BAM header from `sequence_names` (in probe-input order,
    /// giving each its `ref_index`) and a read group `id` (conventionally
    /// derived from the input file names), then opens `path` for writing.
    pub fn create(path: impl AsRef<Path>, sequence_names: &[String], read_group_id: &str) -> Result<Self, HeatseqError> {
        let mut header = Header::new();
        for name in sequence_names {
            let mut record = HeaderRecord::new(b"SQ");
            record.push_tag(b"SN", name);
            // length is unknown at header-construction time in this crate's
            // narrow contract; htslib accepts 0 and the BAI index is not
            // built here regardless.
            record.push_tag(b"LN", 0i64);
            header.push_record(&record);
        }
        let mut rg = HeaderRecord::new(b"RG");
        rg.push_tag(b"ID", read_group_id);
        header.push_record(&rg);

        let writer = Writer::from_path(path.as_ref(), &header, Format::Bam).map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;

        Ok(HtslibBamSink { writer })
    }

    fn tid_for(&self, ref_index: Option<usize>) -> i32 {
        ref_index.map(|i| i as i32).unwrap_or(-1)
    }
}

impl BamRecordSink for HtslibBamSink {
    fn write_record(&mut self, record: &OutputRecord, _pair: &OutputPair) -> Result<(), HeatseqError> {
        let mut bam_record = Record::new();

        let cigar = record.cigar.as_ref().map(|c| to_htslib_cigar(c));
        bam_record.set(record.header.as_bytes(), cigar.as_ref(), &record.sequence, &record.quality);

        bam_record.set_tid(self.tid_for(record.ref_index));
        bam_record.set_pos(record.position.unwrap_or(-1));
        bam_record.set_mapq(record.mapping_quality);

        bam_record.set_mtid(self.tid_for(record.mate_ref_index));
        bam_record.set_mpos(record.mate_position.unwrap_or(-1));

        bam_record.set_paired();
        if !record.unmapped && !record.mate_unmapped {
            bam_record.set_proper_pair();
        }
        match record.mate {
            MateSlot::First => bam_record.set_first_in_template(),
            MateSlot::Second => bam_record.set_last_in_template(),
        }
        if record.unmapped {
            bam_record.set_unmapped();
        }
        if record.mate_unmapped {
            bam_record.set_mate_unmapped();
        }
        if record.negative_strand {
            bam_record.set_reverse();
        }
        if record.mate_negative_strand {
            bam_record.set_mate_reverse();
        }

        bam_record
            .push_aux(b"EI", Aux::String(&record.extension_uid))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        bam_record
            .push_aux(b"LI", Aux::String(&record.ligation_uid))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        bam_record
            .push_aux(b"UG", Aux::String(&record.uid_group))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        bam_record
            .push_aux(b"PI", Aux::String(&record.probe_id))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        bam_record
            .push_aux(b"ML", Aux::U32(record.mapped_read_length))
            .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        if let Some(cigar) = &record.cigar {
            bam_record
                .push_aux(b"NM", Aux::U32(cigar.edit_distance() as u32))
                .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        }
        if let Some(md) = &record.md_tag {
            bam_record
                .push_aux(b"MD", Aux::String(md))
                .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        }
        if let Some(err) = &record.extension_error {
            bam_record
                .push_aux(b"EE", Aux::String(err))
                .map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))?;
        }

        self.writer.write(&bam_record).map_err(|e| HeatseqError::IoFailure(std::io::Error::other(e.to_string())))
    }

    fn finish(&mut self) -> Result<(), HeatseqError> {
        Ok(())
    }
}

fn to_htslib_cigar(cigar: &crate::align::Cigar) -> CigarString {
    CigarString(
        cigar
            .0
            .iter()
            .map(|(op, len)| match op {
                CigarOp::Match | CigarOp::Mismatch => HtsCigarOp::Match(*len),
                CigarOp::Insertion => HtsCigarOp::Ins(*len),
                CigarOp::Deletion => HtsCigarOp::Del(*len),
                CigarOp::Clip => HtsCigarOp::SoftClip(*len),
            })
            .collect(),
    )
}
