//! [`UidExtractor`]: fixed-length and primer-anchored UID/tail extraction
//! (§4.5 — component L5).

use crate::align::GlobalAligner;
use crate::error::HeatseqError;
use crate::output::SideChannelWriter;
use crate::sequence::PackedSequence;

/// The UID and trimmed tail extracted from a mate-one read (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUid {
    pub uid: String,
    pub tail_sequence: PackedSequence,
    pub tail_quality: Vec<u8>,
}

/// The trimmed tail extracted from a mate-two read, which carries no UID of
/// its own but is still primer-anchored in variable-length mode (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedTail {
    pub tail_sequence: PackedSequence,
    pub tail_quality: Vec<u8>,
}

/// Extracts the molecular UID and probe-facing tail from a read pair, in
/// either of the two modes named by §4.5.
pub struct UidExtractor {
    uid_length: usize,
    variable_length_uids: bool,
    primer_edit_distance_cutoff_divisor: usize,
}

impl UidExtractor {
    pub fn new(uid_length: usize, variable_length_uids: bool, primer_edit_distance_cutoff_divisor: usize) -> Self {
        UidExtractor { uid_length, variable_length_uids, primer_edit_distance_cutoff_divisor }
    }

    /// Extracts the UID and trimmed tail from mate one.
    ///
    /// Fixed mode takes `uid = read[0..L]` verbatim (§4.5 "Fixed length").
    /// Variable mode aligns `read_sequence` (as the aligner's *reference*)
    /// against `extension_primer` (as the *query*): because
    /// [`GlobalAligner::align`] is a full end-to-end alignment, the primer's
    /// leading edge lands wherever it best matches inside the read, and
    /// `index_of_first_match_in_reference` — an offset into the read — is
    /// exactly the discovered UID length (§4.5 "Variable length,
    /// primer-anchored").
    #[allow(clippy::too_many_arguments)]
    pub fn extract_uid(
        &self,
        aligner: &GlobalAligner,
        read_sequence: &PackedSequence,
        read_quality: &[u8],
        extension_primer: &PackedSequence,
        read_header: &str,
        side_channels: &dyn SideChannelWriter,
    ) -> Result<ExtractedUid, HeatseqError> {
        if !self.variable_length_uids {
            let split = self.uid_length.min(read_sequence.len());
            return Ok(ExtractedUid {
                uid: String::from_utf8_lossy(&read_sequence.subsequence(0, split).to_text()).into_owned(),
                tail_sequence: read_sequence.subsequence(split, read_sequence.len()),
                tail_quality: read_quality.get(split..).unwrap_or(&[]).to_vec(),
            });
        }

        let (cut, edit_distance) = self.primer_anchored_cut(aligner, read_sequence, extension_primer, read_header, side_channels)?;
        log::trace!("primer-anchored UID cut at {cut} (edit distance {edit_distance})");
        Ok(ExtractedUid {
            uid: String::from_utf8_lossy(&read_sequence.subsequence(0, cut).to_text()).into_owned(),
            tail_sequence: read_sequence.subsequence(cut, read_sequence.len()),
            tail_quality: read_quality.get(cut..).unwrap_or(&[]).to_vec(),
        })
    }

    /// Trims the primer-adjacent prefix from mate two. Fixed mode trims a
    /// flat `ligation_primer.len()` prefix; variable mode repeats the
    /// primer-anchored alignment against the reverse complement of the
    /// ligation primer, discarding the discovered prefix without reporting
    /// it as a UID (§4.6 step 1: "strip primer-length prefixes ... from both
    /// mates").
    #[allow(clippy::too_many_arguments)]
    pub fn trim_mate_two(
        &self,
        aligner: &GlobalAligner,
        read_sequence: &PackedSequence,
        read_quality: &[u8],
        ligation_primer_rc: &PackedSequence,
        read_header: &str,
        side_channels: &dyn SideChannelWriter,
    ) -> Result<TrimmedTail, HeatseqError> {
        let cut = if !self.variable_length_uids {
            ligation_primer_rc.len().min(read_sequence.len())
        } else {
            self.primer_anchored_cut(aligner, read_sequence, ligation_primer_rc, read_header, side_channels)?.0
        };

        Ok(TrimmedTail {
            tail_sequence: read_sequence.subsequence(cut, read_sequence.len()),
            tail_quality: read_quality.get(cut..).unwrap_or(&[]).to_vec(),
        })
    }

    /// Runs the primer-anchored alignment and reports the outcome to the
    /// primer-alignment-detail side channel for every attempt, not just
    /// failures, so the channel reflects the actual edit-distance
    /// distribution rather than only the misalignments that already get
    /// routed to the unable-to-align channel.
    fn primer_anchored_cut(
        &self,
        aligner: &GlobalAligner,
        read_sequence: &PackedSequence,
        primer: &PackedSequence,
        read_header: &str,
        side_channels: &dyn SideChannelWriter,
    ) -> Result<(usize, usize), HeatseqError> {
        let alignment = aligner.align(read_sequence, primer);
        let edit_distance = alignment.cigar.edit_distance();
        let cutoff = (primer.len() / self.primer_edit_distance_cutoff_divisor.max(1)).max(1);
        let _ = side_channels.write_primer_alignment_detail(read_header, edit_distance, cutoff);
        if edit_distance >= cutoff {
            return Err(HeatseqError::PrimerMisaligned { edit_distance, cutoff });
        }
        Ok((alignment.index_of_first_match_in_reference, edit_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentScorer;
    use crate::output::NullSideChannels;

    fn seq(s: &str) -> PackedSequence {
        PackedSequence::new(s.as_bytes()).unwrap()
    }

    #[test]
    fn fixed_mode_splits_at_nominal_length() {
        let extractor = UidExtractor::new(4, false, 4);
        let aligner = GlobalAligner::new(AlignmentScorer::default());
        let read = seq("ACGTTTTTTT");
        let out = extractor.extract_uid(&aligner, &read, b"IIIIIIIIII", &seq("GGGG"), "r1", &NullSideChannels).unwrap();
        assert_eq!(out.uid, "ACGT");
        assert_eq!(out.tail_sequence.to_text(), b"TTTTTT");
        assert_eq!(out.tail_quality, b"IIIIII");
    }

    #[test]
    fn variable_mode_finds_primer_anchored_cut() {
        let extractor = UidExtractor::new(4, true, 4);
        let aligner = GlobalAligner::new(AlignmentScorer::default());
        // UID "ACGT" followed by an exact primer match, then the real tail.
        let read = seq("ACGTGGGGCCCCTTTT");
        let primer = seq("GGGG");
        let out = extractor.extract_uid(&aligner, &read, &vec![b'I'; 16], &primer, "r1", &NullSideChannels).unwrap();
        assert_eq!(out.uid, "ACGT");
        assert_eq!(out.tail_sequence.to_text(), b"CCCCTTTT");
    }

    #[test]
    fn variable_mode_rejects_badly_misaligned_primer() {
        let extractor = UidExtractor::new(4, true, 4);
        let aligner = GlobalAligner::new(AlignmentScorer::default());
        let read = seq("TTTTTTTTTTTTTTTT");
        let primer = seq("GGGGGGGG");
        let err = extractor.extract_uid(&aligner, &read, &vec![b'I'; 16], &primer, "r1", &NullSideChannels).unwrap_err();
        assert!(matches!(err, HeatseqError::PrimerMisaligned { .. }));
    }

    #[test]
    fn trim_mate_two_fixed_mode_uses_primer_length() {
        let extractor = UidExtractor::new(4, false, 4);
        let aligner = GlobalAligner::new(AlignmentScorer::default());
        let read = seq("GGGGCCCCTTTT");
        let out = extractor.trim_mate_two(&aligner, &read, b"IIIIIIIIIIII", &seq("GGGG"), "r2", &NullSideChannels).unwrap();
        assert_eq!(out.tail_sequence.to_text(), b"CCCCTTTT");
    }
}
