//! [`ProbeSource`]: the narrow external-collaborator contract for probe
//! definitions (§6 "Probe input").

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::HeatseqError;
use crate::probe::types::{Probe, Strand};
use crate::sequence::PackedSequence;

/// Loads the probe set for a run (§6 "Probe input": "External probe parser
/// yielding `Probe` values, keyed by id (unique)"). Kept narrow so the
/// pipeline itself never depends on a specific probe file format.
pub trait ProbeSource {
    fn load(&self) -> Result<Vec<Arc<Probe>>, HeatseqError>;
}

/// A fixed in-memory probe set, used by tests and by embedders that already
/// have `Probe` values in hand.
pub struct InMemoryProbeSource {
    probes: Vec<Arc<Probe>>,
}

impl InMemoryProbeSource {
    pub fn new(probes: Vec<Arc<Probe>>) -> Self {
        InMemoryProbeSource { probes }
    }
}

impl ProbeSource for InMemoryProbeSource {
    fn load(&self) -> Result<Vec<Arc<Probe>>, HeatseqError> {
        Ok(self.probes.clone())
    }
}

/// A plain tab-separated probe file, one probe per line:
///
/// ```text
/// id  sequence_name  strand  ext_start  ext_stop  capture_start  capture_stop  lig_start  lig_stop  ext_primer_seq  lig_primer_seq
/// ```
///
/// `strand` is `+` or `-`. This format is not part of the narrow
/// [`ProbeSource`] contract (§6 calls the probe parser an external
/// collaborator out of scope for the engine itself); it exists so the
/// `heatseq-core` binary has something to read probe files with, the same
/// role the container table parsing in [`crate::genome::GenomeStore::open`]
/// plays for the genome file.
pub struct TsvProbeSource {
    path: std::path::PathBuf,
}

impl TsvProbeSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        TsvProbeSource { path: path.as_ref().to_path_buf() }
    }
}

impl ProbeSource for TsvProbeSource {
    fn load(&self) -> Result<Vec<Arc<Probe>>, HeatseqError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut probes = Vec::new();
        let mut seen_ids = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 11 {
                return Err(HeatseqError::Config(format!(
                    "probe file {}: line {} has {} fields, expected 11",
                    self.path.display(),
                    line_no + 1,
                    fields.len()
                )));
            }

            let parse_u64 = |s: &str, field: &str| -> Result<u64, HeatseqError> {
                s.parse().map_err(|_| HeatseqError::Config(format!("probe file {}: non-numeric {field} {s:?}", self.path.display())))
            };

            let id = fields[0].to_string();
            if let Some(prior_line) = seen_ids.insert(id.clone(), line_no + 1) {
                return Err(HeatseqError::Config(format!(
                    "probe file {}: duplicate probe id {id:?} at lines {prior_line} and {}",
                    self.path.display(),
                    line_no + 1
                )));
            }

            let strand = match fields[2] {
                "+" => Strand::Forward,
                "-" => Strand::Reverse,
                other => {
                    return Err(HeatseqError::Config(format!(
                        "probe file {}: invalid strand {other:?} for probe {id}",
                        self.path.display()
                    )));
                }
            };

            let probe = Probe {
                id,
                sequence_name: fields[1].to_string(),
                extension_primer_start: parse_u64(fields[3], "extension_primer_start")?,
                extension_primer_stop: parse_u64(fields[4], "extension_primer_stop")?,
                capture_target_start: parse_u64(fields[5], "capture_target_start")?,
                capture_target_stop: parse_u64(fields[6], "capture_target_stop")?,
                ligation_primer_start: parse_u64(fields[7], "ligation_primer_start")?,
                ligation_primer_stop: parse_u64(fields[8], "ligation_primer_stop")?,
                strand,
                extension_primer_sequence: PackedSequence::new(fields[9].as_bytes())?,
                ligation_primer_sequence: PackedSequence::new(fields[10].as_bytes())?,
            };
            probes.push(Arc::new(probe));
        }

        Ok(probes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_tsv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "p1\tchr1\t+\t1\t20\t21\t100\t101\t120\tACGTA\tTGCAT").unwrap();
        let source = TsvProbeSource::new(file.path());
        let probes = source.load().unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].id, "p1");
        assert_eq!(probes[0].strand, Strand::Forward);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "p1\tchr1\t+\t1\t20\t21\t100\t101\t120\tACGTA\tTGCAT").unwrap();
        writeln!(file, "p1\tchr2\t+\t1\t20\t21\t100\t101\t120\tACGTA\tTGCAT").unwrap();
        let source = TsvProbeSource::new(file.path());
        assert!(matches!(source.load(), Err(HeatseqError::Config(_))));
    }

    #[test]
    fn rejects_unknown_strand() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "p1\tchr1\t?\t1\t20\t21\t100\t101\t120\tACGTA\tTGCAT").unwrap();
        let source = TsvProbeSource::new(file.path());
        assert!(matches!(source.load(), Err(HeatseqError::Config(_))));
    }
}
