//! [`PipelineConfig`] and its CLI surface (§6 "Configuration", component L0).

use std::path::PathBuf;

use clap::Args;

use crate::error::HeatseqError;

/// Validated run configuration (§6: `uid_length`, `variable_length_uids`,
/// `workers`, `kmer_size`, `min_kmer_hits`,
/// `primer_edit_distance_cutoff_divisor`, `mapping_quality_default`).
/// Constructed once via [`PipelineConfig::try_new`]; every field is
/// immutable afterward.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub uid_length: usize,
    pub variable_length_uids: bool,
    pub workers: usize,
    pub kmer_size: usize,
    pub min_kmer_hits: usize,
    pub primer_edit_distance_cutoff_divisor: usize,
    pub mapping_quality_default: u8,
}

impl PipelineConfig {
    /// Validates and constructs a configuration. Failure here is a
    /// structural, pipeline-does-not-start error (§7).
    pub fn try_new(
        uid_length: usize,
        variable_length_uids: bool,
        workers: usize,
        kmer_size: usize,
        min_kmer_hits: usize,
        primer_edit_distance_cutoff_divisor: usize,
        mapping_quality_default: u8,
    ) -> Result<Self, HeatseqError> {
        if workers == 0 {
            return Err(HeatseqError::Config("workers must be >= 1".to_string()));
        }
        if !(8..=16).contains(&kmer_size) {
            return Err(HeatseqError::Config(format!("kmer_size must be in 8..=16, got {kmer_size}")));
        }
        if min_kmer_hits == 0 {
            return Err(HeatseqError::Config("min_kmer_hits must be >= 1".to_string()));
        }
        if primer_edit_distance_cutoff_divisor == 0 {
            return Err(HeatseqError::Config("primer_edit_distance_cutoff_divisor must be > 0".to_string()));
        }

        Ok(PipelineConfig {
            uid_length,
            variable_length_uids,
            workers,
            kmer_size,
            min_kmer_hits,
            primer_edit_distance_cutoff_divisor,
            mapping_quality_default,
        })
    }
}

/// Command-line surface for [`PipelineConfig`] plus the file paths the
/// binary needs (genome, probes, paired FASTQ input, BAM output, optional
/// side channels).
#[derive(Args, Debug)]
pub struct CliConfig {
    /// Path to the compact 2-bit genome file (§6 "Compact genome file format").
    pub genome_path: PathBuf,

    /// Path to the probe definition file (§3 "Probe").
    pub probe_path: PathBuf,

    /// Path to mate-one FASTQ(.gz) input.
    pub fastq1: PathBuf,

    /// Path to mate-two FASTQ(.gz) input.
    pub fastq2: PathBuf,

    /// Output BAM path.
    #[arg(short = 'o', long)]
    pub output_bam: PathBuf,

    /// Nominal UID length in bases.
    #[arg(long, default_value = "12")]
    pub uid_length: usize,

    /// Use primer-anchored variable-length UID extraction instead of a
    /// fixed-length prefix.
    #[arg(long)]
    pub variable_length_uids: bool,

    /// Worker pool size for both pipeline phases. Defaults to the detected
    /// CPU count.
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// ProbeIndex k-mer size, 8..=16.
    #[arg(long, default_value = "12")]
    pub kmer_size: usize,

    /// Minimum diagonal-consistent k-mer hit count to accept a probe
    /// candidate.
    #[arg(long, default_value = "3")]
    pub min_kmer_hits: usize,

    /// Divisor applied to primer length to derive the primer-misalignment
    /// edit-distance cutoff.
    #[arg(long, default_value = "4")]
    pub primer_edit_distance_cutoff_divisor: usize,

    /// Mapping quality written for every mapped record.
    #[arg(long, default_value = "60")]
    pub mapping_quality_default: u8,

    /// Optional ambiguous-mapping side-channel TSV path.
    #[arg(long)]
    pub ambiguous_channel: Option<PathBuf>,

    /// Optional probe/UID/quality-per-pair side-channel TSV path.
    #[arg(long)]
    pub probe_uid_quality_channel: Option<PathBuf>,

    /// Optional unable-to-align-primer side-channel TSV path.
    #[arg(long)]
    pub unable_to_align_channel: Option<PathBuf>,

    /// Optional unmapped-pairs side-channel TSV path.
    #[arg(long)]
    pub unmapped_channel: Option<PathBuf>,

    /// Optional primer-alignment-detail side-channel TSV path.
    #[arg(long)]
    pub primer_alignment_detail_channel: Option<PathBuf>,
}

impl CliConfig {
    pub fn workers_or_detected(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, HeatseqError> {
        PipelineConfig::try_new(
            self.uid_length,
            self.variable_length_uids,
            self.workers_or_detected(),
            self.kmer_size,
            self.min_kmer_hits,
            self.primer_edit_distance_cutoff_divisor,
            self.mapping_quality_default,
        )
    }
}
