use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use heatseq_core::align::AlignmentScorer;
use heatseq_core::config::CliConfig;
use heatseq_core::error::HeatseqError;
use heatseq_core::genome::GenomeStore;
use heatseq_core::io::ZoeFastqPairSource;
use heatseq_core::output::{BamRecordSink, HtslibBamSink, NullSideChannels, SideChannelWriter, TsvSideChannelPaths, TsvSideChannels};
use heatseq_core::probe::{ProbeSource, TsvProbeSource};
use heatseq_core::Pipeline;

/// Top-level CLI, flattening [`CliConfig`] — the narrow, testable config
/// surface — into a `clap` entry point (§6 "Configuration").
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CliConfig,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match run(cli.config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: CliConfig) -> Result<(), HeatseqError> {
    let config = cli.to_pipeline_config()?;

    let genome = GenomeStore::open(&cli.genome_path)?;
    let probes = TsvProbeSource::new(&cli.probe_path).load()?;
    log::info!("loaded {} probes over {} containers", probes.len(), genome.containers().len());

    let mut source = ZoeFastqPairSource::open(&cli.fastq1, &cli.fastq2)?;

    let pipeline = Pipeline::new(config, genome, probes, AlignmentScorer::default());

    let read_group_id = read_group_id(&cli.fastq1, &cli.fastq2);
    let mut sink = HtslibBamSink::create(&cli.output_bam, &pipeline.sequence_names(), &read_group_id)?;

    let side_channels = open_side_channels(&cli)?;

    let telemetry = pipeline.run(&mut source, &mut sink, side_channels.as_ref())?;
    sink.finish()?;
    source.finalize()?;

    log::info!(
        "mapped={} unmapped={} ambiguous={} unable_to_align={} duplicates_removed={}",
        telemetry.mapped_count(),
        telemetry.unmapped_count(),
        telemetry.ambiguous_count(),
        telemetry.unable_to_align_count(),
        telemetry.duplicates_removed_count(),
    );

    Ok(())
}

/// Derives an `@RG` id from the input file stems, joined with a hyphen, the
/// same "name both mates" convention the teacher's preprocess module uses
/// for naming merged output.
fn read_group_id(fastq1: &Path, fastq2: &Path) -> String {
    let stem = |p: &Path| -> String { p.file_stem().and_then(|s| s.to_str()).unwrap_or("reads").to_string() };
    format!("{}-{}", stem(fastq1), stem(fastq2))
}

fn open_side_channels(cli: &CliConfig) -> Result<Box<dyn SideChannelWriter>, HeatseqError> {
    let any_configured = cli.ambiguous_channel.is_some()
        || cli.probe_uid_quality_channel.is_some()
        || cli.unable_to_align_channel.is_some()
        || cli.unmapped_channel.is_some()
        || cli.primer_alignment_detail_channel.is_some();

    if !any_configured {
        return Ok(Box::new(NullSideChannels));
    }

    let channels = TsvSideChannels::open(TsvSideChannelPaths {
        ambiguous: cli.ambiguous_channel.as_deref(),
        probe_uid_quality: cli.probe_uid_quality_channel.as_deref(),
        unable_to_align: cli.unable_to_align_channel.as_deref(),
        unmapped: cli.unmapped_channel.as_deref(),
        primer_alignment_detail: cli.primer_alignment_detail_channel.as_deref(),
    })?;

    Ok(Box::new(channels))
}
