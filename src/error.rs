//! Error kinds shared across the probe-mapping / dedup / extension engine.
//!
//! Per §7 of the design: structural errors (cannot open input, cannot parse
//! the probe set, cannot open the genome file, corrupt footer) are fatal and
//! propagate out of [`crate::pipeline::Pipeline::run`]. Per-pair errors raised
//! inside a phase-1 or phase-2 worker are contained at the worker boundary
//! (see `pipeline::phase1` / `pipeline::phase2`) and never reach this type's
//! callers as a propagated `?`.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The error kinds named in §7: `InvalidBase`, `UnknownContainer`,
/// `OutOfRange`, `PrimerMisaligned`, `AmbiguousMapping`, `NoMapping`,
/// `IoFailure`, `MalformedHeader`, plus an internal-invariant kind used for
/// barrier failures (§7 "Barrier failures").
#[non_exhaustive]
#[derive(Debug)]
pub enum HeatseqError {
    /// A sequence contained a byte outside the accepted alphabet.
    InvalidBase { found: u8, at: usize },
    /// A [`crate::genome::GenomeStore`] lookup referenced a container name not
    /// present in the table.
    UnknownContainer { name: String },
    /// A requested coordinate range fell outside a container's length.
    OutOfRange { container: String, end: u64, container_len: u64 },
    /// Primer-anchored UID extraction produced an alignment with too many
    /// edits against the primer (§4.5).
    PrimerMisaligned { edit_distance: usize, cutoff: usize },
    /// A read pair's candidate probes were mutually consistent on more than
    /// one probe (§4.6 step 5).
    AmbiguousMapping { candidate_count: usize },
    /// A read pair produced no mutually consistent probe candidate.
    NoMapping,
    /// An underlying I/O failure, e.g. opening the genome file or an input
    /// stream.
    IoFailure(io::Error),
    /// A FASTQ/probe header could not be parsed into the expected shape.
    MalformedHeader { header: String },
    /// A structural configuration problem (§6 `Configuration`), fatal before
    /// the pipeline starts.
    Config(String),
    /// A worker reported a programming-error invariant breach (§7 "Barrier
    /// failures"); the run aborts before phase 2 / finalize.
    Internal(String),
}

impl fmt::Display for HeatseqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatseqError::InvalidBase { found, at } => {
                write!(f, "invalid base byte 0x{found:02x} at offset {at}")
            }
            HeatseqError::UnknownContainer { name } => write!(f, "unknown container `{name}`"),
            HeatseqError::OutOfRange { container, end, container_len } => write!(
                f,
                "range end {end} exceeds container `{container}` length {container_len}"
            ),
            HeatseqError::PrimerMisaligned { edit_distance, cutoff } => write!(
                f,
                "primer alignment edit distance {edit_distance} >= cutoff {cutoff}"
            ),
            HeatseqError::AmbiguousMapping { candidate_count } => {
                write!(f, "{candidate_count} mutually consistent probe candidates, expected exactly one")
            }
            HeatseqError::NoMapping => write!(f, "no mutually consistent probe candidate"),
            HeatseqError::IoFailure(e) => write!(f, "{e}"),
            HeatseqError::MalformedHeader { header } => write!(f, "malformed header: {header}"),
            HeatseqError::Config(msg) => write!(f, "configuration error: {msg}"),
            HeatseqError::Internal(msg) => write!(f, "internal invariant breach: {msg}"),
        }
    }
}

impl std::error::Error for HeatseqError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeatseqError::IoFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HeatseqError {
    #[inline]
    fn from(value: io::Error) -> Self {
        HeatseqError::IoFailure(value)
    }
}

/// Convenience extension for attaching a file path to an I/O error, mirroring
/// the `map_failed_open` / `map_failed_write` helpers in the teacher's
/// `io/mod.rs`.
pub trait WithPathContext<T> {
    fn path_context(self, path: &PathBuf) -> Result<T, HeatseqError>;
}

impl<T> WithPathContext<T> for io::Result<T> {
    fn path_context(self, path: &PathBuf) -> Result<T, HeatseqError> {
        self.map_err(|e| HeatseqError::IoFailure(io::Error::other(format!("{}: {e}", path.display()))))
    }
}
