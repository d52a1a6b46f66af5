//! Probe definitions and the k-mer inverted index (§3, §4.4 — component L4).

mod index;
mod source;
mod types;

pub use index::ProbeIndex;
pub use source::{InMemoryProbeSource, ProbeSource, TsvProbeSource};
pub use types::{MatchStrand, Probe, ProbeReference, Strand};
