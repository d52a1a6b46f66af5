//! Two-bit nucleotide sequences (§3, §4.1 — component L1).

mod packed;

pub use packed::{IupacBase, KmerIter, Nucleotide, PackedSequence};
