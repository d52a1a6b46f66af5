//! Needleman–Wunsch global alignment and CIGAR derivation (§4.3 —
//! component L3).

mod global;
mod scorer;

pub use global::{Alignment, Cigar, CigarOp, GlobalAligner};
pub use scorer::AlignmentScorer;
