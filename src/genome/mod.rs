//! Random-access reader over the compact genome file (§3 "GenomeStore",
//! §4.2, §6 "Compact genome file format" — component L2).

mod store;

pub use store::GenomeStore;
