pub mod paired_reads;
pub mod whichever;
