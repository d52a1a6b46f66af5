//! Output assembly, the BAM sink, and side channels (§4.7, §6 — component
//! L7).

mod assembler;
mod side_channels;
mod sink;
mod types;

pub use assembler::OutputAssembler;
pub use side_channels::{NullSideChannels, SideChannelWriter, TsvSideChannelPaths, TsvSideChannels};
pub use sink::{BamRecordSink, HtslibBamSink};
pub use types::{MateSlot, OutputPair, OutputRecord};
