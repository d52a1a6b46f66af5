//! UID and tail extraction (§4.5 — component L5).

mod extractor;

pub use extractor::{ExtractedUid, TrimmedTail, UidExtractor};
