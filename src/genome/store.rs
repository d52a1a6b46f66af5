//! [`GenomeStore`]: a random-access reader over the compact 2-bit genome file
//! described in §6.
//!
//! File layout, tail to head of parsing (the footer is read first):
//!
//! ```text
//! [ 2-bit-packed container bodies ... ][ UTF-8 container table ][ 8-byte BE i64 table offset ]
//! ```
//!
//! The table is `name\tstart_byte\tstop_byte\n` per container, `start_byte`
//! inclusive and `stop_byte` exclusive. `(stop_byte - start_byte) * 4` must be
//! at least the container's base count; the final partial byte's unused bits
//! are zero.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::HeatseqError;
use crate::sequence::PackedSequence;

struct ContainerEntry {
    name: String,
    start_byte: u64,
    stop_byte: u64,
}

impl ContainerEntry {
    #[inline]
    fn len_in_bases(&self) -> u64 {
        (self.stop_byte - self.start_byte) * 4
    }
}

/// Random-access reader over a compact 2-bit genome file (§3, §4.2).
///
/// Coordinates accepted by [`GenomeStore::fetch`] are 1-based inclusive, per
/// the external API contract in §3. The file handle is serialized behind a
/// [`parking_lot::Mutex`] (§5 "Shared-resource policy": "wrap each fetch with
/// a lock, or maintain per-worker handles" — this crate takes the lock
/// option, since a single `GenomeStore` is shared read-only across the worker
/// pool via `Arc`).
pub struct GenomeStore {
    handle: Mutex<File>,
    containers: Vec<ContainerEntry>,
    index: HashMap<String, usize>,
    largest_idx: Option<usize>,
    largest_cache: RwLock<Option<Arc<PackedSequence>>>,
}

impl GenomeStore {
    /// Opens `path` read-only and parses the footer + container table.
    ///
    /// ## Errors
    ///
    /// Fails if the file cannot be opened, is too small to hold the 8-byte
    /// footer, the footer offset is out of range, or the table is not valid
    /// UTF-8 / well-formed tab-separated data. These are all structural
    /// errors per §7 and are expected to abort pipeline startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HeatseqError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(HeatseqError::IoFailure)?;
        let file_len = file.metadata().map_err(HeatseqError::IoFailure)?.len();

        if file_len < 8 {
            return Err(HeatseqError::Config(format!(
                "genome file {} is too small to contain a footer",
                path.display()
            )));
        }

        file.seek(SeekFrom::End(-8)).map_err(HeatseqError::IoFailure)?;
        let mut footer = [0u8; 8];
        file.read_exact(&mut footer).map_err(HeatseqError::IoFailure)?;
        let table_offset = i64::from_be_bytes(footer);

        if table_offset < 0 || table_offset as u64 > file_len - 8 {
            return Err(HeatseqError::Config(format!(
                "genome file {} has a corrupt table offset footer",
                path.display()
            )));
        }

        let table_len = (file_len - 8 - table_offset as u64) as usize;
        file.seek(SeekFrom::Start(table_offset as u64)).map_err(HeatseqError::IoFailure)?;
        let mut table_bytes = vec![0u8; table_len];
        file.read_exact(&mut table_bytes).map_err(HeatseqError::IoFailure)?;
        let table_text = String::from_utf8(table_bytes)
            .map_err(|_| HeatseqError::Config(format!("genome file {} has a non-UTF-8 container table", path.display())))?;

        let mut containers = Vec::new();
        let mut index = HashMap::new();
        for line in table_text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let (name, start, stop) = match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(start), Some(stop)) => (name, start, stop),
                _ => {
                    return Err(HeatseqError::Config(format!("malformed container table line: {line:?}")));
                }
            };
            let start_byte: u64 = start
                .parse()
                .map_err(|_| HeatseqError::Config(format!("non-numeric start_byte in line: {line:?}")))?;
            let stop_byte: u64 = stop
                .parse()
                .map_err(|_| HeatseqError::Config(format!("non-numeric stop_byte in line: {line:?}")))?;

            index.insert(name.to_string(), containers.len());
            containers.push(ContainerEntry { name: name.to_string(), start_byte, stop_byte });
        }

        let largest_idx = containers
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.stop_byte - c.start_byte)
            .map(|(i, _)| i);

        Ok(GenomeStore {
            handle: Mutex::new(file),
            containers,
            index,
            largest_idx,
            largest_cache: RwLock::new(None),
        })
    }

    /// Container names in table (insertion) order.
    pub fn containers(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.name.as_str()).collect()
    }

    /// Fetches `[start_1based, end_1based]` (inclusive, 1-based) from
    /// `name`. If `start > end` the arguments are swapped first, so
    /// `fetch(c, a, b) == fetch(c, b, a)` (§8 "Genome fetch").
    ///
    /// ## Errors
    ///
    /// [`HeatseqError::UnknownContainer`] if `name` is absent;
    /// [`HeatseqError::OutOfRange`] if `end_1based` exceeds the container's
    /// base count.
    pub fn fetch(&self, name: &str, start_1based: u64, end_1based: u64) -> Result<PackedSequence, HeatseqError> {
        let (start, end) = if start_1based > end_1based {
            (end_1based, start_1based)
        } else {
            (start_1based, end_1based)
        };

        let &idx = self.index.get(name).ok_or_else(|| HeatseqError::UnknownContainer { name: name.to_string() })?;
        let container = &self.containers[idx];
        let container_len = container.len_in_bases();

        if end > container_len || start == 0 {
            return Err(HeatseqError::OutOfRange { container: name.to_string(), end, container_len });
        }

        let base_count = (end - start + 1) as usize;
        let local_base_start = start - 1;

        if Some(idx) == self.largest_idx {
            let cached = self.cached_largest(container)?;
            let base_start = local_base_start as usize;
            return Ok(cached.subsequence(base_start, base_start + base_count));
        }

        self.fetch_from_file(container, local_base_start, base_count)
    }

    fn cached_largest(&self, container: &ContainerEntry) -> Result<Arc<PackedSequence>, HeatseqError> {
        if let Some(cached) = self.largest_cache.read().as_ref() {
            return Ok(Arc::clone(cached));
        }
        let mut guard = self.largest_cache.write();
        if let Some(cached) = guard.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let whole = self.fetch_from_file(container, 0, container.len_in_bases() as usize)?;
        let whole = Arc::new(whole);
        *guard = Some(Arc::clone(&whole));
        Ok(whole)
    }

    fn fetch_from_file(&self, container: &ContainerEntry, local_base_start: u64, base_count: usize) -> Result<PackedSequence, HeatseqError> {
        let bit_start = local_base_start * 2;
        let bit_end = bit_start + base_count as u64 * 2;
        let byte_start = container.start_byte + bit_start / 8;
        let byte_end = container.start_byte + bit_end.div_ceil(8);
        let span_len = (byte_end - byte_start) as usize;

        let mut buf = vec![0u8; span_len];
        {
            let mut handle = self.handle.lock();
            handle.seek(SeekFrom::Start(byte_start)).map_err(HeatseqError::IoFailure)?;
            handle.read_exact(&mut buf).map_err(HeatseqError::IoFailure)?;
        }

        let bit_remainder = (bit_start % 8) as usize;
        let codes = (0..base_count).map(move |i| {
            let bit_index = bit_remainder + i * 2;
            let byte_index = bit_index / 8;
            let shift = 6 - (bit_index % 8);
            (buf[byte_index] >> shift) & 0b11
        });

        Ok(PackedSequence::from_codes(base_count, codes))
    }

    /// Releases the underlying file handle. Dropping a [`GenomeStore`] has
    /// the same effect; this is provided for symmetry with callers that want
    /// an explicit close point.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Writes a minimal genome file with a single container holding `bases`
    /// (must be strict ACGT).
    fn write_test_genome(bases: &[u8]) -> tempfile::TempPath {
        let mut packed = vec![0u8; bases.len().div_ceil(4)];
        for (i, &b) in bases.iter().enumerate() {
            let code = match b {
                b'A' => 0u8,
                b'C' => 1,
                b'G' => 2,
                b'T' => 3,
                _ => panic!("test fixture must be strict ACGT"),
            };
            let bit_index = i * 2;
            packed[bit_index / 8] |= code << (6 - bit_index % 8);
        }

        let body_len = packed.len() as u64;
        let table = format!("chr1\t0\t{body_len}\n");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&packed).unwrap();
        let table_offset = body_len;
        file.write_all(table.as_bytes()).unwrap();
        file.write_all(&table_offset.to_be_bytes()).unwrap();
        file.flush().unwrap();
        file.into_temp_path()
    }

    #[test]
    fn fetch_respects_length_and_swap() {
        let path = write_test_genome(b"ACGTACGTAC");
        let store = GenomeStore::open(&path).unwrap();
        assert_eq!(store.containers(), vec!["chr1"]);

        let fwd = store.fetch("chr1", 2, 5).unwrap();
        assert_eq!(fwd.to_text(), b"CGTA");
        assert_eq!(fwd.len(), 4);

        let swapped = store.fetch("chr1", 5, 2).unwrap();
        assert_eq!(swapped.to_text(), fwd.to_text());
    }

    #[test]
    fn fetch_out_of_range() {
        let path = write_test_genome(b"ACGT");
        let store = GenomeStore::open(&path).unwrap();
        assert!(matches!(store.fetch("chr1", 1, 5), Err(HeatseqError::OutOfRange { .. })));
    }

    #[test]
    fn fetch_unknown_container() {
        let path = write_test_genome(b"ACGT");
        let store = GenomeStore::open(&path).unwrap();
        assert!(matches!(store.fetch("chr2", 1, 2), Err(HeatseqError::UnknownContainer { .. })));
    }

    #[test]
    fn fetch_whole_container_matches_original() {
        let bases: &[u8] = b"ACGTACGTACGTACGTACGT";
        let path = write_test_genome(bases);
        let store = GenomeStore::open(&path).unwrap();
        let whole = store.fetch("chr1", 1, bases.len() as u64).unwrap();
        assert_eq!(whole.to_text(), bases);
    }
}
