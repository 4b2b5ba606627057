//! Memory-mapped access to an immutable segment.
//!
//! Readers validate magics, versions, and counts on open; any mismatch is
//! corruption, never a silent truncation. An open reader is safe to share
//! across threads.

use crate::error::{Error, Result};
use crate::fst::reader::Fst;
use crate::fst::stream::FstStream;
use crate::segment::types::*;
use crate::taxonomy::arrays::ParentSource;
use crate::utils::{decode_varint, decode_varint_u64, read_u32_le, read_u64_le};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte length of the (magic, version, count) header on binary files
const HEADER_LEN: usize = 16;

/// Read-only view of one segment directory.
pub struct SegmentReader {
    #[allow(dead_code)]
    dir: PathBuf,
    pub meta: SegmentMeta,
    terms: Fst<TermOutput>,
    stats: Mmap,
    parents: Mmap,
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("dir", &self.dir)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl SegmentReader {
    /// Open a segment directory, validating every file header.
    pub fn open(dir: &Path) -> Result<Self> {
        let meta_file = File::open(dir.join(META_FILE))?;
        let meta: SegmentMeta = serde_json::from_reader(meta_file)?;
        if meta.version != SEGMENT_VERSION {
            return Err(Error::corrupt(
                0,
                format!("unsupported segment version {}", meta.version),
            ));
        }

        let terms = Fst::open(&dir.join(TERMS_FILE))?;
        if terms.len() != meta.term_count {
            return Err(Error::corrupt(
                0,
                format!(
                    "term dictionary holds {} terms, metadata says {}",
                    terms.len(),
                    meta.term_count
                ),
            ));
        }

        let stats = Self::map_checked(&dir.join(STATS_FILE), STATS_MAGIC, meta.term_count)?;
        let parents = Self::map_checked(&dir.join(PARENTS_FILE), PARENTS_MAGIC, meta.term_count)?;
        if parents.len() - HEADER_LEN < meta.term_count as usize * 4 {
            return Err(Error::corrupt(
                HEADER_LEN as u64,
                "parents file too short for its term count",
            ));
        }

        debug!(dir = %dir.display(), terms = meta.term_count, "segment opened");
        Ok(Self {
            dir: dir.to_path_buf(),
            meta,
            terms,
            stats,
            parents,
        })
    }

    /// Map a binary file and validate its (magic, version, count) header.
    fn map_checked(path: &Path, magic: u32, term_count: u64) -> Result<Mmap> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        if map.len() < HEADER_LEN {
            return Err(Error::corrupt(0, "truncated file header"));
        }
        let found = read_u32_le(&map, 0).unwrap_or(0);
        if found != magic {
            return Err(Error::corrupt(0, "bad file magic"));
        }
        let version = read_u32_le(&map, 4).unwrap_or(0);
        if version != SEGMENT_VERSION {
            return Err(Error::corrupt(4, format!("unsupported version {version}")));
        }
        let count = read_u64_le(&map, 8).unwrap_or(0);
        if count != term_count {
            return Err(Error::corrupt(
                8,
                format!("file covers {count} terms, metadata says {term_count}"),
            ));
        }
        Ok(map)
    }

    pub fn term_count(&self) -> u64 {
        self.meta.term_count
    }

    /// Exact lookup: the term's ordinal and statistics.
    pub fn get(&self, term: &[u8]) -> Result<Option<(Ordinal, TermStats)>> {
        let Some(output) = self.terms.get(term)? else {
            return Ok(None);
        };
        let ordinal = output.first.0 as Ordinal;
        let stats = self.stats_at(output.second.0)?;
        Ok(Some((ordinal, stats)))
    }

    /// Ordinal of `term`, without touching the statistics file.
    pub fn ordinal(&self, term: &[u8]) -> Result<Option<Ordinal>> {
        Ok(self
            .terms
            .get(term)?
            .map(|output| output.first.0 as Ordinal))
    }

    /// Decode the statistics record at `offset` (relative to the record
    /// region).
    pub(crate) fn stats_at(&self, offset: u64) -> Result<TermStats> {
        let payload = &self.stats[HEADER_LEN..];
        let mut pos = offset as usize;
        if pos >= payload.len() {
            return Err(Error::corrupt(offset, "statistics record past end of file"));
        }
        let (doc_freq, consumed) = decode_varint(&payload[pos..])
            .ok_or_else(|| Error::corrupt(offset, "truncated statistics record"))?;
        pos += consumed;
        let (total_term_freq, _) = decode_varint_u64(&payload[pos..])
            .ok_or_else(|| Error::corrupt(offset, "truncated statistics record"))?;
        Ok(TermStats {
            doc_freq,
            total_term_freq,
        })
    }

    /// Ordered stream over the segment's terms.
    pub fn terms(&self) -> FstStream<'_, TermOutput> {
        self.terms.stream()
    }

    /// The underlying term dictionary.
    pub fn term_dict(&self) -> &Fst<TermOutput> {
        &self.terms
    }
}

impl ParentSource for SegmentReader {
    fn parent_of(&self, ordinal: Ordinal) -> Result<Ordinal> {
        if ordinal as u64 >= self.meta.term_count {
            return Err(Error::MissingParent(ordinal));
        }
        let offset = HEADER_LEN + ordinal as usize * 4;
        read_u32_le(&self.parents, offset).ok_or(Error::MissingParent(ordinal))
    }
}
