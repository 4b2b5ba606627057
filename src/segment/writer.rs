//! Writes one immutable segment to a directory.
//!
//! A segment holds a term dictionary (automaton mapping each term to its
//! ordinal and the offset of its statistics record), the variable-length
//! statistics records themselves, and one parent ordinal per term for
//! hierarchical dictionaries. Everything is written on `finish`; a segment
//! is never modified afterwards.

use crate::error::{Error, Result};
use crate::fst::arena::ByteArena;
use crate::fst::builder::FstBuilder;
use crate::fst::outputs::{IntOutput, PairOutput};
use crate::fst::reader::Fst;
use crate::fst::types::NO_ADDRESS;
use crate::segment::types::*;
use crate::utils::{encode_varint, encode_varint_u64};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Accumulates terms in strictly increasing byte order and writes the
/// segment files on [`finish`](Self::finish).
pub struct SegmentWriter {
    dir: PathBuf,
    terms: FstBuilder<TermOutput>,
    /// Variable-length statistics records, addressed by the offsets stored
    /// in the automaton outputs.
    stats: ByteArena,
    parents: Vec<Ordinal>,
    next_ordinal: Ordinal,
    record: Vec<u8>,
}

impl SegmentWriter {
    /// Create a writer for a new segment directory.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            terms: FstBuilder::new(),
            stats: ByteArena::new(),
            parents: Vec::new(),
            next_ordinal: 0,
            record: Vec::new(),
        })
    }

    /// Append the next term and return its ordinal.
    ///
    /// Terms must arrive in strictly increasing byte order. `parent` is
    /// the ordinal of the term's parent label, or [`INVALID_ORDINAL`] for
    /// flat dictionaries and root entries; a parent must have been added
    /// before any of its children.
    pub fn add_term(&mut self, term: &[u8], stats: TermStats, parent: Ordinal) -> Result<Ordinal> {
        let ordinal = self.next_ordinal;
        if parent != INVALID_ORDINAL && parent >= ordinal {
            return Err(Error::InvalidArgument(format!(
                "parent ordinal {parent} does not precede term ordinal {ordinal}"
            )));
        }

        let offset = self.stats.len() as u64;
        self.record.clear();
        encode_varint(stats.doc_freq, &mut self.record);
        encode_varint_u64(stats.total_term_freq, &mut self.record);
        self.stats.append(&self.record);

        self.terms.add(
            term,
            PairOutput::new(IntOutput(ordinal as u64), IntOutput(offset)),
        )?;
        self.parents.push(parent);
        self.next_ordinal += 1;
        Ok(ordinal)
    }

    /// Number of terms added so far.
    pub fn term_count(&self) -> u64 {
        self.next_ordinal as u64
    }

    /// Write all files and the metadata. The segment is immutable once
    /// this returns.
    pub fn finish(mut self) -> Result<SegmentMeta> {
        let term_count = self.next_ordinal as u64;

        let fst = match self.terms.finish()? {
            Some(fst) => fst,
            // Zero terms: an explicitly empty dictionary
            None => Fst::from_parts(vec![0], NO_ADDRESS, None, 0)?,
        };
        let mut terms_file = BufWriter::new(File::create(self.dir.join(TERMS_FILE))?);
        fst.write_to(&mut terms_file)?;
        terms_file.flush()?;

        self.stats.trim_to_size();
        let mut stats_file = BufWriter::new(File::create(self.dir.join(STATS_FILE))?);
        stats_file.write_all(&STATS_MAGIC.to_le_bytes())?;
        stats_file.write_all(&SEGMENT_VERSION.to_le_bytes())?;
        stats_file.write_all(&term_count.to_le_bytes())?;
        stats_file.write_all(self.stats.as_bytes())?;
        stats_file.flush()?;

        let mut parents_file = BufWriter::new(File::create(self.dir.join(PARENTS_FILE))?);
        parents_file.write_all(&PARENTS_MAGIC.to_le_bytes())?;
        parents_file.write_all(&SEGMENT_VERSION.to_le_bytes())?;
        parents_file.write_all(&term_count.to_le_bytes())?;
        for &parent in &self.parents {
            parents_file.write_all(&parent.to_le_bytes())?;
        }
        parents_file.flush()?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let meta = SegmentMeta {
            version: SEGMENT_VERSION,
            term_count,
            created_at: now,
        };
        let meta_file = File::create(self.dir.join(META_FILE))?;
        serde_json::to_writer_pretty(meta_file, &meta)?;

        debug!(term_count, dir = %self.dir.display(), "segment written");
        Ok(meta)
    }
}
