//! Segment-level types and on-disk format constants.

use crate::fst::outputs::{IntOutput, PairOutput};
use serde::{Deserialize, Serialize};

/// Dense identifier assigned to each term in insertion order.
pub type Ordinal = u32;

/// Sentinel ordinal: "none" (root parents, unmapped slots).
pub const INVALID_ORDINAL: Ordinal = u32::MAX;

/// Term dictionary file (serialized automaton)
pub const TERMS_FILE: &str = "terms.fst";
/// Per-term statistics records
pub const STATS_FILE: &str = "term.stats";
/// Positional parent-ordinal store
pub const PARENTS_FILE: &str = "parents.bin";
/// Segment metadata
pub const META_FILE: &str = "meta.json";

/// Magic number for term.stats ("TFTS" in little-endian)
pub const STATS_MAGIC: u32 = 0x5354_4654;
/// Magic number for parents.bin ("TFPA" in little-endian)
pub const PARENTS_MAGIC: u32 = 0x4150_4654;

/// Current version of the segment format
pub const SEGMENT_VERSION: u32 = 1;

/// The automaton output attached to each term: its ordinal and the byte
/// offset of its statistics record.
pub type TermOutput = PairOutput<IntOutput, IntOutput>;

/// Aggregated statistics for one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TermStats {
    /// Number of documents containing the term
    pub doc_freq: u32,
    /// Total occurrences across all documents
    pub total_term_freq: u64,
}

impl TermStats {
    pub fn new(doc_freq: u32, total_term_freq: u64) -> Self {
        Self {
            doc_freq,
            total_term_freq,
        }
    }

    /// Statistics for the same term seen in two segments.
    pub fn merged(&self, other: &TermStats) -> TermStats {
        TermStats {
            doc_freq: self.doc_freq + other.doc_freq,
            total_term_freq: self.total_term_freq + other.total_term_freq,
        }
    }
}

/// Segment metadata stored in meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub version: u32,
    pub term_count: u64,
    pub created_at: u64,
}

impl Default for SegmentMeta {
    fn default() -> Self {
        Self {
            version: SEGMENT_VERSION,
            term_count: 0,
            created_at: 0,
        }
    }
}
