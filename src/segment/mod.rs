//! Immutable on-disk segments: writing, reading, and merging.
//!
//! A segment directory holds the term dictionary (`terms.fst`), per-term
//! statistics (`term.stats`), the positional parent-ordinal store
//! (`parents.bin`), and `meta.json`. Segments are written once, then only
//! read; growth happens by writing new segments and merging.

pub mod merge;
pub mod reader;
pub mod types;
pub mod writer;

pub use merge::{MergeResult, OrdinalMap, merge_segments, open_segments};
pub use reader::SegmentReader;
pub use types::{INVALID_ORDINAL, Ordinal, SegmentMeta, TermStats};
pub use writer::SegmentWriter;
