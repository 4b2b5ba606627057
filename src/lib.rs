//! # termfst - Segment-structured term dictionary core
//!
//! termfst is the dictionary/merge layer of a full-text search engine: it
//! builds minimized finite-state transducers over sorted term sets, stores
//! them in immutable on-disk segments next to per-term statistics and
//! parent-ordinal payloads, and merges segments while preserving term
//! order, aggregating statistics, and remapping ordinals.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`fst`] - Automaton construction, lookup, streaming, serialization
//! - [`segment`] - Immutable segment directories and k-way merging
//! - [`taxonomy`] - Hierarchical labels, parallel ordinal arrays, and the
//!   ingestion-side ordinal cache
//! - [`utils`] - Shared encoding helpers
//!
//! ## Quick Start
//!
//! ```ignore
//! use termfst::fst::{FstBuilder, IntOutput};
//!
//! let mut builder = FstBuilder::new();
//! builder.add(b"an", IntOutput(1))?;
//! builder.add(b"ant", IntOutput(2))?;
//! builder.add(b"anteater", IntOutput(3))?;
//! let fst = builder.finish()?.expect("keys were added");
//!
//! assert_eq!(fst.get(b"ant")?, Some(IntOutput(2)));
//! assert_eq!(fst.get(b"ante")?, None);
//! ```
//!
//! ## Concurrency
//!
//! Structures are built by a single writer and immutable afterwards:
//! automatons and open segments are freely shared across threads, parallel
//! ordinal arrays grow by copy-and-republish, and derived views initialize
//! exactly once behind a guard. The ordinal cache is the one deliberately
//! single-writer structure.
//!
//! Tokenization, query evaluation, scoring, and the document store are out
//! of scope; this crate is the layer they sit on.

pub mod error;
pub mod fst;
pub mod segment;
pub mod taxonomy;
pub mod utils;

pub use error::{Error, Result};
