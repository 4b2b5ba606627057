//! Finite-state-transducer term dictionaries.
//!
//! An automaton maps sorted byte keys to output values while sharing both
//! key prefixes and key suffixes, so large sorted dictionaries compress to
//! a fraction of their raw size and look up in O(key length).
//!
//! - [`arena`] - Growable byte buffer backing the node encoding
//! - [`outputs`] - Pluggable output algebras (integers, bytes, pairs)
//! - [`builder`] - Incremental minimized construction from sorted keys
//! - [`reader`] - Lookup, arc navigation, serialization, mmap loading
//! - [`stream`] - Ordered enumeration with seek

pub mod arena;
pub mod builder;
pub mod outputs;
pub mod reader;
pub mod stream;
pub mod types;

pub use arena::ByteArena;
pub use builder::{BuilderStats, FstBuilder};
pub use outputs::{BytesOutput, IntOutput, Output, PairOutput};
pub use reader::Fst;
pub use stream::FstStream;
pub use types::{FstArc, NO_ADDRESS, NodeAddr};
