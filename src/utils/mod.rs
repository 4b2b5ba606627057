//! Shared utilities.
//!
//! - [`encoding`] - Variable-length integer encoding (varint) and
//!   little-endian slice readers used by the automaton and segment formats

pub mod encoding;

pub use encoding::*;
