//! Hierarchical label support: composite labels, parallel ordinal arrays,
//! and the ingestion-side ordinal cache.
//!
//! - [`label`] - Composite path labels and their canonical byte encoding
//! - [`arrays`] - Parent/children/sibling arrays with lazy derivation and
//!   copy-on-grow publication
//! - [`cache`] - Bounded label-to-ordinal LRU cache with bulk eviction

pub mod arrays;
pub mod cache;
pub mod label;

pub use arrays::{ParentSource, TaxonomyArrays};
pub use cache::OrdinalCache;
pub use label::FacetLabel;
