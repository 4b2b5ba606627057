//! Parent, children, and sibling ordinal arrays.
//!
//! `parents` is authoritative and loaded from a backing store; `children`
//! and `siblings` are a derived view computable from it in one linear
//! pass. Derivation is deferred until first access behind a one-time
//! initialization guard, so readers that never walk the hierarchy top-down
//! pay nothing, and concurrent readers never observe a partially computed
//! array.

use crate::error::{Error, Result};
use crate::segment::types::{INVALID_ORDINAL, Ordinal};
use std::sync::OnceLock;

/// Positional source of parent ordinals, typically a segment's parents
/// file. Entry `ordinal` must exist for every ordinal in the constructed
/// range; anything else is corruption.
pub trait ParentSource {
    fn parent_of(&self, ordinal: Ordinal) -> Result<Ordinal>;
}

#[derive(Clone, Debug)]
struct DerivedArrays {
    children: Vec<Ordinal>,
    siblings: Vec<Ordinal>,
}

/// Parallel ordinal arrays with copy-on-grow publication.
///
/// Instances are immutable to readers. [`add`](Self::add) consumes the
/// instance and returns the one to adopt - the same instance mutated when
/// the ordinal fits, a grown copy otherwise. Callers publish instances via
/// `Arc` swap; readers holding an old instance keep a valid, internally
/// consistent snapshot.
#[derive(Clone, Debug)]
pub struct TaxonomyArrays {
    /// Physical storage; may exceed `count` after growth.
    parents: Vec<Ordinal>,
    count: usize,
    derived: OnceLock<DerivedArrays>,
}

impl TaxonomyArrays {
    /// Scan `source` for ordinals `[0, count)`.
    pub fn from_source(source: &dyn ParentSource, count: usize) -> Result<Self> {
        let mut parents = vec![INVALID_ORDINAL; count];
        Self::scan(source, &mut parents, 0, count)?;
        Ok(Self {
            parents,
            count,
            derived: OnceLock::new(),
        })
    }

    /// Copy `prior` and scan only the ordinals it does not cover.
    ///
    /// When the prior instance had already derived children/siblings, the
    /// derived arrays are carried over and only their new suffix is
    /// computed.
    pub fn from_prior(
        prior: &TaxonomyArrays,
        source: &dyn ParentSource,
        count: usize,
    ) -> Result<Self> {
        if count < prior.count {
            return Err(Error::InvalidArgument(format!(
                "cannot shrink ordinal range from {} to {count}",
                prior.count
            )));
        }
        let mut parents = vec![INVALID_ORDINAL; count];
        parents[..prior.count].copy_from_slice(&prior.parents[..prior.count]);
        Self::scan(source, &mut parents, prior.count, count)?;

        let arrays = Self {
            parents,
            count,
            derived: OnceLock::new(),
        };
        if let Some(prior_derived) = prior.derived.get() {
            let extended =
                Self::extend_derived(prior_derived, &arrays.parents, prior.count, count);
            let _ = arrays.derived.set(extended);
        }
        Ok(arrays)
    }

    fn scan(
        source: &dyn ParentSource,
        parents: &mut [Ordinal],
        first: usize,
        count: usize,
    ) -> Result<()> {
        for ordinal in first..count {
            let parent = source.parent_of(ordinal as Ordinal)?;
            if ordinal == 0 {
                if parent != INVALID_ORDINAL {
                    return Err(Error::MissingParent(0));
                }
            } else if parent as usize >= ordinal {
                // Includes INVALID_ORDINAL: every non-root ordinal must
                // have a real parent below it
                return Err(Error::MissingParent(ordinal as Ordinal));
            }
            parents[ordinal] = parent;
        }
        Ok(())
    }

    /// Record `parent` for `ordinal` and return the instance to adopt.
    ///
    /// Within current bounds the entry is set in place and `self` is
    /// returned; past the end a grown copy (doubling or more) is returned
    /// while any published clone of the old instance stays readable and
    /// unchanged.
    pub fn add(mut self, ordinal: Ordinal, parent: Ordinal) -> Self {
        debug_assert!(
            parent == INVALID_ORDINAL || parent < ordinal,
            "parent ordinal must precede its child"
        );
        let index = ordinal as usize;
        if index < self.parents.len() {
            self.parents[index] = parent;
            self.count = self.count.max(index + 1);
            if self.derived.get().is_some() {
                // Derived arrays no longer cover the new entry
                self.derived = OnceLock::new();
            }
            return self;
        }

        let grown_len = (index + 1).max(self.parents.len() * 2);
        let mut parents = vec![INVALID_ORDINAL; grown_len];
        parents[..self.count].copy_from_slice(&self.parents[..self.count]);
        parents[index] = parent;
        Self {
            parents,
            count: index + 1,
            derived: OnceLock::new(),
        }
    }

    /// Parent of each ordinal; `parents()[0]` is [`INVALID_ORDINAL`].
    pub fn parents(&self) -> &[Ordinal] {
        &self.parents[..self.count]
    }

    /// Most-recently-added child of each ordinal, or [`INVALID_ORDINAL`].
    pub fn children(&self) -> &[Ordinal] {
        &self.derived().children
    }

    /// Previously-added sibling of each ordinal (the child added to the
    /// same parent just before it), or [`INVALID_ORDINAL`].
    pub fn siblings(&self) -> &[Ordinal] {
        &self.derived().siblings
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn derived(&self) -> &DerivedArrays {
        // Fast path is a lock-free initialized check; at most one thread
        // computes.
        self.derived
            .get_or_init(|| Self::compute_derived(&self.parents, self.count))
    }

    fn compute_derived(parents: &[Ordinal], count: usize) -> DerivedArrays {
        let mut derived = DerivedArrays {
            children: vec![INVALID_ORDINAL; count],
            siblings: vec![INVALID_ORDINAL; count],
        };
        Self::derive_range(&mut derived, parents, 0, count);
        derived
    }

    fn extend_derived(
        prior: &DerivedArrays,
        parents: &[Ordinal],
        covered: usize,
        count: usize,
    ) -> DerivedArrays {
        let mut derived = prior.clone();
        derived.children.resize(count, INVALID_ORDINAL);
        derived.siblings.resize(count, INVALID_ORDINAL);
        Self::derive_range(&mut derived, parents, covered, count);
        derived
    }

    /// One forward pass over `[first, count)`: each ordinal becomes the
    /// newest child of its parent, chaining the previous child as its
    /// sibling.
    fn derive_range(
        derived: &mut DerivedArrays,
        parents: &[Ordinal],
        first: usize,
        count: usize,
    ) {
        for ordinal in first..count {
            let parent = parents[ordinal];
            if parent == INVALID_ORDINAL {
                continue;
            }
            derived.siblings[ordinal] = derived.children[parent as usize];
            derived.children[parent as usize] = ordinal as Ordinal;
        }
    }
}
