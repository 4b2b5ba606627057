//! Arc encoding constants and the decoded arc representation.

use crate::fst::outputs::Output;

/// Address of a node: the arena offset of its first arc.
pub type NodeAddr = u32;

/// Sentinel address meaning "no node". The arena reserves offset 0 with a
/// pad byte so no real node ever lives there.
pub const NO_ADDRESS: NodeAddr = 0;

/// Last arc of its node; terminates an arc scan.
pub const BIT_LAST_ARC: u8 = 1 << 0;
/// A key ending on this arc is accepted.
pub const BIT_FINAL_ARC: u8 = 1 << 1;
/// The target node has no outgoing arcs; no target address is stored.
pub const BIT_STOP_NODE: u8 = 1 << 2;
/// A non-identity output follows the label byte.
pub const BIT_HAS_OUTPUT: u8 = 1 << 3;
/// A non-identity final output follows the output.
pub const BIT_HAS_FINAL_OUTPUT: u8 = 1 << 4;

/// All defined flag bits; anything else in a flags byte is corruption.
pub(crate) const ARC_FLAG_MASK: u8 =
    BIT_LAST_ARC | BIT_FINAL_ARC | BIT_STOP_NODE | BIT_HAS_OUTPUT | BIT_HAS_FINAL_OUTPUT;

/// Magic number for serialized automatons ("TFST" in little-endian)
pub const FST_MAGIC: u32 = 0x5453_4654;

/// Current version of the automaton format
pub const FST_VERSION: u32 = 1;

/// A decoded transition.
///
/// `output` accumulates while traversing the arc; `final_output` is added
/// only when a key ends here. `next` is the address of the following arc in
/// the same node and is meaningless on the last arc.
#[derive(Debug, Clone)]
pub struct FstArc<T: Output> {
    pub label: u8,
    pub flags: u8,
    pub output: T,
    pub final_output: T,
    /// Target node, or [`NO_ADDRESS`] when the target is a stop node.
    pub target: NodeAddr,
    pub next: NodeAddr,
}

impl<T: Output> FstArc<T> {
    #[inline]
    pub fn is_last(&self) -> bool {
        self.flags & BIT_LAST_ARC != 0
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flags & BIT_FINAL_ARC != 0
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        self.flags & BIT_STOP_NODE != 0
    }
}
