//! Incremental construction of minimized automatons.
//!
//! Keys arrive in strictly increasing byte order. The builder keeps one
//! unfinished node per byte of the key currently being extended (the
//! frontier). When the shared prefix with the next key shrinks, every node
//! below the new prefix can never gain another arc and is frozen into the
//! arena. Frozen nodes are deduplicated by the exact bytes of their
//! encoding, so two keys ending in the same suffix share one node chain -
//! the core size reduction of the structure.
//!
//! Outputs are factored as nodes freeze: the shared prefix of the arc
//! outputs leaving a node is pulled up onto the incoming arc, and only the
//! divergent remainder stays on each child arc.

use crate::error::{Error, Result};
use crate::fst::arena::ByteArena;
use crate::fst::outputs::Output;
use crate::fst::reader::Fst;
use crate::fst::types::*;
use crate::utils::encode_varint;
use ahash::RandomState;
use rustc_hash::FxHashMap;
use std::hash::BuildHasher;
use tracing::debug;

/// An arc of a node still on the frontier. `target` is `None` while the
/// arc leads into the frontier (only ever true of a node's last arc) and
/// holds the frozen target once the subtree below has been compiled.
struct UnfinishedArc<T: Output> {
    label: u8,
    output: T,
    target: Option<FrozenNode<T>>,
}

/// A compiled subtree: its arena address plus the finality the incoming
/// arc must record. `NO_ADDRESS` marks a node with no outgoing arcs.
struct FrozenNode<T: Output> {
    addr: NodeAddr,
    is_final: bool,
    final_output: T,
}

/// One frontier entry per byte-depth of the key being extended.
struct UnfinishedNode<T: Output> {
    arcs: Vec<UnfinishedArc<T>>,
    is_final: bool,
    final_output: T,
}

impl<T: Output> UnfinishedNode<T> {
    fn new() -> Self {
        Self {
            arcs: Vec::new(),
            is_final: false,
            final_output: T::no_output(),
        }
    }

    /// Prepend `prefix` to every output leaving or ending at this node.
    fn prepend_output(&mut self, prefix: &T) {
        if prefix.is_no_output() {
            return;
        }
        for arc in &mut self.arcs {
            arc.output = prefix.add(&arc.output);
        }
        if self.is_final {
            self.final_output = prefix.add(&self.final_output);
        }
    }
}

/// Builds a minimized automaton from strictly increasing (key, output)
/// pairs.
///
/// `finish` consumes the builder, so no further keys can be added once the
/// automaton exists.
pub struct FstBuilder<T: Output> {
    arena: ByteArena,
    /// Dedup register: digest of a frozen node's encoding to candidate
    /// (address, length) pairs, compared byte-exact on digest collision.
    register: FxHashMap<u64, Vec<(u32, u32)>>,
    hasher: RandomState,
    frontier: Vec<UnfinishedNode<T>>,
    last_key: Vec<u8>,
    key_count: u64,
    frozen_nodes: u64,
    empty_output: Option<T>,
    scratch: Vec<u8>,
}

impl<T: Output> FstBuilder<T> {
    pub fn new() -> Self {
        let mut arena = ByteArena::new();
        // Reserve offset 0 so NO_ADDRESS never names a real node.
        arena.allocate(1);
        Self {
            arena,
            register: FxHashMap::default(),
            // Fixed seeds keep node digests deterministic across runs
            hasher: RandomState::with_seeds(
                0x243f_6a88_85a3_08d3,
                0x1319_8a2e_0370_7344,
                0xa409_3822_299f_31d0,
                0x082e_fa98_ec4e_6c89,
            ),
            frontier: vec![UnfinishedNode::new()],
            last_key: Vec::new(),
            key_count: 0,
            frozen_nodes: 0,
            empty_output: None,
            scratch: Vec::new(),
        }
    }

    /// Insert the next key. Keys must arrive in strictly increasing
    /// lexicographic order; anything else is rejected, never reordered.
    pub fn add(&mut self, key: &[u8], output: T) -> Result<()> {
        if self.key_count > 0 && key <= self.last_key.as_slice() {
            return Err(Error::OutOfOrderKey(
                String::from_utf8_lossy(key).into_owned(),
            ));
        }
        if key.is_empty() {
            // Only reachable as the very first key; its value lives beside
            // the automaton rather than on an arc.
            self.empty_output = Some(output);
            self.key_count += 1;
            self.last_key.clear();
            return Ok(());
        }

        let prefix_len = common_prefix_len(&self.last_key, key);
        self.freeze_tail(prefix_len)?;

        // Lay down the new suffix on the frontier.
        for depth in prefix_len..key.len() {
            self.frontier[depth].arcs.push(UnfinishedArc {
                label: key[depth],
                output: T::no_output(),
                target: None,
            });
            self.frontier.push(UnfinishedNode::new());
        }
        let deepest = self.frontier.len() - 1;
        self.frontier[deepest].is_final = true;

        // Push the new output down the shared prefix: each shared arc keeps
        // only what it has in common with the new value, and the remainder
        // moves into the node below so earlier keys keep their sums.
        let mut rest = output;
        for depth in 1..=prefix_len {
            let (head, tail) = self.frontier.split_at_mut(depth);
            let parent = &mut head[depth - 1];
            let node = &mut tail[0];
            let last = parent.arcs.len() - 1;
            let arc = &mut parent.arcs[last];

            let shared = arc.output.common(&rest);
            let push_down = arc.output.subtract(&shared);
            arc.output = shared.clone();
            node.prepend_output(&push_down);
            rest = rest.subtract(&shared);
        }
        // The first arc of the fresh suffix carries whatever is left.
        let node = &mut self.frontier[prefix_len];
        let last = node.arcs.len() - 1;
        node.arcs[last].output = rest;

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.key_count += 1;
        Ok(())
    }

    /// Freeze every frontier node deeper than `prefix_len`; they can no
    /// longer gain arcs. Deepest first, so each arc of a node being frozen
    /// already has a compiled target.
    fn freeze_tail(&mut self, prefix_len: usize) -> Result<()> {
        while self.frontier.len() > prefix_len + 1 {
            let node = match self.frontier.pop() {
                Some(node) => node,
                None => break,
            };
            let frozen = self.compile_node(node)?;
            let idx = self.frontier.len() - 1;
            let parent = &mut self.frontier[idx];
            let last = parent.arcs.len() - 1;
            parent.arcs[last].target = Some(frozen);
        }
        Ok(())
    }

    /// Serialize a node's arcs and deduplicate against previously frozen
    /// nodes with the identical encoding.
    fn compile_node(&mut self, node: UnfinishedNode<T>) -> Result<FrozenNode<T>> {
        if node.arcs.is_empty() {
            return Ok(FrozenNode {
                addr: NO_ADDRESS,
                is_final: node.is_final,
                final_output: node.final_output,
            });
        }

        self.scratch.clear();
        let last_idx = node.arcs.len() - 1;
        for (i, arc) in node.arcs.iter().enumerate() {
            let target = arc
                .target
                .as_ref()
                .expect("child nodes are frozen before their parent");

            let mut flags = 0u8;
            if i == last_idx {
                flags |= BIT_LAST_ARC;
            }
            if target.is_final {
                flags |= BIT_FINAL_ARC;
            }
            if target.addr == NO_ADDRESS {
                flags |= BIT_STOP_NODE;
            }
            if !arc.output.is_no_output() {
                flags |= BIT_HAS_OUTPUT;
            }
            if !target.final_output.is_no_output() {
                flags |= BIT_HAS_FINAL_OUTPUT;
            }

            self.scratch.push(flags);
            self.scratch.push(arc.label);
            if flags & BIT_HAS_OUTPUT != 0 {
                arc.output.write(&mut self.scratch);
            }
            if flags & BIT_HAS_FINAL_OUTPUT != 0 {
                target.final_output.write(&mut self.scratch);
            }
            if flags & BIT_STOP_NODE == 0 {
                encode_varint(target.addr, &mut self.scratch);
            }
        }

        // Suffix sharing: identical encodings are the same node. Equality
        // is over the exact serialized bytes (labels, outputs, absolute
        // target offsets), which is what keeps the probe cheap.
        let digest = self.hasher.hash_one(self.scratch.as_slice());
        if let Some(candidates) = self.register.get(&digest) {
            for &(addr, len) in candidates {
                if len as usize == self.scratch.len()
                    && self.arena.slice(addr, len as usize) == self.scratch.as_slice()
                {
                    return Ok(FrozenNode {
                        addr,
                        is_final: node.is_final,
                        final_output: node.final_output,
                    });
                }
            }
        }

        let addr = self.arena.append(&self.scratch);
        self.frozen_nodes += 1;
        self.register
            .entry(digest)
            .or_default()
            .push((addr, self.scratch.len() as u32));
        Ok(FrozenNode {
            addr,
            is_final: node.is_final,
            final_output: node.final_output,
        })
    }

    /// Freeze everything left, fix the start node, and produce the
    /// finished automaton.
    ///
    /// Returns `None` when no keys were ever added. A lone empty key is a
    /// different case: it yields an automaton whose value sits in the
    /// empty-output slot.
    pub fn finish(self) -> Result<Option<Fst<T>>> {
        Ok(self.finish_with_stats()?.0)
    }

    /// Like [`finish`](Self::finish), but also reports construction
    /// statistics.
    pub fn finish_with_stats(mut self) -> Result<(Option<Fst<T>>, BuilderStats)> {
        if self.key_count == 0 {
            let stats = BuilderStats {
                key_count: 0,
                frozen_nodes: 0,
                bytes: 0,
            };
            return Ok((None, stats));
        }
        self.freeze_tail(0)?;
        let root = match self.frontier.pop() {
            Some(node) => node,
            None => UnfinishedNode::new(),
        };
        let start = if root.arcs.is_empty() {
            NO_ADDRESS
        } else {
            self.compile_node(root)?.addr
        };
        self.arena.trim_to_size();
        let stats = BuilderStats {
            key_count: self.key_count,
            frozen_nodes: self.frozen_nodes,
            bytes: self.arena.len(),
        };
        debug!(
            keys = stats.key_count,
            nodes = stats.frozen_nodes,
            bytes = stats.bytes,
            "automaton finished"
        );
        let fst = Fst::from_parts(
            self.arena.into_bytes(),
            start,
            self.empty_output,
            self.key_count,
        )?;
        Ok((Some(fst), stats))
    }

    /// Number of keys added so far.
    pub fn key_count(&self) -> u64 {
        self.key_count
    }
}

/// Construction statistics reported by
/// [`finish_with_stats`](FstBuilder::finish_with_stats).
#[derive(Debug, Clone, Copy)]
pub struct BuilderStats {
    pub key_count: u64,
    /// Distinct frozen nodes written; deduplicated (suffix-shared) nodes
    /// are not counted twice.
    pub frozen_nodes: u64,
    /// Size of the encoded automaton.
    pub bytes: usize,
}

impl<T: Output> Default for FstBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the shared prefix of two byte strings
#[inline]
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::outputs::IntOutput;

    fn build(pairs: &[(&[u8], u64)]) -> Fst<IntOutput> {
        let mut builder = FstBuilder::new();
        for &(key, value) in pairs {
            builder.add(key, IntOutput(value)).unwrap();
        }
        builder.finish().unwrap().unwrap()
    }

    #[test]
    fn test_rejects_out_of_order_keys() {
        let mut builder = FstBuilder::new();
        builder.add(b"beta", IntOutput(1)).unwrap();
        let err = builder.add(b"alpha", IntOutput(2)).unwrap_err();
        assert!(matches!(err, Error::OutOfOrderKey(_)));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let mut builder = FstBuilder::new();
        builder.add(b"same", IntOutput(1)).unwrap();
        let err = builder.add(b"same", IntOutput(2)).unwrap_err();
        assert!(matches!(err, Error::OutOfOrderKey(_)));
    }

    #[test]
    fn test_no_keys_yields_no_automaton() {
        let builder: FstBuilder<IntOutput> = FstBuilder::new();
        assert!(builder.finish().unwrap().is_none());
    }

    #[test]
    fn test_lone_empty_key_is_an_automaton() {
        let mut builder = FstBuilder::new();
        builder.add(b"", IntOutput(7)).unwrap();
        let fst = builder.finish().unwrap().unwrap();
        assert_eq!(fst.get(b"").unwrap(), Some(IntOutput(7)));
        assert_eq!(fst.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_prefix_chain_outputs() {
        let fst = build(&[(b"an", 1), (b"ant", 2), (b"anteater", 3)]);
        assert_eq!(fst.get(b"an").unwrap(), Some(IntOutput(1)));
        assert_eq!(fst.get(b"ant").unwrap(), Some(IntOutput(2)));
        assert_eq!(fst.get(b"ante").unwrap(), None);
        assert_eq!(fst.get(b"anteater").unwrap(), Some(IntOutput(3)));
        assert_eq!(fst.get(b"a").unwrap(), None);
        assert_eq!(fst.get(b"anteaters").unwrap(), None);
    }

    #[test]
    fn test_suffix_sharing_reduces_node_count() {
        // "bat" and "cat" share the "at" suffix; "bat" and "cod" share
        // nothing. The shared build must freeze fewer distinct nodes.
        let mut shared = FstBuilder::new();
        shared.add(b"bat", IntOutput(1)).unwrap();
        shared.add(b"cat", IntOutput(1)).unwrap();
        let (_, shared_stats) = shared.finish_with_stats().unwrap();

        let mut disjoint = FstBuilder::new();
        disjoint.add(b"bat", IntOutput(1)).unwrap();
        disjoint.add(b"cod", IntOutput(1)).unwrap();
        let (_, disjoint_stats) = disjoint.finish_with_stats().unwrap();

        assert!(shared_stats.frozen_nodes < disjoint_stats.frozen_nodes);
    }

    #[test]
    fn test_zero_valued_outputs() {
        let fst = build(&[(b"a", 0), (b"b", 5)]);
        assert_eq!(fst.get(b"a").unwrap(), Some(IntOutput(0)));
        assert_eq!(fst.get(b"b").unwrap(), Some(IntOutput(5)));
    }
}
