//! Ordered enumeration of automaton keys.
//!
//! Depth-first traversal in label order yields keys in exactly the
//! lexicographic order they were inserted. A stream can also be positioned
//! at an arbitrary key, after which it yields every key greater than or
//! equal to that bound.

use crate::error::Result;
use crate::fst::outputs::Output;
use crate::fst::reader::Fst;
use crate::fst::types::{FstArc, NO_ADDRESS, NodeAddr};

/// Cursor over one node: the arc currently taken (if any), the output
/// accumulated up to the node, and an optional pre-positioned arc planted
/// by a seek.
struct Frame<T: Output> {
    node: NodeAddr,
    cur: Option<FstArc<T>>,
    pending: Option<NodeAddr>,
    /// Output accumulated along the path into `node`.
    prefix: T,
}

enum Step {
    Visit(NodeAddr),
    Backtrack { last: bool, next: NodeAddr },
}

/// Streaming cursor over (key, output) pairs in key order.
///
/// Call [`next`](Self::next) until it returns `None`; the yielded key
/// slice is only valid until the following call.
pub struct FstStream<'f, T: Output> {
    fst: &'f Fst<T>,
    stack: Vec<Frame<T>>,
    key: Vec<u8>,
    started: bool,
    emit_empty: bool,
}

impl<'f, T: Output> FstStream<'f, T> {
    pub(crate) fn new(fst: &'f Fst<T>) -> Self {
        Self {
            fst,
            stack: Vec::new(),
            key: Vec::new(),
            started: false,
            emit_empty: fst.empty_output().is_some(),
        }
    }

    pub(crate) fn new_from(fst: &'f Fst<T>, bound: &[u8]) -> Result<Self> {
        if bound.is_empty() {
            return Ok(Self::new(fst));
        }
        let mut stream = Self {
            fst,
            stack: Vec::new(),
            key: Vec::new(),
            started: true,
            // The empty key sorts before any non-empty bound
            emit_empty: false,
        };
        stream.position(bound)?;
        Ok(stream)
    }

    /// Descend along `bound`, leaving the stack positioned so the next
    /// visited arc starts the first key >= `bound`.
    fn position(&mut self, bound: &[u8]) -> Result<()> {
        if self.fst.start() == NO_ADDRESS {
            return Ok(());
        }
        let mut node = self.fst.start();
        let mut prefix = T::no_output();
        for (depth, &byte) in bound.iter().enumerate() {
            // First arc with a label at or past the bound byte
            let mut addr = node;
            let found = loop {
                let arc = self.fst.read_arc(addr)?;
                if arc.label >= byte {
                    break Some((addr, arc));
                }
                if arc.is_last() {
                    break None;
                }
                addr = arc.next;
            };
            let Some((addr, arc)) = found else {
                // Everything under this node sorts below the bound; the
                // frames already on the stack resume at their siblings.
                return Ok(());
            };
            if arc.label > byte || depth == bound.len() - 1 {
                // This arc starts the first candidate at or past the
                // bound: visit it next.
                self.stack.push(Frame {
                    node,
                    cur: None,
                    pending: Some(addr),
                    prefix,
                });
                return Ok(());
            }
            // Exact byte with more bound to match: commit to this arc.
            let out = prefix.add(&arc.output);
            let target = arc.target;
            let stop = arc.is_stop();
            self.stack.push(Frame {
                node,
                cur: Some(arc),
                pending: None,
                prefix,
            });
            self.key.push(byte);
            if stop {
                // The only key through this arc is a strict prefix of the
                // bound; the subtree is exhausted.
                return Ok(());
            }
            node = target;
            prefix = out;
        }
        Ok(())
    }

    /// Advance to the next key in lexicographic order.
    pub fn next(&mut self) -> Result<Option<(&[u8], T)>> {
        if !self.started {
            self.started = true;
            if self.fst.start() != NO_ADDRESS {
                self.stack.push(Frame {
                    node: self.fst.start(),
                    cur: None,
                    pending: None,
                    prefix: T::no_output(),
                });
            }
            if self.emit_empty {
                // The empty key sorts first
                if let Some(output) = self.fst.empty_output().cloned() {
                    return Ok(Some((&self.key, output)));
                }
            }
        }

        loop {
            // Pick the next arc to visit, backtracking exhausted frames.
            let addr = loop {
                let step = match self.stack.last_mut() {
                    None => return Ok(None),
                    Some(frame) => {
                        if let Some(pending) = frame.pending.take() {
                            Step::Visit(pending)
                        } else {
                            match frame.cur.as_ref() {
                                None => Step::Visit(frame.node),
                                Some(prev) => Step::Backtrack {
                                    last: prev.is_last(),
                                    next: prev.next,
                                },
                            }
                        }
                    }
                };
                match step {
                    Step::Visit(addr) => break addr,
                    Step::Backtrack { last, next } => {
                        self.key.pop();
                        if last {
                            self.stack.pop();
                        } else {
                            break next;
                        }
                    }
                }
            };

            let arc = self.fst.read_arc(addr)?;
            let prefix = match self.stack.last() {
                Some(frame) => frame.prefix.clone(),
                None => T::no_output(),
            };
            let out = prefix.add(&arc.output);
            let is_final = arc.is_final();
            let is_stop = arc.is_stop();
            let target = arc.target;
            let final_output = arc.final_output.clone();
            self.key.push(arc.label);
            if let Some(frame) = self.stack.last_mut() {
                frame.cur = Some(arc);
            }
            if !is_stop {
                self.stack.push(Frame {
                    node: target,
                    cur: None,
                    pending: None,
                    prefix: out.clone(),
                });
            }
            if is_final {
                return Ok(Some((&self.key, out.add(&final_output))));
            }
        }
    }
}
