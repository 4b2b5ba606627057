//! Reading side of the automaton: exact lookup, arc navigation, and the
//! self-contained serialized form.
//!
//! The serialized blob is readable without the builder and round-trips
//! byte-exactly: build, serialize, deserialize, and every key looks up to
//! the same value. Blobs can be held in memory or memory-mapped from disk;
//! either way the automaton is immutable and safe to share across threads.

use crate::error::{Error, Result};
use crate::fst::outputs::Output;
use crate::fst::stream::FstStream;
use crate::fst::types::*;
use crate::utils::{decode_varint, decode_varint_u64, encode_varint, encode_varint_u64, read_u32_le};
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Backing bytes: built in memory or mapped from a file.
enum FstBytes {
    Owned(Vec<u8>),
    Mapped { map: Mmap, start: usize, len: usize },
}

impl FstBytes {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        match self {
            FstBytes::Owned(bytes) => bytes,
            FstBytes::Mapped { map, start, len } => &map[*start..*start + *len],
        }
    }
}

/// An immutable, minimized automaton mapping byte keys to outputs.
pub struct Fst<T: Output> {
    bytes: FstBytes,
    start: NodeAddr,
    empty_output: Option<T>,
    key_count: u64,
    /// One slot per possible first label, filled by a single scan of the
    /// start node at construction. Rebuilt with every new `Fst`, never
    /// mutated in place.
    root_arcs: Vec<Option<FstArc<T>>>,
}

impl<T: Output> std::fmt::Debug for Fst<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fst")
            .field("start", &self.start)
            .field("key_count", &self.key_count)
            .finish_non_exhaustive()
    }
}

impl<T: Output> Fst<T> {
    pub(crate) fn from_parts(
        bytes: Vec<u8>,
        start: NodeAddr,
        empty_output: Option<T>,
        key_count: u64,
    ) -> Result<Self> {
        Self::new_inner(FstBytes::Owned(bytes), start, empty_output, key_count)
    }

    fn new_inner(
        bytes: FstBytes,
        start: NodeAddr,
        empty_output: Option<T>,
        key_count: u64,
    ) -> Result<Self> {
        let mut fst = Self {
            bytes,
            start,
            empty_output,
            key_count,
            root_arcs: vec![None; 256],
        };
        if start != NO_ADDRESS {
            if start as usize >= fst.data().len() {
                return Err(Error::corrupt(
                    start as u64,
                    "start node past end of automaton",
                ));
            }
            // Scan the start node exactly once; lookups dispatch on their
            // first byte through this table and skip the scan.
            let mut addr = start;
            loop {
                let arc = fst.read_arc(addr)?;
                let next = arc.next;
                let last = arc.is_last();
                let label = arc.label as usize;
                fst.root_arcs[label] = Some(arc);
                if last {
                    break;
                }
                addr = next;
            }
        }
        Ok(fst)
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Decode the arc at `addr`. Malformed encodings are corruption, never
    /// silently truncated.
    pub fn read_arc(&self, addr: NodeAddr) -> Result<FstArc<T>> {
        let data = self.data();
        let mut pos = addr as usize;
        if pos + 2 > data.len() {
            return Err(Error::corrupt(addr as u64, "arc header past end of automaton"));
        }
        let flags = data[pos];
        pos += 1;
        if flags & !ARC_FLAG_MASK != 0 {
            return Err(Error::corrupt(addr as u64, "unknown arc flag bits"));
        }
        if flags & BIT_STOP_NODE != 0 && flags & BIT_FINAL_ARC == 0 {
            return Err(Error::corrupt(addr as u64, "dead-end arc accepts nothing"));
        }
        let label = data[pos];
        pos += 1;

        let output = if flags & BIT_HAS_OUTPUT != 0 {
            T::read(data, &mut pos)?
        } else {
            T::no_output()
        };
        let final_output = if flags & BIT_HAS_FINAL_OUTPUT != 0 {
            T::read(data, &mut pos)?
        } else {
            T::no_output()
        };

        let target = if flags & BIT_STOP_NODE == 0 {
            let (target, consumed) = decode_varint(&data[pos..])
                .ok_or_else(|| Error::corrupt(pos as u64, "truncated arc target"))?;
            pos += consumed;
            if target == NO_ADDRESS || target as usize >= data.len() {
                return Err(Error::corrupt(addr as u64, "arc target out of range"));
            }
            target
        } else {
            NO_ADDRESS
        };

        Ok(FstArc {
            label,
            flags,
            output,
            final_output,
            target,
            next: pos as NodeAddr,
        })
    }

    /// Scan a node's arcs for `label`. Arcs are label-sorted, so the scan
    /// stops early once past it.
    pub fn find_arc(&self, node: NodeAddr, label: u8) -> Result<Option<FstArc<T>>> {
        let mut addr = node;
        loop {
            let arc = self.read_arc(addr)?;
            if arc.label == label {
                return Ok(Some(arc));
            }
            if arc.label > label || arc.is_last() {
                return Ok(None);
            }
            addr = arc.next;
        }
    }

    /// Exact lookup: follow one arc per key byte, summing outputs. The key
    /// is present only if the last arc accepts.
    pub fn get(&self, key: &[u8]) -> Result<Option<T>> {
        let Some((&first, rest)) = key.split_first() else {
            return Ok(self.empty_output.clone());
        };
        let Some(mut arc) = self.root_arcs[first as usize].clone() else {
            return Ok(None);
        };
        let mut out = arc.output.clone();
        for &label in rest {
            if arc.is_stop() {
                return Ok(None);
            }
            arc = match self.find_arc(arc.target, label)? {
                Some(next) => next,
                None => return Ok(None),
            };
            out = out.add(&arc.output);
        }
        if arc.is_final() {
            Ok(Some(out.add(&arc.final_output)))
        } else {
            Ok(None)
        }
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Cached arc for a first byte, or None when no key starts with it.
    pub fn root_arc(&self, label: u8) -> Option<&FstArc<T>> {
        self.root_arcs[label as usize].as_ref()
    }

    /// Address of the start node; [`NO_ADDRESS`] when the automaton holds
    /// at most the empty key.
    pub fn start(&self) -> NodeAddr {
        self.start
    }

    /// Output stored for the empty key, if it was added.
    pub fn empty_output(&self) -> Option<&T> {
        self.empty_output.as_ref()
    }

    /// Number of keys in the automaton.
    pub fn len(&self) -> u64 {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Size of the encoded node region in bytes.
    pub fn num_bytes(&self) -> usize {
        self.data().len()
    }

    /// Ordered enumeration of all keys.
    pub fn stream(&self) -> FstStream<'_, T> {
        FstStream::new(self)
    }

    /// Ordered enumeration starting at the first key greater than or equal
    /// to `bound`.
    pub fn stream_from(&self, bound: &[u8]) -> Result<FstStream<'_, T>> {
        FstStream::new_from(self, bound)
    }

    /// Serialize the automaton: magic, version, empty-output slot, key
    /// count, start address, and the node region. Self-contained - enough
    /// to reconstruct every arc without the builder.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&FST_MAGIC.to_le_bytes())?;
        writer.write_all(&FST_VERSION.to_le_bytes())?;
        let mut header = Vec::new();
        match &self.empty_output {
            Some(output) => {
                header.push(1);
                output.write(&mut header);
            }
            None => header.push(0),
        }
        encode_varint_u64(self.key_count, &mut header);
        encode_varint(self.start, &mut header);
        encode_varint_u64(self.data().len() as u64, &mut header);
        writer.write_all(&header)?;
        writer.write_all(self.data())?;
        Ok(())
    }

    /// Deserialize from an in-memory blob produced by
    /// [`write_to`](Self::write_to).
    pub fn read_from(bytes: &[u8]) -> Result<Self> {
        let parsed = Self::parse_header(bytes)?;
        let body = bytes[parsed.body_start..parsed.body_start + parsed.body_len].to_vec();
        Self::new_inner(
            FstBytes::Owned(body),
            parsed.start,
            parsed.empty_output,
            parsed.key_count,
        )
    }

    /// Memory-map a serialized automaton from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        let parsed = Self::parse_header(&map)?;
        let fst = Self::new_inner(
            FstBytes::Mapped {
                map,
                start: parsed.body_start,
                len: parsed.body_len,
            },
            parsed.start,
            parsed.empty_output,
            parsed.key_count,
        )?;
        debug!(path = %path.display(), keys = fst.key_count, "automaton opened");
        Ok(fst)
    }

    fn parse_header(data: &[u8]) -> Result<ParsedHeader<T>> {
        let magic = read_u32_le(data, 0)
            .ok_or_else(|| Error::corrupt(0, "truncated automaton header"))?;
        if magic != FST_MAGIC {
            return Err(Error::corrupt(0, "bad automaton magic"));
        }
        let version = read_u32_le(data, 4)
            .ok_or_else(|| Error::corrupt(4, "truncated automaton header"))?;
        if version != FST_VERSION {
            return Err(Error::corrupt(
                4,
                format!("unsupported automaton version {version}"),
            ));
        }

        let mut pos = 8;
        let empty_output = match data.get(pos) {
            Some(0) => {
                pos += 1;
                None
            }
            Some(1) => {
                pos += 1;
                Some(T::read(data, &mut pos)?)
            }
            _ => return Err(Error::corrupt(pos as u64, "bad empty-output marker")),
        };

        let (key_count, consumed) = decode_varint_u64(&data[pos..])
            .ok_or_else(|| Error::corrupt(pos as u64, "truncated key count"))?;
        pos += consumed;
        let (start, consumed) = decode_varint(&data[pos..])
            .ok_or_else(|| Error::corrupt(pos as u64, "truncated start address"))?;
        pos += consumed;
        let (body_len, consumed) = decode_varint_u64(&data[pos..])
            .ok_or_else(|| Error::corrupt(pos as u64, "truncated body length"))?;
        pos += consumed;

        let body_len = body_len as usize;
        if pos + body_len > data.len() {
            return Err(Error::corrupt(pos as u64, "automaton body past end of file"));
        }
        Ok(ParsedHeader {
            empty_output,
            key_count,
            start,
            body_start: pos,
            body_len,
        })
    }
}

struct ParsedHeader<T: Output> {
    empty_output: Option<T>,
    key_count: u64,
    start: NodeAddr,
    body_start: usize,
    body_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::builder::FstBuilder;
    use crate::fst::outputs::{IntOutput, PairOutput};

    fn sample() -> Fst<IntOutput> {
        let mut builder = FstBuilder::new();
        for (i, key) in [&b"ant"[..], b"bee", b"beetle", b"wasp"].iter().enumerate() {
            builder.add(key, IntOutput(i as u64 + 10)).unwrap();
        }
        builder.finish().unwrap().unwrap()
    }

    #[test]
    fn test_root_arc_cache() {
        let fst = sample();
        assert!(fst.root_arc(b'a').is_some());
        assert!(fst.root_arc(b'b').is_some());
        assert!(fst.root_arc(b'w').is_some());
        assert!(fst.root_arc(b'z').is_none());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let fst = sample();
        let mut blob = Vec::new();
        fst.write_to(&mut blob).unwrap();

        let reloaded: Fst<IntOutput> = Fst::read_from(&blob).unwrap();
        assert_eq!(reloaded.len(), fst.len());
        for key in [&b"ant"[..], b"bee", b"beetle", b"wasp"] {
            assert_eq!(reloaded.get(key).unwrap(), fst.get(key).unwrap());
        }
        assert_eq!(reloaded.get(b"bees").unwrap(), None);
        assert_eq!(reloaded.get(b"").unwrap(), None);
    }

    #[test]
    fn test_bad_magic_is_corruption() {
        let fst = sample();
        let mut blob = Vec::new();
        fst.write_to(&mut blob).unwrap();
        blob[0] ^= 0xFF;
        let err = Fst::<IntOutput>::read_from(&blob).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_body_is_corruption() {
        let fst = sample();
        let mut blob = Vec::new();
        fst.write_to(&mut blob).unwrap();
        blob.truncate(blob.len() - 1);
        let err = Fst::<IntOutput>::read_from(&blob).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_pair_valued_lookup() {
        let mut builder = FstBuilder::new();
        builder
            .add(b"doc", PairOutput::new(IntOutput(1), IntOutput(100)))
            .unwrap();
        builder
            .add(b"dot", PairOutput::new(IntOutput(2), IntOutput(250)))
            .unwrap();
        let fst = builder.finish().unwrap().unwrap();

        assert_eq!(
            fst.get(b"doc").unwrap(),
            Some(PairOutput::new(IntOutput(1), IntOutput(100)))
        );
        assert_eq!(
            fst.get(b"dot").unwrap(),
            Some(PairOutput::new(IntOutput(2), IntOutput(250)))
        );
        assert_eq!(fst.get(b"do").unwrap(), None);
    }
}
