//! Output algebras attached to automaton arcs.
//!
//! An output type must factor along shared key prefixes: `common` extracts
//! the largest shared prefix of two outputs, `add` re-attaches a suffix,
//! and `subtract` strips a known prefix. The builder relies on the law
//! `common(a, b).add(&a.subtract(&common(a, b))) == a` to push shared
//! output prefixes toward the root, paying them once per shared path
//! instead of once per key.

use crate::error::{Error, Result};
use crate::utils::{decode_varint, decode_varint_u64, encode_varint, encode_varint_u64};
use std::fmt::Debug;

/// The algebra arc outputs must satisfy.
///
/// Serialization must round-trip bit-exactly: `read(write(v)) == v` for
/// every value producible by the algebra.
pub trait Output: Clone + PartialEq + Debug {
    /// The identity element.
    fn no_output() -> Self;

    fn is_no_output(&self) -> bool;

    /// Largest output that prefixes both `self` and `other`.
    fn common(&self, other: &Self) -> Self;

    /// Append `suffix` to this output (`self` acts as the prefix).
    fn add(&self, suffix: &Self) -> Self;

    /// Strip a known `prefix` from the front of this output.
    fn subtract(&self, prefix: &Self) -> Self;

    fn write(&self, out: &mut Vec<u8>);

    /// Decode a value starting at `*pos`, advancing it past the encoding.
    fn read(data: &[u8], pos: &mut usize) -> Result<Self>;
}

/// Non-negative integer outputs.
///
/// The identity is 0 and `common` is `min`: the shared prefix of two sums
/// is whatever both can afford.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct IntOutput(pub u64);

impl Output for IntOutput {
    fn no_output() -> Self {
        IntOutput(0)
    }

    fn is_no_output(&self) -> bool {
        self.0 == 0
    }

    fn common(&self, other: &Self) -> Self {
        IntOutput(self.0.min(other.0))
    }

    fn add(&self, suffix: &Self) -> Self {
        IntOutput(self.0 + suffix.0)
    }

    fn subtract(&self, prefix: &Self) -> Self {
        debug_assert!(self.0 >= prefix.0, "subtracting a non-prefix");
        IntOutput(self.0 - prefix.0)
    }

    fn write(&self, out: &mut Vec<u8>) {
        encode_varint_u64(self.0, out);
    }

    fn read(data: &[u8], pos: &mut usize) -> Result<Self> {
        let tail = data.get(*pos..).unwrap_or(&[]);
        let (value, consumed) = decode_varint_u64(tail)
            .ok_or_else(|| Error::corrupt(*pos as u64, "truncated integer output"))?;
        *pos += consumed;
        Ok(IntOutput(value))
    }
}

/// Byte-sequence outputs.
///
/// The identity is the empty sequence; `common` is the literal longest
/// common prefix.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct BytesOutput(pub Vec<u8>);

impl Output for BytesOutput {
    fn no_output() -> Self {
        BytesOutput(Vec::new())
    }

    fn is_no_output(&self) -> bool {
        self.0.is_empty()
    }

    fn common(&self, other: &Self) -> Self {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        BytesOutput(self.0[..shared].to_vec())
    }

    fn add(&self, suffix: &Self) -> Self {
        let mut bytes = Vec::with_capacity(self.0.len() + suffix.0.len());
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(&suffix.0);
        BytesOutput(bytes)
    }

    fn subtract(&self, prefix: &Self) -> Self {
        debug_assert!(self.0.starts_with(&prefix.0), "subtracting a non-prefix");
        BytesOutput(self.0[prefix.0.len()..].to_vec())
    }

    fn write(&self, out: &mut Vec<u8>) {
        encode_varint(self.0.len() as u32, out);
        out.extend_from_slice(&self.0);
    }

    fn read(data: &[u8], pos: &mut usize) -> Result<Self> {
        let tail = data.get(*pos..).unwrap_or(&[]);
        let (len, consumed) = decode_varint(tail)
            .ok_or_else(|| Error::corrupt(*pos as u64, "truncated byte output length"))?;
        let start = *pos + consumed;
        let end = start + len as usize;
        if end > data.len() {
            return Err(Error::corrupt(*pos as u64, "byte output past end of data"));
        }
        *pos = end;
        Ok(BytesOutput(data[start..end].to_vec()))
    }
}

/// Component-wise composition of two output algebras.
///
/// A pair of identities *is* the identity: `PairOutput::new(a, b)` with
/// identity components compares equal to `no_output()`, and the derived
/// `Eq`/`Hash` agree, so the normalized identity needs no special casing.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PairOutput<A: Output, B: Output> {
    pub first: A,
    pub second: B,
}

impl<A: Output, B: Output> PairOutput<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Output, B: Output> Output for PairOutput<A, B> {
    fn no_output() -> Self {
        Self::new(A::no_output(), B::no_output())
    }

    fn is_no_output(&self) -> bool {
        self.first.is_no_output() && self.second.is_no_output()
    }

    fn common(&self, other: &Self) -> Self {
        Self::new(
            self.first.common(&other.first),
            self.second.common(&other.second),
        )
    }

    fn add(&self, suffix: &Self) -> Self {
        Self::new(self.first.add(&suffix.first), self.second.add(&suffix.second))
    }

    fn subtract(&self, prefix: &Self) -> Self {
        Self::new(
            self.first.subtract(&prefix.first),
            self.second.subtract(&prefix.second),
        )
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.first.write(out);
        self.second.write(out);
    }

    fn read(data: &[u8], pos: &mut usize) -> Result<Self> {
        let first = A::read(data, pos)?;
        let second = B::read(data, pos)?;
        Ok(Self::new(first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_laws<T: Output>(a: T, b: T) {
        let c = a.common(&b);
        assert_eq!(c.add(&a.subtract(&c)), a);
        assert_eq!(c.add(&b.subtract(&c)), b);
        assert_eq!(a.common(&T::no_output()), T::no_output());
    }

    fn check_roundtrip<T: Output>(value: T) {
        let mut buf = Vec::new();
        value.write(&mut buf);
        let mut pos = 0;
        assert_eq!(T::read(&buf, &mut pos).unwrap(), value);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn test_int_output_laws() {
        check_laws(IntOutput(17), IntOutput(5));
        check_laws(IntOutput(0), IntOutput(9));
        check_laws(IntOutput(42), IntOutput(42));
        assert_eq!(IntOutput(3).common(&IntOutput(7)), IntOutput(3));
        assert_eq!(IntOutput(10).subtract(&IntOutput(4)), IntOutput(6));
    }

    #[test]
    fn test_bytes_output_laws() {
        check_laws(
            BytesOutput(b"compile".to_vec()),
            BytesOutput(b"compute".to_vec()),
        );
        check_laws(BytesOutput(b"abc".to_vec()), BytesOutput(Vec::new()));
        assert_eq!(
            BytesOutput(b"compile".to_vec()).common(&BytesOutput(b"compute".to_vec())),
            BytesOutput(b"comp".to_vec())
        );
    }

    #[test]
    fn test_pair_output_laws() {
        check_laws(
            PairOutput::new(IntOutput(9), BytesOutput(b"abc".to_vec())),
            PairOutput::new(IntOutput(3), BytesOutput(b"abd".to_vec())),
        );
    }

    #[test]
    fn test_pair_identity_is_the_identity() {
        let pair = PairOutput::new(IntOutput::no_output(), BytesOutput::no_output());
        assert_eq!(pair, PairOutput::no_output());
        assert!(pair.is_no_output());
    }

    #[test]
    fn test_serialization_roundtrip() {
        check_roundtrip(IntOutput(0));
        check_roundtrip(IntOutput(u64::MAX));
        check_roundtrip(BytesOutput(Vec::new()));
        check_roundtrip(BytesOutput(b"payload bytes".to_vec()));
        check_roundtrip(PairOutput::new(IntOutput(1 << 40), IntOutput(7)));
        check_roundtrip(PairOutput::new(
            IntOutput(12),
            BytesOutput(b"tail".to_vec()),
        ));
    }

    #[test]
    fn test_truncated_read_is_corruption() {
        let mut buf = Vec::new();
        BytesOutput(b"abcdef".to_vec()).write(&mut buf);
        buf.truncate(3);
        let mut pos = 0;
        let err = BytesOutput::read(&buf, &mut pos).unwrap_err();
        assert!(err.is_corruption());
    }
}
