//! Arena-backed byte storage.
//!
//! Automaton nodes reference each other through integer byte offsets into a
//! single growable buffer, so the in-memory form matches the serialized
//! on-disk form directly and no pointer graph is needed.

/// Minimum number of bytes reserved when the backing buffer must grow.
const BLOCK_SIZE: usize = 32 * 1024;

/// A growable byte buffer with malloc-style allocation.
///
/// `allocate` hands out regions identified by their start offset. Offsets
/// stay valid across growth because growth copies the whole prefix; only
/// `trim_to_size` (a once-only shrink-to-fit) is expected after allocation
/// ends. Each arena is exclusively owned by a single builder.
pub struct ByteArena {
    bytes: Vec<u8>,
}

impl ByteArena {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Extend the logical length by `n` bytes, zero-filled, and return the
    /// start offset of the new region. Grows the backing buffer by at
    /// least one block when capacity is exceeded.
    pub fn allocate(&mut self, n: usize) -> u32 {
        let start = self.bytes.len();
        if start + n > self.bytes.capacity() {
            self.bytes.reserve(n.max(BLOCK_SIZE));
        }
        self.bytes.resize(start + n, 0);
        start as u32
    }

    /// Append `data` and return the offset of its first byte.
    pub fn append(&mut self, data: &[u8]) -> u32 {
        let start = self.allocate(data.len());
        self.bytes[start as usize..start as usize + data.len()].copy_from_slice(data);
        start
    }

    /// Read one byte. The caller guarantees `index` is within the logical
    /// length.
    #[inline]
    pub fn get(&self, index: u32) -> u8 {
        debug_assert!(
            (index as usize) < self.bytes.len(),
            "arena read past logical length"
        );
        self.bytes[index as usize]
    }

    /// Write one byte into an already-allocated region.
    #[inline]
    pub fn put(&mut self, index: u32, value: u8) {
        debug_assert!(
            (index as usize) < self.bytes.len(),
            "arena write past logical length"
        );
        self.bytes[index as usize] = value;
    }

    /// Borrow `len` bytes starting at `start`.
    #[inline]
    pub fn slice(&self, start: u32, len: usize) -> &[u8] {
        debug_assert!(
            start as usize + len <= self.bytes.len(),
            "arena slice past logical length"
        );
        &self.bytes[start as usize..start as usize + len]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Shrink the backing buffer to the logical length. Meaningful once,
    /// after all allocation is done; no further growth is expected.
    pub fn trim_to_size(&mut self) {
        self.bytes.shrink_to_fit();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for ByteArena {
    fn default() -> Self {
        Self::new()
    }
}
