use std::{fmt::Display, ops::Range, sync::Arc};

// Payloads are a window over an `Arc<[u8]>`. Segments on the retransmission
// queue and the copies handed to the network share one allocation, so
// retransmitting never copies bytes.

/// An immutable, cheaply clonable run of segment bytes.
#[derive(Debug, Clone)]
pub struct Payload {
    start: usize,
    end: usize,
    bytes: Arc<[u8]>,
}

impl Payload {
    /// Returns a payload containing the given bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            start: 0,
            end: bytes.len(),
            bytes,
        }
    }

    /// A payload with no bytes.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the underlying bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.start..self.end]
    }

    /// The number of bytes in the payload.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the payload contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a payload over a sub-range of this one. The bytes are shared,
    /// not copied.
    ///
    /// # Panics
    ///
    /// Panics if the range reaches past the end of the payload.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && range.end <= self.len());
        Self {
            start: self.start + range.start,
            end: self.start + range.end,
            bytes: self.bytes.clone(),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Payload {}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.as_slice() {
            write!(f, "{byte:x} ")?;
        }
        Ok(())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(vector: Vec<u8>) -> Self {
        Self::new(vector)
    }
}

impl From<&[u8]> for Payload {
    fn from(slice: &[u8]) -> Self {
        Self::new(slice)
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(array: &[u8; N]) -> Self {
        array.as_slice().into()
    }
}

impl From<&str> for Payload {
    fn from(string: &str) -> Self {
        string.as_bytes().into()
    }
}
