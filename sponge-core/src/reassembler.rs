//! Reassembly of out-of-order, possibly overlapping substrings into an
//! ordered byte stream.
//!
//! Substrings are indexed by the absolute position of their first byte. Bytes
//! that continue the assembled prefix are written straight into the output
//! [`ByteStream`]; bytes that arrive ahead of a gap are held as pending
//! fragments until the gap fills. Pending fragments never overlap one
//! another, and the pending bytes plus the bytes buffered in the output never
//! exceed the capacity.

use crate::byte_stream::ByteStream;
use std::collections::BTreeMap;


/// Assembles substrings into an in-order byte stream.
#[derive(Debug, Clone)]
pub struct Reassembler {
    output: ByteStream,
    capacity: usize,
    /// Fragments waiting for the gap before them to fill, keyed by the
    /// absolute index of their first byte
    pending: BTreeMap<u64, Vec<u8>>,
    /// The total length of all pending fragments
    pending_bytes: usize,
    /// The index of the first byte not yet written to the output
    next_index: u64,
    /// The index one past the last byte of the stream, once known
    eof_index: Option<u64>,
}

/// How a stored fragment relates to an incoming range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    /// The fragment lies entirely within the incoming range
    Covered,
    /// The fragment contains the entire incoming range
    Covering,
    /// The fragment starts before the incoming range and ends inside it
    Left,
    /// The fragment starts inside the incoming range and ends after it
    Right,
}

impl Overlap {
    /// Classifies the fragment `[frag_start, frag_end)` against the incoming
    /// range `[start, end)`. The two ranges must intersect.
    fn classify(frag_start: u64, frag_end: u64, start: u64, end: u64) -> Self {
        match (frag_start <= start, frag_end >= end) {
            (true, true) => Overlap::Covering,
            (false, false) => Overlap::Covered,
            (true, false) => {
                if frag_start == start {
                    Overlap::Covered
                } else {
                    Overlap::Left
                }
            }
            (false, true) => {
                if frag_end == end {
                    Overlap::Covered
                } else {
                    Overlap::Right
                }
            }
        }
    }
}

impl Reassembler {
    /// Creates a reassembler whose output stream and pending fragments share
    /// `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            output: ByteStream::new(capacity),
            capacity,
            pending: BTreeMap::new(),
            pending_bytes: 0,
            next_index: 0,
            eof_index: None,
        }
    }

    /// Accepts the substring `data` whose first byte has absolute index
    /// `index`. If `eof` is set, the last byte of `data` is the last byte of
    /// the stream.
    ///
    /// Bytes that were already assembled, or that fall beyond what the
    /// output could ever accept without overflowing, are dropped.
    pub fn push_substring(&mut self, data: &[u8], index: u64, eof: bool) {
        if eof {
            self.eof_index = Some(index + data.len() as u64);
        }
        if self.assembled_through_eof() {
            self.output.end_input();
            return;
        }

        let end = index + data.len() as u64;
        if end <= self.next_index || index >= self.high_water_index() {
            return;
        }

        if index <= self.next_index {
            self.write_in_order(data, index);
        } else {
            self.store(data.to_vec(), index);
        }

        if self.assembled_through_eof() {
            self.output.end_input();
        }
    }

    /// The number of bytes held in pending fragments.
    pub fn unassembled_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Whether no fragments are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The index of the first byte that has not been assembled yet.
    pub fn first_unassembled(&self) -> u64 {
        self.next_index
    }

    /// The assembled output.
    pub fn stream_out(&self) -> &ByteStream {
        &self.output
    }

    /// The assembled output, for reading.
    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// One past the farthest index the output could accept right now, given
    /// how much of it the reader has already consumed.
    fn high_water_index(&self) -> u64 {
        self.output.bytes_read() + self.capacity as u64
    }

    /// Bytes that may still be stored anywhere without exceeding capacity.
    fn free_capacity(&self) -> usize {
        self.capacity - self.output.buffer_size() - self.pending_bytes
    }

    fn assembled_through_eof(&self) -> bool {
        matches!(self.eof_index, Some(eof) if self.next_index >= eof)
    }

    /// Writes a substring that starts at or before `next_index`, then drains
    /// any pending fragments that have become contiguous.
    fn write_in_order(&mut self, data: &[u8], index: u64) {
        let skip = (self.next_index - index) as usize;
        let bound = (index + data.len() as u64).min(self.high_water_index());
        let len = ((bound - self.next_index) as usize).min(self.free_capacity());
        let written = self.output.write(&data[skip..skip + len]);
        self.next_index += written as u64;

        while let Some(entry) = self.pending.first_entry() {
            let start = *entry.key();
            if start > self.next_index {
                break;
            }
            let fragment = entry.remove();
            self.pending_bytes -= fragment.len();
            let fragment_end = start + fragment.len() as u64;
            if fragment_end > self.next_index {
                let tail = &fragment[(self.next_index - start) as usize..];
                self.next_index += self.output.write(tail) as u64;
            }
        }
    }

    /// Stores a substring that starts after `next_index`, merging it with
    /// the fragments it overlaps.
    fn store(&mut self, mut data: Vec<u8>, mut start: u64) {
        let end = start + data.len() as u64;
        let overlapping: Vec<u64> = self
            .pending
            .range(..end)
            .rev()
            .take_while(|&(&key, fragment)| key + fragment.len() as u64 > start)
            .map(|(&key, _)| key)
            .collect();

        let mut end = end;
        for key in overlapping {
            let fragment_len = self.pending[&key].len();
            let fragment_end = key + fragment_len as u64;
            match Overlap::classify(key, fragment_end, start, end) {
                Overlap::Covering => return,
                Overlap::Covered => {
                    self.remove_fragment(key);
                }
                Overlap::Left => {
                    let mut merged = self.remove_fragment(key);
                    merged.extend_from_slice(&data[(fragment_end - start) as usize..]);
                    data = merged;
                    start = key;
                }
                Overlap::Right => {
                    let fragment = self.remove_fragment(key);
                    data.truncate((key - start) as usize);
                    data.extend_from_slice(&fragment);
                    end = fragment_end;
                }
            }
        }

        let bound = end.min(self.high_water_index());
        let len = ((bound - start) as usize).min(self.free_capacity());
        if len == 0 {
            return;
        }
        data.truncate(len);
        self.pending_bytes += len;
        self.pending.insert(start, data);
    }

    fn remove_fragment(&mut self, key: u64) -> Vec<u8> {
        let fragment = self.pending.remove(&key).unwrap_or_default();
        self.pending_bytes -= fragment.len();
        fragment
    }
}
