//! A flow-controlled, in-memory byte stream.

use std::collections::VecDeque;

/// A fixed-capacity FIFO of bytes with end-of-input and error signaling.
///
/// Bytes are written on the input side and read from the output side. The
/// stream never holds more than `capacity` bytes at once; writes that would
/// exceed it are clipped rather than rejected. The running totals of bytes
/// written and read are never reset, so `bytes_written - bytes_read` is
/// always the number of buffered bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStream {
    buffer: VecDeque<u8>,
    capacity: usize,
    bytes_written: u64,
    bytes_read: u64,
    input_ended: bool,
    error: bool,
}

impl ByteStream {
    /// Creates an empty stream that can buffer up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            bytes_written: 0,
            bytes_read: 0,
            input_ended: false,
            error: false,
        }
    }

    /// Writes as much of `data` as fits and returns the number of bytes
    /// accepted. Nothing is accepted once the input has ended.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.input_ended {
            return 0;
        }
        let accepted = data.len().min(self.remaining_capacity());
        self.buffer.extend(&data[..accepted]);
        self.bytes_written += accepted as u64;
        accepted
    }

    /// Copies up to `len` bytes from the output side without consuming them.
    pub fn peek_output(&self, len: usize) -> Vec<u8> {
        let len = len.min(self.buffer.len());
        self.buffer.range(..len).copied().collect()
    }

    /// Discards up to `len` bytes from the output side.
    pub fn pop_output(&mut self, len: usize) {
        let len = len.min(self.buffer.len());
        self.buffer.drain(..len);
        self.bytes_read += len as u64;
    }

    /// Copies and then discards up to `len` bytes from the output side.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        let out = self.peek_output(len);
        self.pop_output(out.len());
        out
    }

    /// Signals that no more bytes will ever be written.
    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    /// Whether the writer has signaled the end of the input.
    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    /// Marks the stream as having suffered an error. The flag is sticky and
    /// leaves buffered bytes in place.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    /// Whether the stream has suffered an error.
    pub fn error(&self) -> bool {
        self.error
    }

    /// The number of bytes currently buffered.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no bytes are currently buffered.
    pub fn buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the input has ended and every byte has been read.
    pub fn eof(&self) -> bool {
        self.input_ended && self.buffer.is_empty()
    }

    /// Total number of bytes ever written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Total number of bytes ever read.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// The number of additional bytes the stream can currently accept.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// The maximum number of bytes the stream can buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
