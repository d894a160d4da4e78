//! 32-bit wrapping sequence numbers and their 64-bit absolute positions.
//!
//! Each direction of a connection numbers its bytes starting from an Initial
//! Sequence Number (ISN). On the wire those numbers are 32 bits wide and wrap
//! around; inside the stack every position is an absolute `u64` index where
//! 0 is the SYN, the first payload byte is 1, and the FIN takes the index after
//! the last payload byte.
//!
//! ```text
//!   absolute:   0     1 ..          n       n + 1
//!             [SYN] [byte 0 .. byte n-1]   [FIN]
//!   seqno:     isn  isn+1 ..      isn+n   isn+n+1   (mod 2^32)
//! ```

use std::{
    fmt::{self, Display},
    ops::{Add, Sub},
};

/// The number of distinct 32-bit sequence numbers.
const SPAN: u64 = 1 << 32;

/// A 32-bit sequence number that wraps around on overflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqNum(u32);

impl SeqNum {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Converts an absolute stream index into a sequence number relative to
    /// `isn`.
    pub fn wrap(absolute: u64, isn: SeqNum) -> Self {
        // Truncation is the modulo 2^32.
        Self(isn.0.wrapping_add(absolute as u32))
    }

    /// Converts this sequence number back into an absolute stream index.
    ///
    /// Every sequence number stands for infinitely many absolute indices that
    /// are 2^32 apart. The one returned is the non-negative index closest to
    /// `checkpoint`, a recently known absolute position. When two candidates
    /// are equally close the smaller one wins.
    pub fn unwrap(self, isn: SeqNum, checkpoint: u64) -> u64 {
        let offset = u64::from(self.0.wrapping_sub(isn.0));
        if checkpoint <= offset {
            return offset;
        }
        let distance = checkpoint - offset;
        let lower = offset + distance / SPAN * SPAN;
        match lower.checked_add(SPAN) {
            Some(upper) if distance % SPAN > SPAN / 2 => upper,
            _ => lower,
        }
    }
}

impl Add<u32> for SeqNum {
    type Output = SeqNum;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for SeqNum {
    type Output = SeqNum;

    fn sub(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_sub(rhs))
    }
}

impl From<u32> for SeqNum {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<SeqNum> for u32 {
    fn from(seqno: SeqNum) -> Self {
        seqno.0
    }
}

impl Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
