use crate::segment::Segment;
use std::collections::VecDeque;

/// A segment that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    /// The absolute sequence number of the segment's first octet
    pub start: u64,
    /// The segment as the sender manufactured it. Its payload shares bytes
    /// with every copy handed to the network.
    pub segment: Segment,
}

impl Transmit {
    /// The number of sequence numbers the segment occupies
    pub fn length(&self) -> u64 {
        self.segment.length_in_sequence_space() as u64
    }

    /// One past the last absolute sequence number the segment occupies
    pub fn end(&self) -> u64 {
        self.start + self.length()
    }
}

/// The retransmission queue: unacknowledged segments in the order they were
/// sent, along with the number of sequence numbers they occupy in total.
#[derive(Debug, Default, Clone)]
pub struct RetransmitQueue {
    queue: VecDeque<Transmit>,
    bytes_in_flight: u64,
}

impl RetransmitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly sent segment starting at absolute sequence number
    /// `start`.
    pub fn push(&mut self, start: u64, segment: Segment) {
        let transmit = Transmit { start, segment };
        self.bytes_in_flight += transmit.length();
        self.queue.push_back(transmit);
    }

    /// The oldest unacknowledged segment
    pub fn front(&self) -> Option<&Transmit> {
        self.queue.front()
    }

    /// Removes every segment that `ackno` fully acknowledges and returns how
    /// many were removed. Partially acknowledged segments stay queued.
    pub fn retire(&mut self, ackno: u64) -> usize {
        let mut retired = 0;
        while let Some(transmit) = self.queue.front() {
            if transmit.end() > ackno {
                break;
            }
            self.bytes_in_flight -= transmit.length();
            self.queue.pop_front();
            retired += 1;
        }
        retired
    }

    /// The number of sequence numbers sent but not yet acknowledged
    pub fn bytes_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transmit> {
        self.queue.iter()
    }
}
