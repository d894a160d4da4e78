//! The receiving half of a connection.

use crate::{
    byte_stream::ByteStream, reassembler::Reassembler, segment::Segment, sequence::SeqNum,
};

/// A summary of how far the receiver has progressed through the life of the
/// peer's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverState {
    /// The inbound stream suffered an error
    Error,
    /// No SYN has arrived yet
    Listen,
    /// The SYN has arrived and the stream is open
    SynReceived,
    /// Every octet through the FIN has been assembled
    FinReceived,
}

/// Turns inbound segments into an ordered stream and tells the peer what to
/// send next.
#[derive(Debug, Clone)]
pub struct Receiver {
    reassembler: Reassembler,
    capacity: usize,
    /// The peer's initial sequence number, once its SYN arrives
    isn: Option<SeqNum>,
}

impl Receiver {
    pub fn new(capacity: usize) -> Self {
        Self {
            reassembler: Reassembler::new(capacity),
            capacity,
            isn: None,
        }
    }

    /// Hands the segment's payload to the reassembler. Everything before the
    /// first SYN is discarded.
    pub fn segment_received(&mut self, segment: &Segment) {
        let header = &segment.header;
        let isn = match self.isn {
            Some(isn) => isn,
            None if header.ctl.syn() => {
                self.isn = Some(header.seqno);
                header.seqno
            }
            None => {
                tracing::debug!(seqno = header.seqno.raw(), "Discarding segment before SYN");
                return;
            }
        };

        // The SYN occupies absolute sequence number zero, so the next octet
        // expected is one past the bytes assembled so far
        let checkpoint = self.reassembler.stream_out().bytes_written() + 1;
        let absolute = header.seqno.unwrap(isn, checkpoint);
        let index = if header.ctl.syn() {
            Some(absolute)
        } else {
            absolute.checked_sub(1)
        };
        match index {
            Some(index) => {
                self.reassembler
                    .push_substring(segment.payload.as_slice(), index, header.ctl.fin())
            }
            None => tracing::debug!("Discarding non-SYN segment at the SYN's sequence number"),
        }
    }

    /// The sequence number of the first octet not yet received, or `None`
    /// before the SYN has arrived.
    pub fn ackno(&self) -> Option<SeqNum> {
        let isn = self.isn?;
        let stream = self.reassembler.stream_out();
        let fin = u64::from(stream.input_ended());
        Some(SeqNum::wrap(stream.bytes_written() + 1 + fin, isn))
    }

    /// How many more octets the receiver is willing to accept.
    pub fn window_size(&self) -> usize {
        self.capacity - self.reassembler.stream_out().buffer_size()
    }

    pub fn unassembled_bytes(&self) -> usize {
        self.reassembler.unassembled_bytes()
    }

    pub fn state(&self) -> ReceiverState {
        let stream = self.reassembler.stream_out();
        if stream.error() {
            ReceiverState::Error
        } else if self.isn.is_none() {
            ReceiverState::Listen
        } else if stream.input_ended() {
            ReceiverState::FinReceived
        } else {
            ReceiverState::SynReceived
        }
    }

    /// The assembled inbound stream.
    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.stream_out()
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_out_mut()
    }
}
