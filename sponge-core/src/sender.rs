//! The sending half of a connection.
//!
//! The sender reads bytes the application wrote into its outbound
//! [`ByteStream`], cuts them into segments that fit the peer's advertised
//! window, and keeps every segment until the peer acknowledges it. When the
//! retransmission timer runs out, the oldest unacknowledged segment is sent
//! again and, unless the peer closed its window, the timeout doubles.

use crate::{
    byte_stream::ByteStream,
    config::MAX_PAYLOAD_SIZE,
    logging::retransmit_event,
    segment::{Control, HeaderBuilder, Segment},
    sequence::SeqNum,
    timer::RetransmissionTimer,
};
use std::collections::{vec_deque::Drain, VecDeque};

mod retransmit;
pub use retransmit::{RetransmitQueue, Transmit};


/// A summary of how far the sender has progressed through the life of its
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderState {
    /// The outbound stream suffered an error
    Error,
    /// Nothing has been sent yet
    Closed,
    /// The SYN has been sent but not acknowledged
    SynSent,
    /// The SYN has been acknowledged and the stream is still open, or it has
    /// ended but the FIN has not gone out yet
    SynAcked,
    /// The FIN has been sent but not acknowledged
    FinSent,
    /// Everything including the FIN has been acknowledged
    FinAcked,
}

#[derive(Debug, Clone)]
pub struct Sender {
    isn: SeqNum,
    /// Bytes written by the application and not yet sent
    stream: ByteStream,
    /// Segments ready to be handed to the network
    segments_out: VecDeque<Segment>,
    retransmit: RetransmitQueue,
    timer: RetransmissionTimer,
    /// The absolute sequence number of the next octet to send
    next_seqno: u64,
    /// The highest absolute acknowledgment number received
    ackno: u64,
    /// The window the peer last advertised. Starts at one so that the SYN can
    /// go out before the peer has said anything.
    window: u16,
    syn_sent: bool,
    fin_sent: bool,
    consecutive_retransmissions: u32,
}

impl Sender {
    /// Creates a sender whose outbound stream holds `capacity` bytes and
    /// whose retransmission timeout starts at `rt_timeout` milliseconds.
    pub fn new(capacity: usize, rt_timeout: u64, isn: SeqNum) -> Self {
        Self {
            isn,
            stream: ByteStream::new(capacity),
            segments_out: VecDeque::new(),
            retransmit: RetransmitQueue::new(),
            timer: RetransmissionTimer::new(rt_timeout),
            next_seqno: 0,
            ackno: 0,
            window: 1,
            syn_sent: false,
            fin_sent: false,
            consecutive_retransmissions: 0,
        }
    }

    /// Sends as many new segments as the peer's window admits.
    ///
    /// A zero window is treated as a window of one while nothing is in
    /// flight, so that a single probe keeps asking the peer whether its
    /// window has opened.
    pub fn fill_window(&mut self) {
        let window = u64::from(self.window.max(1));
        loop {
            let room = window.saturating_sub(self.retransmit.bytes_in_flight());
            if !self.send_next_segment(room) {
                break;
            }
        }
    }

    /// Manufactures one segment occupying at most `room` sequence numbers.
    /// Returns whether a segment was sent.
    fn send_next_segment(&mut self, room: u64) -> bool {
        let syn = !self.syn_sent;
        if room < u64::from(syn) {
            return false;
        }
        let payload_room = (room - u64::from(syn)).min(MAX_PAYLOAD_SIZE as u64) as usize;
        let bytes = self.stream.read(payload_room);
        // FIN goes out once the stream is drained and the window still has a
        // slot for it
        let fin = !self.fin_sent
            && self.stream.eof()
            && (bytes.len() as u64 + u64::from(syn)) < room;

        let mut header = HeaderBuilder::new(self.next_seqno());
        if syn {
            header = header.syn();
        }
        if fin {
            header = header.fin();
        }
        let segment = Segment::new(header.build(), bytes);
        let length = segment.length_in_sequence_space() as u64;
        if length == 0 {
            return false;
        }

        self.syn_sent |= syn;
        self.fin_sent |= fin;
        self.segments_out.push_back(segment.clone());
        self.retransmit.push(self.next_seqno, segment);
        self.next_seqno += length;
        if !self.timer.running() {
            self.timer.start();
        }
        true
    }

    /// Handles an acknowledgment and window advertisement from the peer.
    ///
    /// Acknowledgments of octets never sent, or older than one already
    /// received, are ignored entirely.
    pub fn ack_received(&mut self, ackno: SeqNum, window: u16) {
        let absolute = ackno.unwrap(self.isn, self.next_seqno);
        if absolute > self.next_seqno || absolute < self.ackno {
            tracing::debug!(
                ackno = absolute,
                next_seqno = self.next_seqno,
                last_ackno = self.ackno,
                "Ignoring implausible acknowledgment"
            );
            return;
        }
        self.ackno = absolute;

        if self.retransmit.retire(absolute) > 0 {
            self.consecutive_retransmissions = 0;
            self.timer.reset();
            self.timer.start();
        }
        if self.retransmit.is_empty() {
            self.timer.stop();
        }

        self.window = window;
        self.fill_window();
    }

    /// Advances the retransmission timer by `ms` milliseconds and resends the
    /// oldest unacknowledged segment if it ran out.
    pub fn tick(&mut self, ms: u64) {
        self.timer.tick(ms);
        if !self.timer.expired() {
            return;
        }
        let Some(oldest) = self.retransmit.front() else {
            self.timer.stop();
            return;
        };
        self.segments_out.push_back(oldest.segment.clone());
        let seqno = oldest.segment.header.seqno;
        // A closed window is the peer's doing, not a sign of congestion
        if self.window > 0 {
            self.consecutive_retransmissions += 1;
            self.timer.reset_double();
        }
        retransmit_event(
            seqno.raw(),
            self.consecutive_retransmissions,
            self.timer.rto(),
        );
        self.timer.start();
    }

    /// Queues a segment with no payload at the current send position. SYN
    /// and FIN bits in `ctl` consume a sequence number, but the segment is
    /// never retransmitted.
    pub fn send_empty_segment(&mut self, ctl: Control) {
        let mut header = HeaderBuilder::new(self.next_seqno()).build();
        header.ctl = ctl;
        header.ctl.set_ack(false);
        let segment = Segment::new(header, Vec::new());
        self.syn_sent |= ctl.syn();
        self.fin_sent |= ctl.fin();
        self.next_seqno += segment.length_in_sequence_space() as u64;
        self.segments_out.push_back(segment);
    }

    /// Removes and returns every segment ready for the network.
    pub fn drain_segments(&mut self) -> Drain<'_, Segment> {
        self.segments_out.drain(..)
    }

    pub fn segments_out(&self) -> &VecDeque<Segment> {
        &self.segments_out
    }

    /// Drops every segment that has not been handed to the network yet.
    pub fn clear_segments_out(&mut self) {
        self.segments_out.clear();
    }

    pub fn state(&self) -> SenderState {
        let bytes_in_flight = self.bytes_in_flight();
        if self.stream.error() {
            SenderState::Error
        } else if self.next_seqno == 0 {
            SenderState::Closed
        } else if self.next_seqno == bytes_in_flight {
            SenderState::SynSent
        } else if !self.fin_sent {
            SenderState::SynAcked
        } else if bytes_in_flight > 0 {
            SenderState::FinSent
        } else {
            SenderState::FinAcked
        }
    }

    /// The number of sequence numbers sent but not yet acknowledged.
    pub fn bytes_in_flight(&self) -> u64 {
        self.retransmit.bytes_in_flight()
    }

    /// Retransmissions since the last acknowledgment of new data.
    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retransmissions
    }

    /// The absolute sequence number of the next octet to send.
    pub fn next_seqno_absolute(&self) -> u64 {
        self.next_seqno
    }

    /// The sequence number of the next octet to send.
    pub fn next_seqno(&self) -> SeqNum {
        SeqNum::wrap(self.next_seqno, self.isn)
    }

    pub fn isn(&self) -> SeqNum {
        self.isn
    }

    /// The unacknowledged segments, oldest first.
    pub fn retransmit_queue(&self) -> &RetransmitQueue {
        &self.retransmit
    }

    /// The current retransmission timeout in milliseconds.
    pub fn rto(&self) -> u64 {
        self.timer.rto()
    }

    /// The outbound stream the application writes into.
    pub fn stream_in(&self) -> &ByteStream {
        &self.stream
    }

    pub fn stream_in_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }
}
