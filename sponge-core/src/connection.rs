//! A full TCP peer: one [`Sender`] and one [`Receiver`] sharing a connection
//! state.
//!
//! A connection is driven entirely by its owner. The owner writes and reads
//! bytes, delivers inbound segments with [`Connection::segment_received`],
//! reports the passage of time with [`Connection::tick`], and collects the
//! segments the connection wants sent with [`Connection::segments`]. Nothing
//! happens in between those calls.

use crate::{
    byte_stream::ByteStream,
    config::TcpConfig,
    logging::{segment_event, state_event, Direction},
    receiver::Receiver,
    segment::{Control, Segment},
    sender::Sender,
    sequence::SeqNum,
};
use rand::Rng;
use std::collections::VecDeque;

mod state;
pub use state::State;

#[cfg(test)]
mod tests;

#[derive(Debug)]
pub struct Connection {
    config: TcpConfig,
    sender: Sender,
    receiver: Receiver,
    /// Segments ready for the network, with acknowledgment fields filled in
    segments_out: VecDeque<Segment>,
    state: State,
    time_since_last_segment_received: u64,
}

impl Connection {
    /// Creates a listening connection. The initial sequence number is
    /// `config.fixed_isn` if set and drawn from `rng` otherwise.
    pub fn new(config: TcpConfig, rng: &mut impl Rng) -> Self {
        let isn = config
            .fixed_isn
            .unwrap_or_else(|| SeqNum::new(rng.gen()));
        Self {
            config,
            sender: Sender::new(config.send_capacity, config.rt_timeout, isn),
            receiver: Receiver::new(config.recv_capacity),
            segments_out: VecDeque::new(),
            state: State::Listen,
            time_since_last_segment_received: 0,
        }
    }

    /// Initiates a connection by sending a SYN.
    pub fn connect(&mut self) {
        self.sender.fill_window();
        self.flush();
        self.update_state();
    }

    /// Writes as much of `data` as the outbound stream has room for and sends
    /// what the peer's window admits. Returns the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let accepted = self.sender.stream_in_mut().write(data);
        self.sender.fill_window();
        self.flush();
        self.update_state();
        accepted
    }

    /// Signals that the application has nothing more to write.
    pub fn end_input_stream(&mut self) {
        self.sender.stream_in_mut().end_input();
        self.sender.fill_window();
        self.flush();
        self.update_state();
    }

    /// Reads up to `len` assembled bytes from the inbound stream.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        self.receiver.stream_out_mut().read(len)
    }

    /// Handles a segment that arrived from the network.
    pub fn segment_received(&mut self, segment: &Segment) {
        if !self.active() {
            return;
        }
        segment_event(Direction::Received, segment);
        self.time_since_last_segment_received = 0;

        let header = &segment.header;
        if header.ctl.rst() {
            self.unclean_shutdown();
            return;
        }
        if self.state == State::Listen && !header.ctl.syn() {
            tracing::debug!("Ignoring non-SYN segment while listening");
            return;
        }

        self.receiver.segment_received(segment);
        if let Some(ackno) = header.ack_number() {
            self.sender.ack_received(ackno, header.window);
        }

        // Answer a SYN with our own unless we already sent one
        if header.ctl.syn() && self.sender.next_seqno_absolute() == 0 {
            self.connect();
            return;
        }

        let occupies_sequence_space = segment.length_in_sequence_space() > 0;
        let keep_alive = !occupies_sequence_space
            && matches!(self.receiver.ackno(), Some(ackno) if header.seqno == ackno - 1);
        if keep_alive {
            self.sender.send_empty_segment(Control::default());
        }
        if occupies_sequence_space && self.sender.segments_out().is_empty() {
            self.sender.fill_window();
            if self.sender.segments_out().is_empty() {
                self.sender.send_empty_segment(Control::default());
            }
        }

        self.flush();
        self.update_state();
    }

    /// Reports that `ms` milliseconds have passed.
    pub fn tick(&mut self, ms: u64) {
        if !self.active() {
            return;
        }
        self.sender.tick(ms);
        self.time_since_last_segment_received =
            self.time_since_last_segment_received.saturating_add(ms);

        if self.sender.consecutive_retransmissions() > self.config.max_retx_attempts {
            tracing::warn!(
                attempts = self.sender.consecutive_retransmissions(),
                "Giving up on an unresponsive peer"
            );
            self.sender.clear_segments_out();
            self.unclean_shutdown();
            self.send_rst();
            return;
        }

        self.flush();
        self.update_state();
        if self.state == State::TimeWait
            && self.time_since_last_segment_received >= self.config.linger_timeout()
        {
            self.set_state(State::Closed);
        }
    }

    /// Tears the connection down. A connection that is still active is reset
    /// and a RST is queued for the peer. Closing an inactive connection does
    /// nothing.
    pub fn close(&mut self) {
        if self.active() {
            self.unclean_shutdown();
            self.send_rst();
        }
    }

    /// Removes and returns every segment ready for the network.
    pub fn segments(&mut self) -> Vec<Segment> {
        self.segments_out.drain(..).collect()
    }

    /// Whether the connection has not yet closed, cleanly or otherwise.
    pub fn active(&self) -> bool {
        self.state.active()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The number of bytes the application may still write.
    pub fn remaining_outbound_capacity(&self) -> usize {
        self.sender.stream_in().remaining_capacity()
    }

    pub fn bytes_in_flight(&self) -> u64 {
        self.sender.bytes_in_flight()
    }

    pub fn unassembled_bytes(&self) -> usize {
        self.receiver.unassembled_bytes()
    }

    pub fn time_since_last_segment_received(&self) -> u64 {
        self.time_since_last_segment_received
    }

    /// The bytes received from the peer.
    pub fn inbound_stream(&self) -> &ByteStream {
        self.receiver.stream_out()
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    /// Moves the sender's segments to the outbound queue, acknowledging what
    /// the receiver has assembled.
    fn flush(&mut self) {
        let ackno = self.receiver.ackno();
        let window = self.receiver.window_size().min(u16::MAX as usize) as u16;
        for mut segment in self.sender.drain_segments() {
            if let Some(ackno) = ackno {
                segment.header.ackno = ackno;
                segment.header.ctl.set_ack(true);
                segment.header.window = window;
            }
            segment_event(Direction::Sent, &segment);
            self.segments_out.push_back(segment);
        }
    }

    fn send_rst(&mut self) {
        self.sender
            .send_empty_segment(Control::new(false, true, false, false));
        self.flush();
    }

    fn unclean_shutdown(&mut self) {
        tracing::warn!(state = ?self.state, "Resetting connection");
        self.sender.stream_in_mut().set_error();
        self.receiver.stream_out_mut().set_error();
        self.set_state(State::Reset);
    }

    fn update_state(&mut self) {
        let next = self
            .state
            .advance(self.receiver.state(), self.sender.state());
        self.set_state(next);
    }

    fn set_state(&mut self, next: State) {
        if next != self.state {
            state_event(self.state, next);
            self.state = next;
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.active() {
            tracing::warn!(
                state = ?self.state,
                "Dropping an active connection without closing it"
            );
            self.close();
        }
    }
}
