//! Wrapper functions for logging protocol events.
//!
//! Each function emits one kind of event under a fixed target so that a log
//! consumer can filter by it. They are meant to be called from inside the
//! engine; the owning application decides where the events go by installing
//! a `tracing` subscriber.

use crate::{connection::State, segment::Segment};
use tracing::{event, Level};

/// Which way a logged segment was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Sent,
    Received,
}

/// Segment event handler.
/// Used to log every segment a connection sends or receives. Captures the
/// following data: direction, seqno, ackno, flags, window, payload length
pub fn segment_event(direction: Direction, segment: &Segment) {
    let header = &segment.header;
    event!(
        target: "SEGMENT",
        Level::INFO,
        direction = ?direction,
        seqno = header.seqno.raw(),
        ackno = header.ack_number().map(|ackno| ackno.raw()),
        flags = ?header.ctl,
        window = header.window,
        length = segment.payload.len(),
    );
}

/// State event handler.
/// Used to log connection state changes. Captures the previous and new state.
pub fn state_event(from: State, to: State) {
    event!(target: "STATE", Level::INFO, from = ?from, to = ?to);
}

/// Retransmission event handler.
/// Used to log timer expiries. Captures the seqno of the segment being resent,
/// how many consecutive retransmissions have happened and the timeout now in
/// effect.
pub fn retransmit_event(seqno: u32, attempt: u32, rto: u64) {
    event!(
        target: "RETRANSMIT",
        Level::INFO,
        seqno = seqno,
        attempt = attempt,
        rto = rto,
    );
}
