//! TCP segments as exchanged between a connection and the network.

use crate::{payload::Payload, sequence::SeqNum};

mod checksum;
mod wire;

pub use wire::{ParseError, Ports, HEADER_OCTETS};

/// A segment: header fields plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub header: Header,
    pub payload: Payload,
}

impl Segment {
    pub fn new(header: Header, payload: impl Into<Payload>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// The number of sequence numbers the segment occupies. SYN and FIN each
    /// take one in addition to the payload bytes.
    pub fn length_in_sequence_space(&self) -> usize {
        self.payload.len() + self.header.ctl.syn() as usize + self.header.ctl.fin() as usize
    }
}

/// The header fields of a segment that the stack cares about.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// The sequence number of the first octet in this segment. If SYN is
    /// present this is the initial sequence number and the first data octet
    /// is ISN+1.
    pub seqno: SeqNum,
    /// The next sequence number the sender of the segment expects to
    /// receive. Only meaningful if the ACK control bit is set.
    pub ackno: SeqNum,
    /// Flags that adjust how the segment is handled
    pub ctl: Control,
    /// The number of octets, beginning with the one indicated by the
    /// acknowledgment number, that the sender of this segment is willing to
    /// accept.
    pub window: u16,
}

impl Header {
    /// The acknowledgment number, if the ACK bit is set.
    pub fn ack_number(&self) -> Option<SeqNum> {
        self.ctl.ack().then_some(self.ackno)
    }
}

/// Used for building a segment header
#[derive(Debug, Clone, Copy)]
pub struct HeaderBuilder(Header);

impl HeaderBuilder {
    /// Initialize the header with the given sequence number and no flags
    pub fn new(seqno: SeqNum) -> Self {
        Self(Header {
            seqno,
            ..Default::default()
        })
    }

    /// Set the window size
    pub fn window(mut self, window: u16) -> Self {
        self.0.window = window;
        self
    }

    /// Set the acknowledgement number
    pub fn ack(mut self, ackno: SeqNum) -> Self {
        self.0.ackno = ackno;
        self.0.ctl.set_ack(true);
        self
    }

    /// Set the rst bit up
    pub fn rst(mut self) -> Self {
        self.0.ctl.set_rst(true);
        self
    }

    /// Set the syn bit up
    pub fn syn(mut self) -> Self {
        self.0.ctl.set_syn(true);
        self
    }

    /// Set the fin bit up
    pub fn fin(mut self) -> Self {
        self.0.ctl.set_fin(true);
        self
    }

    pub fn build(self) -> Header {
        self.0
    }
}

/// The control bits of a segment header, laid out as in the TCP header's
/// flags octet.
#[derive(Default, Hash, PartialEq, Eq, Clone, Copy)]
pub struct Control(u8);

impl Control {
    const FIN: u8 = 0;
    const SYN: u8 = 1;
    const RST: u8 = 2;
    const ACK: u8 = 4;

    /// Create a new Control with the given bits
    pub const fn new(ack: bool, rst: bool, syn: bool, fin: bool) -> Self {
        Self(
            (fin as u8) << Self::FIN
                | (syn as u8) << Self::SYN
                | (rst as u8) << Self::RST
                | (ack as u8) << Self::ACK,
        )
    }

    /// Get whether the acknowledgment field is significant
    pub const fn ack(self) -> bool {
        self.bit(Self::ACK)
    }

    /// Set whether the acknowledgment field is significant
    pub fn set_ack(&mut self, state: bool) {
        self.set_bit(Self::ACK, state);
    }

    /// Get whether to reset the connection
    pub const fn rst(self) -> bool {
        self.bit(Self::RST)
    }

    /// Set whether to reset the connection
    pub fn set_rst(&mut self, state: bool) {
        self.set_bit(Self::RST, state);
    }

    /// Get whether to synchronize sequence numbers
    pub const fn syn(self) -> bool {
        self.bit(Self::SYN)
    }

    /// Set whether to synchronize sequence numbers
    pub fn set_syn(&mut self, state: bool) {
        self.set_bit(Self::SYN, state);
    }

    /// Get whether there is no more data from the sender
    pub const fn fin(self) -> bool {
        self.bit(Self::FIN)
    }

    /// Set whether there is no more data from the sender
    pub fn set_fin(&mut self, state: bool) {
        self.set_bit(Self::FIN, state);
    }

    const fn bit(self, bit: u8) -> bool {
        (self.0 >> bit) & 0b1 == 1
    }

    fn set_bit(&mut self, bit: u8, state: bool) {
        self.0 = (self.0 & !(1 << bit)) | ((state as u8) << bit);
    }
}

impl From<u8> for Control {
    fn from(n: u8) -> Self {
        Self(n)
    }
}

impl From<Control> for u8 {
    fn from(control: Control) -> Self {
        control.0
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (self.ack(), "ACK"),
            (self.rst(), "RST"),
            (self.syn(), "SYN"),
            (self.fin(), "FIN"),
        ];
        write!(f, "Control(")?;
        let mut wrote = false;
        for (_, name) in names.iter().filter(|(set, _)| *set) {
            if wrote {
                write!(f, ", ")?;
            }
            wrote = true;
            write!(f, "{name}")?;
        }
        write!(f, ")")
    }
}
