use super::{checksum::Checksum, Control, Header, Segment};
use crate::sequence::SeqNum;
use thiserror::Error as ThisError;

/// The number of 32-bit words in a TCP header without optional header parts
const BASE_HEADER_WORDS: u8 = 5;
/// The number of bytes in a TCP header without optional header parts
pub const HEADER_OCTETS: usize = BASE_HEADER_WORDS as usize * 4;
/// Byte offset of the checksum field
const CHECKSUM_OFFSET: usize = 16;

/// The port pair carried in a serialized header. The stack itself has no
/// notion of ports; they only label the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ports {
    pub src: u16,
    pub dst: u16,
}

impl Ports {
    pub const fn new(src: u16, dst: u16) -> Self {
        Self { src, dst }
    }

    /// The matching port pair for segments travelling the other way.
    pub const fn reverse(self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl Segment {
    /// Serializes the segment as a 20-byte TCP header followed by the
    /// payload.
    ///
    /// The checksum covers the header and payload only. There is no IP
    /// pseudo-header because nothing below the segment layer is modeled.
    pub fn serialize(&self, ports: Ports) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_OCTETS + self.payload.len());
        out.extend_from_slice(&ports.src.to_be_bytes());
        out.extend_from_slice(&ports.dst.to_be_bytes());
        out.extend_from_slice(&self.header.seqno.raw().to_be_bytes());
        out.extend_from_slice(&self.header.ackno.raw().to_be_bytes());
        out.push(BASE_HEADER_WORDS << 4);
        out.push(self.header.ctl.into());
        out.extend_from_slice(&self.header.window.to_be_bytes());
        // Checksum, filled in below
        out.extend_from_slice(&[0, 0]);
        // Urgent pointer
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(self.payload.as_slice());

        let checksum = compute_checksum(&out);
        out[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&checksum.to_be_bytes());
        out
    }

    /// Parses a serialized segment and the ports it was labeled with.
    pub fn from_bytes(packet: &[u8]) -> Result<(Self, Ports), ParseError> {
        if packet.len() < HEADER_OCTETS {
            Err(ParseError::HeaderTooShort)?
        }
        let u16_at = |i: usize| u16::from_be_bytes([packet[i], packet[i + 1]]);
        let u32_at = |i: usize| {
            u32::from_be_bytes([packet[i], packet[i + 1], packet[i + 2], packet[i + 3]])
        };

        let data_offset = packet[12] >> 4;
        if data_offset != BASE_HEADER_WORDS {
            Err(ParseError::UnexpectedOptions)?
        }

        let expected = u16_at(CHECKSUM_OFFSET);
        let mut zeroed = packet.to_vec();
        zeroed[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].fill(0);
        let actual = compute_checksum(&zeroed);
        if actual != expected {
            Err(ParseError::Checksum { actual, expected })?
        }

        let ports = Ports::new(u16_at(0), u16_at(2));
        let header = Header {
            seqno: SeqNum::new(u32_at(4)),
            ackno: SeqNum::new(u32_at(8)),
            ctl: Control::from(packet[13] & 0b1_0111),
            window: u16_at(14),
        };
        Ok((Segment::new(header, &packet[HEADER_OCTETS..]), ports))
    }
}

fn compute_checksum(bytes: &[u8]) -> u16 {
    let mut checksum = Checksum::new();
    checksum.add_bytes(bytes);
    checksum.as_u16()
}

/// An error that occurred while parsing a serialized segment
#[derive(Debug, ThisError, PartialEq, Eq, Clone, Copy)]
pub enum ParseError {
    #[error("Too few bytes to constitute a TCP header")]
    HeaderTooShort,
    #[error(
        "The computed checksum {actual:#06x} did not match the header checksum {expected:#06x}"
    )]
    Checksum { actual: u16, expected: u16 },
    #[error("Data offset was different from that expected for a simple header")]
    UnexpectedOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::HeaderBuilder;

    const PAYLOAD: &[u8] = b"Hello, world!";
    const PORTS: Ports = Ports::new(0xcafe, 0xbabe);
    const SEQUENCE: u32 = 123456789;
    const WINDOW: u16 = 1024;
    const ACKNOWLEDGEMENT: u32 = 10;

    fn segment() -> Segment {
        Segment::new(
            HeaderBuilder::new(SeqNum::new(SEQUENCE))
                .ack(SeqNum::new(ACKNOWLEDGEMENT))
                .window(WINDOW)
                .fin()
                .build(),
            PAYLOAD,
        )
    }

    #[test]
    fn layout_matches_etherparse() {
        let serial = segment().serialize(PORTS);
        let expected = etherparse::TcpHeaderSlice::from_slice(&serial).unwrap();
        assert_eq!(expected.source_port(), PORTS.src);
        assert_eq!(expected.destination_port(), PORTS.dst);
        assert_eq!(expected.sequence_number(), SEQUENCE);
        assert_eq!(expected.acknowledgment_number(), ACKNOWLEDGEMENT);
        assert_eq!(expected.data_offset(), 5);
        assert_eq!(expected.window_size(), WINDOW);
        assert!(expected.ack());
        assert!(expected.fin());
        assert!(!expected.syn());
        assert!(!expected.rst());
        assert!(!expected.psh());
        assert_eq!(expected.urgent_pointer(), 0);
        assert_eq!(&serial[HEADER_OCTETS..], PAYLOAD);
    }

    #[test]
    fn parses_serialized() {
        let serial = segment().serialize(PORTS);
        let (actual, ports) = Segment::from_bytes(&serial).unwrap();
        assert_eq!(actual, segment());
        assert_eq!(ports, PORTS);
    }

    #[test]
    fn detects_corruption() {
        let mut serial = segment().serialize(PORTS);
        serial[HEADER_OCTETS + 3] ^= 0x40;
        assert!(matches!(
            Segment::from_bytes(&serial),
            Err(ParseError::Checksum { .. })
        ));
    }

    #[test]
    fn rejects_short_and_optioned_headers() {
        let serial = segment().serialize(PORTS);
        assert_eq!(
            Segment::from_bytes(&serial[..HEADER_OCTETS - 1]),
            Err(ParseError::HeaderTooShort)
        );
        let mut optioned = serial;
        optioned[12] = 6 << 4;
        assert_eq!(
            Segment::from_bytes(&optioned),
            Err(ParseError::UnexpectedOptions)
        );
    }
}
