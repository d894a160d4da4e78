use super::*;
use crate::{config::TIMEOUT_DFLT, segment::HeaderBuilder};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing_test::traced_test;

const CAPACITY: usize = 4096;

fn open(isn: u32) -> Connection {
    let config = TcpConfig::default().capacity(CAPACITY).fixed_isn(isn);
    Connection::new(config, &mut SmallRng::seed_from_u64(0xBAD5EED))
}

fn ack(seqno: u32, ackno: u32) -> Segment {
    Segment::new(
        HeaderBuilder::new(SeqNum::new(seqno))
            .ack(SeqNum::new(ackno))
            .window(CAPACITY as u16)
            .build(),
        "",
    )
}

/// Runs the three-way handshake between peers with ISNs 100 and 300.
fn established() -> (Connection, Connection) {
    let mut peer_a = open(100);
    let mut peer_b = open(300);
    peer_a.connect();
    for segment in peer_a.segments() {
        peer_b.segment_received(&segment);
    }
    for segment in peer_b.segments() {
        peer_a.segment_received(&segment);
    }
    for segment in peer_a.segments() {
        peer_b.segment_received(&segment);
    }
    assert_eq!(peer_a.state(), State::Established);
    assert_eq!(peer_b.state(), State::Established);
    (peer_a, peer_b)
}

#[test]
fn basic_synchronization() {
    // Based on RFC 793 3.4 Figure 7:
    //
    //     TCP Peer A                                            TCP Peer B
    // 1.  CLOSED                                                LISTEN
    // 2.  SYN-SENT    --> <SEQ=100><CTL=SYN>                --> SYN-RECEIVED
    // 3.  ESTABLISHED <-- <SEQ=300><ACK=101><CTL=SYN,ACK>   <-- SYN-RECEIVED
    // 4.  ESTABLISHED --> <SEQ=101><ACK=301><CTL=ACK>       --> ESTABLISHED
    // 5.  ESTABLISHED --> <SEQ=101><ACK=301><CTL=ACK><DATA> --> ESTABLISHED

    // 2
    let mut peer_a = open(100);
    let mut peer_b = open(300);
    assert_eq!(peer_b.state(), State::Listen);
    peer_a.connect();
    assert_eq!(peer_a.state(), State::SynSent);
    let peer_a_syn = peer_a.segments().remove(0);
    assert_eq!(peer_a_syn.header.seqno, SeqNum::new(100));
    assert!(peer_a_syn.header.ctl.syn());
    assert_eq!(peer_a_syn.header.ack_number(), None);

    peer_b.segment_received(&peer_a_syn);
    assert_eq!(peer_b.state(), State::SynReceived);

    // 3
    let peer_b_syn_ack = peer_b.segments().remove(0);
    assert_eq!(peer_b_syn_ack.header.seqno, SeqNum::new(300));
    assert_eq!(peer_b_syn_ack.header.ack_number(), Some(SeqNum::new(101)));
    assert_eq!(peer_b_syn_ack.header.window, CAPACITY as u16);
    assert!(peer_b_syn_ack.header.ctl.syn());

    peer_a.segment_received(&peer_b_syn_ack);
    assert_eq!(peer_a.state(), State::Established);

    // 4
    let peer_a_ack = peer_a.segments().remove(0);
    assert_eq!(peer_a_ack.header.seqno, SeqNum::new(101));
    assert_eq!(peer_a_ack.header.ack_number(), Some(SeqNum::new(301)));
    assert_eq!(peer_a_ack.length_in_sequence_space(), 0);

    peer_b.segment_received(&peer_a_ack);
    assert_eq!(peer_b.state(), State::Established);
    assert!(peer_b.segments().is_empty());

    // 5
    assert_eq!(peer_a.write(b"hello"), 5);
    let peer_a_data = peer_a.segments().remove(0);
    assert_eq!(peer_a_data.header.seqno, SeqNum::new(101));
    assert_eq!(peer_a_data.header.ack_number(), Some(SeqNum::new(301)));
    assert_eq!(peer_a_data.payload.as_slice(), b"hello");
    assert_eq!(peer_a.bytes_in_flight(), 5);

    peer_b.segment_received(&peer_a_data);
    assert_eq!(peer_b.read(100), b"hello");
    let peer_b_ack = peer_b.segments().remove(0);
    assert_eq!(peer_b_ack.header.ack_number(), Some(SeqNum::new(106)));
    peer_a.segment_received(&peer_b_ack);
    assert_eq!(peer_a.bytes_in_flight(), 0);
}

#[test]
fn simultaneous_initiation() {
    // Based on RFC 793 3.4 Figure 8, with each peer answering the other's SYN
    // with a bare ACK since its own SYN is already on its way:
    //
    //     TCP Peer A                                    TCP Peer B
    // 1.  CLOSED                                        CLOSED
    // 2.  SYN-SENT     --> <SEQ=100><CTL=SYN>           ...
    // 3.  SYN-RECEIVED <-- <SEQ=300><CTL=SYN>           <-- SYN-SENT
    // 4.               ... <SEQ=100><CTL=SYN>           --> SYN-RECEIVED
    // 5.  SYN-RECEIVED --> <SEQ=101><ACK=301><CTL=ACK>  ...
    // 6.  ESTABLISHED  <-- <SEQ=301><ACK=101><CTL=ACK>  <-- SYN-RECEIVED
    // 7.               ... <SEQ=101><ACK=301><CTL=ACK>  --> ESTABLISHED

    // 2
    let mut peer_a = open(100);
    let mut peer_b = open(300);
    peer_a.connect();
    peer_b.connect();
    let peer_a_syn = peer_a.segments().remove(0);
    let peer_b_syn = peer_b.segments().remove(0);

    // 3
    peer_a.segment_received(&peer_b_syn);
    assert_eq!(peer_a.state(), State::SynReceived);

    // 4
    peer_b.segment_received(&peer_a_syn);
    assert_eq!(peer_b.state(), State::SynReceived);

    // 5
    let peer_a_ack = peer_a.segments().remove(0);
    assert_eq!(peer_a_ack.header.seqno, SeqNum::new(101));
    assert_eq!(peer_a_ack.header.ack_number(), Some(SeqNum::new(301)));
    assert!(!peer_a_ack.header.ctl.syn());

    // 6
    let peer_b_ack = peer_b.segments().remove(0);
    assert_eq!(peer_b_ack.header.ack_number(), Some(SeqNum::new(101)));
    peer_a.segment_received(&peer_b_ack);
    assert_eq!(peer_a.state(), State::Established);
    assert!(peer_a.segments().is_empty());

    // 7
    peer_b.segment_received(&peer_a_ack);
    assert_eq!(peer_b.state(), State::Established);
}

#[test]
fn normal_close_sequence() {
    // Based on RFC 793 3.5 Figure 13:
    //
    //     TCP Peer A                                           TCP Peer B
    // 1.  ESTABLISHED                                          ESTABLISHED
    // 2.  (Close)
    //     FIN-WAIT-1  --> <SEQ=101><ACK=301><CTL=FIN,ACK>  --> CLOSE-WAIT
    // 3.  FIN-WAIT-2  <-- <SEQ=301><ACK=102><CTL=ACK>      <-- CLOSE-WAIT
    // 4.                                                       (Close)
    //     TIME-WAIT   <-- <SEQ=301><ACK=102><CTL=FIN,ACK>  <-- LAST-ACK
    // 5.  TIME-WAIT   --> <SEQ=102><ACK=302><CTL=ACK>      --> CLOSED
    // 6.  (linger)
    //     CLOSED

    // 1
    let (mut peer_a, mut peer_b) = established();

    // 2
    peer_a.end_input_stream();
    assert_eq!(peer_a.state(), State::FinWait1);
    let peer_a_fin = peer_a.segments().remove(0);
    assert!(peer_a_fin.header.ctl.fin());
    assert_eq!(peer_a_fin.header.seqno, SeqNum::new(101));
    assert_eq!(peer_a_fin.header.ack_number(), Some(SeqNum::new(301)));

    peer_b.segment_received(&peer_a_fin);
    assert_eq!(peer_b.state(), State::CloseWait);
    assert!(peer_b.inbound_stream().eof());

    // 3
    let peer_b_ack = peer_b.segments().remove(0);
    assert_eq!(peer_b_ack.header.ack_number(), Some(SeqNum::new(102)));
    peer_a.segment_received(&peer_b_ack);
    assert_eq!(peer_a.state(), State::FinWait2);

    // 4
    peer_b.end_input_stream();
    assert_eq!(peer_b.state(), State::LastAck);
    let peer_b_fin = peer_b.segments().remove(0);
    assert!(peer_b_fin.header.ctl.fin());
    assert_eq!(peer_b_fin.header.seqno, SeqNum::new(301));
    assert_eq!(peer_b_fin.header.ack_number(), Some(SeqNum::new(102)));

    peer_a.segment_received(&peer_b_fin);
    assert_eq!(peer_a.state(), State::TimeWait);

    // 5
    let peer_a_ack = peer_a.segments().remove(0);
    assert_eq!(peer_a_ack.header.seqno, SeqNum::new(102));
    assert_eq!(peer_a_ack.header.ack_number(), Some(SeqNum::new(302)));
    peer_b.segment_received(&peer_a_ack);
    assert_eq!(peer_b.state(), State::Closed);
    assert!(!peer_b.active());
    assert!(!peer_b.inbound_stream().error());

    // 6
    peer_a.tick(10 * TIMEOUT_DFLT - 1);
    assert_eq!(peer_a.state(), State::TimeWait);
    assert!(peer_a.active());
    peer_a.tick(1);
    assert_eq!(peer_a.state(), State::Closed);
    assert!(!peer_a.inbound_stream().error());
}

#[test]
fn simultaneous_close_sequence() {
    // Based on RFC 793 3.5 Figure 14:
    //
    //     TCP Peer A                                           TCP Peer B
    // 1.  ESTABLISHED                                          ESTABLISHED
    // 2.  (Close)                                              (Close)
    //     FIN-WAIT-1  --> <SEQ=101><ACK=301><CTL=FIN,ACK>  ... FIN-WAIT-1
    //                 <-- <SEQ=301><ACK=101><CTL=FIN,ACK>  <--
    //                 ... <SEQ=101><ACK=301><CTL=FIN,ACK>  -->
    // 3.  CLOSING     --> <SEQ=102><ACK=302><CTL=ACK>      ... CLOSING
    //                 <-- <SEQ=302><ACK=102><CTL=ACK>      <--
    //                 ... <SEQ=102><ACK=302><CTL=ACK>      -->
    // 4.  TIME-WAIT                                            TIME-WAIT
    //     (linger)                                             (linger)
    //     CLOSED                                               CLOSED

    // 1
    let (mut peer_a, mut peer_b) = established();

    // 2
    peer_a.end_input_stream();
    peer_b.end_input_stream();
    assert_eq!(peer_a.state(), State::FinWait1);
    assert_eq!(peer_b.state(), State::FinWait1);
    let peer_a_fin = peer_a.segments().remove(0);
    let peer_b_fin = peer_b.segments().remove(0);

    // 3
    peer_a.segment_received(&peer_b_fin);
    peer_b.segment_received(&peer_a_fin);
    assert_eq!(peer_a.state(), State::Closing);
    assert_eq!(peer_b.state(), State::Closing);
    let peer_a_ack = peer_a.segments().remove(0);
    let peer_b_ack = peer_b.segments().remove(0);
    assert_eq!(peer_a_ack.header.seqno, SeqNum::new(102));
    assert_eq!(peer_a_ack.header.ack_number(), Some(SeqNum::new(302)));
    assert_eq!(peer_b_ack.header.seqno, SeqNum::new(302));
    assert_eq!(peer_b_ack.header.ack_number(), Some(SeqNum::new(102)));

    // 4
    peer_a.segment_received(&peer_b_ack);
    peer_b.segment_received(&peer_a_ack);
    assert_eq!(peer_a.state(), State::TimeWait);
    assert_eq!(peer_b.state(), State::TimeWait);
    peer_a.tick(10 * TIMEOUT_DFLT);
    peer_b.tick(10 * TIMEOUT_DFLT);
    assert_eq!(peer_a.state(), State::Closed);
    assert_eq!(peer_b.state(), State::Closed);
}

#[test]
fn linger_restarts_on_retransmitted_fin() {
    let (mut peer_a, mut peer_b) = established();
    peer_a.end_input_stream();
    let peer_a_fin = peer_a.segments().remove(0);
    peer_b.segment_received(&peer_a_fin);
    for segment in peer_b.segments() {
        peer_a.segment_received(&segment);
    }
    peer_b.end_input_stream();
    let peer_b_fin = peer_b.segments().remove(0);
    peer_a.segment_received(&peer_b_fin);
    assert_eq!(peer_a.state(), State::TimeWait);
    peer_a.segments();

    // The ACK of the FIN was lost and the peer sends it again
    peer_a.tick(10 * TIMEOUT_DFLT - 1);
    peer_a.segment_received(&peer_b_fin);
    assert_eq!(peer_a.time_since_last_segment_received(), 0);
    let reply = peer_a.segments();
    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0].header.ack_number(), Some(SeqNum::new(302)));

    peer_a.tick(10 * TIMEOUT_DFLT - 1);
    assert_eq!(peer_a.state(), State::TimeWait);
    peer_a.tick(1);
    assert_eq!(peer_a.state(), State::Closed);
}

#[test]
fn reset_after_too_many_retransmissions() {
    let mut peer_a = open(100);
    peer_a.connect();
    peer_a.segments();

    for attempt in 1..=peer_a.config().max_retx_attempts {
        let rto = peer_a.sender().rto();
        peer_a.tick(rto);
        assert!(peer_a.active());
        assert_eq!(peer_a.sender().consecutive_retransmissions(), attempt);
        let resent = peer_a.segments();
        assert_eq!(resent.len(), 1);
        assert!(resent[0].header.ctl.syn());
    }

    let rto = peer_a.sender().rto();
    peer_a.tick(rto);
    assert!(!peer_a.active());
    assert_eq!(peer_a.state(), State::Reset);
    let last = peer_a.segments();
    assert_eq!(last.len(), 1);
    assert!(last[0].header.ctl.rst());
    assert_eq!(last[0].header.seqno, SeqNum::new(101));
    assert!(peer_a.inbound_stream().error());
    assert!(peer_a.sender().stream_in().error());
}

#[test]
fn rst_resets_without_reply() {
    let (mut peer_a, _peer_b) = established();
    let rst = Segment::new(HeaderBuilder::new(SeqNum::new(301)).rst().build(), "");
    peer_a.segment_received(&rst);
    assert_eq!(peer_a.state(), State::Reset);
    assert!(peer_a.segments().is_empty());
    assert!(peer_a.inbound_stream().error());
    assert!(peer_a.sender().stream_in().error());

    // Nothing more happens to a reset connection
    peer_a.segment_received(&ack(301, 101));
    peer_a.tick(100 * TIMEOUT_DFLT);
    assert!(peer_a.segments().is_empty());
}

#[test]
fn keep_alive_is_answered() {
    let (mut peer_a, _peer_b) = established();

    // One below the next expected sequence number, occupying nothing
    peer_a.segment_received(&ack(300, 101));
    let reply = peer_a.segments();
    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0].header.seqno, SeqNum::new(101));
    assert_eq!(reply[0].header.ack_number(), Some(SeqNum::new(301)));
    assert_eq!(reply[0].length_in_sequence_space(), 0);

    // A bare ACK at the expected sequence number needs no reply
    peer_a.segment_received(&ack(301, 101));
    assert!(peer_a.segments().is_empty());
}

#[test]
fn listener_ignores_stray_segments() {
    let mut peer_b = open(300);
    peer_b.segment_received(&ack(100, 300));
    assert_eq!(peer_b.state(), State::Listen);
    assert!(peer_b.segments().is_empty());
    assert_eq!(peer_b.sender().next_seqno_absolute(), 0);
}

#[test]
fn close_is_idempotent() {
    let (mut peer_a, _peer_b) = established();
    peer_a.close();
    assert_eq!(peer_a.state(), State::Reset);
    let segments = peer_a.segments();
    assert_eq!(segments.len(), 1);
    assert!(segments[0].header.ctl.rst());
    assert_eq!(segments[0].header.seqno, SeqNum::new(101));

    peer_a.close();
    assert!(peer_a.segments().is_empty());
}

#[test]
#[traced_test]
fn dropping_active_connection_warns() {
    let (peer_a, mut peer_b) = established();
    drop(peer_a);
    assert!(logs_contain("Dropping an active connection"));
    peer_b.close();
}

#[test]
fn window_is_capped_at_sixteen_bits() {
    let config = TcpConfig::default().capacity(100_000).fixed_isn(5);
    let mut rng = SmallRng::seed_from_u64(0xBAD5EED);
    let mut peer_a = Connection::new(config, &mut rng);
    let mut peer_b = Connection::new(config.fixed_isn(9), &mut rng);
    peer_a.connect();
    for segment in peer_a.segments() {
        peer_b.segment_received(&segment);
    }
    let syn_ack = peer_b.segments().remove(0);
    assert_eq!(syn_ack.header.window, u16::MAX);
    peer_a.close();
    peer_b.close();
}

#[test]
fn isn_comes_from_rng() {
    let mut rng = SmallRng::seed_from_u64(7);
    let expected: u32 = SmallRng::seed_from_u64(7).gen();
    let mut connection = Connection::new(TcpConfig::default(), &mut rng);
    connection.connect();
    assert_eq!(connection.segments()[0].header.seqno, SeqNum::new(expected));
    connection.close();
}

#[test]
fn writes_are_clipped_to_outbound_capacity() {
    let (mut peer_a, _peer_b) = established();
    let data = vec![0x42; CAPACITY + 100];

    // The peer's window takes everything the stream can hold
    assert_eq!(peer_a.write(&data), CAPACITY);
    assert_eq!(peer_a.bytes_in_flight(), CAPACITY as u64);
    assert_eq!(peer_a.remaining_outbound_capacity(), CAPACITY);
    assert_eq!(peer_a.segments().len(), 5);

    // With the window full, written bytes wait in the stream
    assert_eq!(peer_a.write(&data), CAPACITY);
    assert_eq!(peer_a.remaining_outbound_capacity(), 0);
    assert!(peer_a.segments().is_empty());
    assert_eq!(peer_a.write(&data), 0);
}
