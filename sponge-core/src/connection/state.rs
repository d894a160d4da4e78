use crate::{receiver::ReceiverState, sender::SenderState};

/// The state of a connection as described in RFC 793 section 3.2. Rather than
/// being stored as a set of flags, the state is derived after every event from
/// what the sender and receiver report, plus the previous state where the two
/// alone are ambiguous. The TCP state machine is described by the diagram
/// below.
///
/// ```text
///                             +---------+ ---------\      active OPEN
///                             |  CLOSED |            \    -----------
///                             +---------+<---------\   \   create TCB
///                               |     ^              \   \  snd SYN
///                  passive OPEN |     |   CLOSE        \   \
///                  ------------ |     | ----------       \   \
///                   create TCB  |     | delete TCB         \   \
///                               V     |                      \   \
///                             +---------+            CLOSE    |    \
///                             |  LISTEN |          ---------- |     |
///                             +---------+          delete TCB |     |
///                  rcv SYN      |     |     SEND              |     |
///                 -----------   |     |    -------            |     V
/// +---------+      snd SYN,ACK  /       \   snd SYN          +---------+
/// |         |<-----------------           ------------------>|         |
/// |   SYN   |                    rcv SYN                     |   SYN   |
/// |   RCVD  |<-----------------------------------------------|   SENT  |
/// |         |                    snd ACK                     |         |
/// |         |------------------           -------------------|         |
/// +---------+   rcv ACK of SYN  \       /  rcv SYN,ACK       +---------+
///   |           --------------   |     |   -----------
///   |                  x         |     |     snd ACK
///   |                            V     V
///   |  CLOSE                   +---------+
///   | -------                  |  ESTAB  |
///   | snd FIN                  +---------+
///   |                   CLOSE    |     |    rcv FIN
///   V                  -------   |     |    -------
/// +---------+          snd FIN  /       \   snd ACK          +---------+
/// |  FIN    |<-----------------           ------------------>|  CLOSE  |
/// | WAIT-1  |------------------                              |   WAIT  |
/// +---------+          rcv FIN  \                            +---------+
///   | rcv ACK of FIN   -------   |                            CLOSE  |
///   | --------------   snd ACK   |                           ------- |
///   V        x                   V                           snd FIN V
/// +---------+                  +---------+                   +---------+
/// |FINWAIT-2|                  | CLOSING |                   | LAST-ACK|
/// +---------+                  +---------+                   +---------+
///   |                rcv ACK of FIN |                 rcv ACK of FIN |
///   |  rcv FIN       -------------- |    Timeout=linger -------------- |
///   |  -------              x       V    ------------          x     V
///    \ snd ACK                 +---------+delete TCB         +---------+
///     ------------------------>|TIME-WAIT|------------------>| CLOSED  |
///                              +---------+                   +---------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Waiting for a connection request from any remote TCP.
    Listen,
    /// Waiting for a matching connection request after having sent a
    /// connection request.
    SynSent,
    /// Waiting for a confirming connection request acknowledgment after
    /// having both received and sent a connection request.
    SynReceived,
    /// An open connection, data received can be delivered to the user.
    Established,
    /// Waiting for a connection termination request from the local user.
    CloseWait,
    /// Waiting for an acknowledgment of the connection termination request
    /// previously sent to the remote TCP, which also acknowledged its own.
    LastAck,
    /// Waiting for a connection termination request from the remote TCP, or
    /// an acknowledgment of the connection termination request previously
    /// sent.
    FinWait1,
    /// Waiting for a connection termination request from the remote TCP.
    FinWait2,
    /// Waiting for a connection termination request acknowledgment from the
    /// remote TCP.
    Closing,
    /// Both streams are finished. Lingering in case the remote TCP did not
    /// receive the acknowledgment of its connection termination request.
    TimeWait,
    /// The connection finished cleanly.
    Closed,
    /// The connection was torn down without finishing its streams.
    Reset,
}

impl State {
    /// The state after an event, given what the receiver and sender report.
    pub fn advance(self, receiver: ReceiverState, sender: SenderState) -> State {
        use ReceiverState as R;
        use SenderState as S;
        if !self.active() {
            return self;
        }
        match (receiver, sender) {
            (R::Error, _) | (_, S::Error) => State::Reset,
            (R::Listen, S::Closed) => State::Listen,
            (R::Listen, _) => State::SynSent,
            (R::SynReceived | R::FinReceived, S::Closed) => State::Listen,
            (R::SynReceived | R::FinReceived, S::SynSent) => State::SynReceived,
            (R::SynReceived, S::SynAcked) => State::Established,
            (R::SynReceived, S::FinSent) => State::FinWait1,
            (R::SynReceived, S::FinAcked) => State::FinWait2,
            (R::FinReceived, S::SynAcked) => State::CloseWait,
            (R::FinReceived, S::FinSent) if self.closing_passively() => State::LastAck,
            (R::FinReceived, S::FinSent) => State::Closing,
            (R::FinReceived, S::FinAcked) if self.closing_passively() => State::Closed,
            (R::FinReceived, S::FinAcked) => State::TimeWait,
        }
    }

    /// Whether the connection has not yet closed, cleanly or otherwise.
    pub fn active(self) -> bool {
        !matches!(self, State::Closed | State::Reset)
    }

    /// Whether the remote TCP finished its stream before this side sent its
    /// FIN. Such a connection closes without lingering.
    pub fn closing_passively(self) -> bool {
        matches!(self, State::CloseWait | State::LastAck)
    }
}
