//! A user-space TCP engine: the pieces needed to carry a reliable byte stream
//! in each direction over a network that may lose, duplicate, reorder, or
//! corrupt segments.
//!
//! Everything here is synchronous and single-threaded. Time is virtual and is
//! advanced only by the owner calling `tick`, which makes every run
//! deterministic and replayable.
//!
//! # Organization
//! - [`ByteStream`] is a bounded FIFO of bytes with end-of-input and error
//!   signaling
//! - [`Reassembler`] turns out-of-order, overlapping substrings back into an
//!   ordered [`ByteStream`]
//! - [`SeqNum`] converts between 32-bit wrapping sequence numbers and 64-bit
//!   absolute stream positions
//! - [`Sender`] and [`Receiver`] are the two halves of a connection
//! - [`Connection`] composes them into a full peer and runs the TCP state
//!   machine
//!
//! # Driving a connection
//!
//! The owner of a [`Connection`] moves segments between it and the network.
//! Inbound segments go to [`Connection::segment_received`], and
//! [`Connection::segments`] returns what should be sent. Elapsed time is
//! reported through [`Connection::tick`], which is where retransmission and
//! the linger timeout happen.

pub mod byte_stream;
pub use byte_stream::ByteStream;

pub mod config;
pub use config::TcpConfig;

pub mod connection;
pub use connection::{Connection, State};

pub mod logging;

pub mod payload;
pub use payload::Payload;

pub mod reassembler;
pub use reassembler::Reassembler;

pub mod receiver;
pub use receiver::{Receiver, ReceiverState};

pub mod segment;
pub use segment::Segment;

pub mod sender;
pub use sender::{Sender, SenderState};

pub mod sequence;
pub use sequence::SeqNum;

pub mod timer;
