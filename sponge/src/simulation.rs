//! Runs a client and a server connection against each other over a pair of
//! lossy links.

use crate::link::{Link, LinkConfig, LinkStats};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use sponge_core::{
    config::{ConfigError, TcpConfig},
    segment::Ports,
    Connection, State,
};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;
use tracing::info;

const CLIENT_PORT: u16 = 0xcafe;
const SERVER_PORT: u16 = 0xbabe;

/// Everything that determines how a transfer plays out. Two runs with the
/// same configuration behave identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferConfig {
    /// The number of bytes the client sends
    pub bytes: usize,
    /// Virtual milliseconds that pass between rounds of segment exchange
    pub tick_ms: u64,
    /// Virtual time after which the transfer is abandoned
    pub max_time_ms: u64,
    /// How both links misbehave
    pub link: LinkConfig,
    /// Parameters for both connections
    pub tcp: TcpConfig,
    /// Seeds the payload, the initial sequence numbers and both links
    pub seed: u64,
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.tcp.validate()?;
        self.link.validate()?;
        if self.tick_ms == 0 {
            Err(SimulationError::ZeroTick)?
        }
        Ok(())
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            bytes: 100_000,
            tick_ms: 10,
            max_time_ms: 600_000,
            link: LinkConfig::RELIABLE,
            tcp: TcpConfig::default(),
            seed: 0xBAD5EED,
        }
    }
}

/// The outcome of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Bytes the server received, all of them verified
    pub bytes: usize,
    /// Virtual time from the client's SYN until the server closed
    pub elapsed_ms: u64,
    /// The link carrying segments from the client to the server
    pub client_link: LinkStats,
    /// The link carrying segments from the server to the client
    pub server_link: LinkStats,
    pub client_state: State,
    pub server_state: State,
}

impl Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transferred {} bytes in {} ms", self.bytes, self.elapsed_ms)?;
        for (name, stats) in [("client", self.client_link), ("server", self.server_link)] {
            writeln!(
                f,
                "  {name} link: {} sent, {} dropped, {} corrupted, {} delivered",
                stats.sent, stats.dropped, stats.corrupted, stats.delivered
            )?;
        }
        write!(
            f,
            "  final states: client {:?}, server {:?}",
            self.client_state, self.server_state
        )
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq)]
pub enum SimulationError {
    #[error("Invalid connection parameters: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("The {name} probability {value} is outside the range [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("The tick interval must be nonzero")]
    ZeroTick,
    #[error("The transfer did not finish within {elapsed_ms} ms")]
    TimedOut { elapsed_ms: u64 },
    #[error("The received bytes differ from those sent, starting at offset {offset}")]
    Corrupted { offset: usize },
    #[error("A connection was reset after {delivered} bytes were delivered")]
    ConnectionReset { delivered: usize },
}

/// Sends `config.bytes` pseudo-random bytes from a client to a server and
/// checks that every one of them arrives intact.
///
/// The client opens the connection, writes the payload as fast as its
/// outbound stream accepts it, and then ends its stream. The server reads
/// everything and ends its own stream once the client's has finished. The
/// transfer is complete when the server has closed and the client is closed
/// or lingering.
pub fn run_transfer(config: &TransferConfig) -> Result<TransferReport, SimulationError> {
    config.validate()?;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let data: Vec<u8> = (0..config.bytes).map(|_| rng.gen()).collect();

    let ports = Ports::new(CLIENT_PORT, SERVER_PORT);
    let mut client = Connection::new(config.tcp, &mut rng);
    let mut server = Connection::new(config.tcp, &mut rng);
    let mut to_server = Link::new(config.link, ports, rng.gen());
    let mut to_client = Link::new(config.link, ports.reverse(), rng.gen());

    info!(bytes = config.bytes, link = ?config.link, "Starting transfer");
    let mut written = 0;
    let mut client_ended = false;
    let mut server_ended = false;
    let mut received = 0;
    let mut elapsed = 0;
    client.connect();

    loop {
        if !client_ended {
            written += client.write(&data[written..]);
            if written == data.len() {
                client.end_input_stream();
                client_ended = true;
            }
        }

        for segment in client.segments() {
            to_server.send(&segment);
        }
        for segment in to_server.deliver() {
            server.segment_received(&segment);
        }
        for segment in server.segments() {
            to_client.send(&segment);
        }
        for segment in to_client.deliver() {
            client.segment_received(&segment);
        }

        let chunk = server.read(server.inbound_stream().buffer_size());
        verify(&data, received, &chunk)?;
        received += chunk.len();
        if !server_ended && server.inbound_stream().eof() {
            server.end_input_stream();
            server_ended = true;
        }

        if client.state() == State::Reset || server.state() == State::Reset {
            client.close();
            server.close();
            Err(SimulationError::ConnectionReset {
                delivered: received,
            })?
        }
        if !server.active() && matches!(client.state(), State::TimeWait | State::Closed) {
            break;
        }
        if elapsed >= config.max_time_ms {
            client.close();
            server.close();
            Err(SimulationError::TimedOut { elapsed_ms: elapsed })?
        }

        client.tick(config.tick_ms);
        server.tick(config.tick_ms);
        elapsed += config.tick_ms;
    }

    if received != data.len() {
        Err(SimulationError::Corrupted { offset: received })?
    }
    let client_state = client.state();
    // Nothing is left for the lingering client to hear
    client.tick(config.tcp.linger_timeout());

    let report = TransferReport {
        bytes: received,
        elapsed_ms: elapsed,
        client_link: to_server.stats(),
        server_link: to_client.stats(),
        client_state,
        server_state: server.state(),
    };
    info!(
        bytes = report.bytes,
        elapsed_ms = report.elapsed_ms,
        "Transfer complete"
    );
    Ok(report)
}

/// Checks `chunk`, which the server read starting at `offset`, against the
/// bytes that were sent.
fn verify(data: &[u8], offset: usize, chunk: &[u8]) -> Result<(), SimulationError> {
    let expected = data.get(offset..offset + chunk.len()).ok_or(SimulationError::Corrupted {
        offset: data.len(),
    })?;
    match expected.iter().zip(chunk).position(|(a, b)| a != b) {
        Some(position) => Err(SimulationError::Corrupted {
            offset: offset + position,
        }),
        None => Ok(()),
    }
}
