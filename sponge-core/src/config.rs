//! Connection parameters and the constants they default to.

use crate::sequence::SeqNum;
use thiserror::Error as ThisError;

/// Default capacity of each byte stream, in bytes
pub const DEFAULT_CAPACITY: usize = 64000;
/// The largest payload a single segment carries
pub const MAX_PAYLOAD_SIZE: usize = 1000;
/// Default initial retransmission timeout, in milliseconds
pub const TIMEOUT_DFLT: u64 = 1000;
/// Consecutive retransmissions tolerated before the connection is reset
pub const MAX_RETX_ATTEMPTS: u32 = 8;
/// How many initial retransmission timeouts a finished connection lingers for
pub const LINGER_MULTIPLIER: u64 = 10;

/// The tunable parameters of a [`Connection`](crate::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
    /// Initial retransmission timeout in milliseconds
    pub rt_timeout: u64,
    /// Capacity of the inbound stream
    pub recv_capacity: usize,
    /// Capacity of the outbound stream
    pub send_capacity: usize,
    /// The initial sequence number to use instead of a random one
    pub fixed_isn: Option<SeqNum>,
    /// Consecutive retransmissions tolerated before the connection is reset
    pub max_retx_attempts: u32,
}

impl TcpConfig {
    pub fn rt_timeout(mut self, ms: u64) -> Self {
        self.rt_timeout = ms;
        self
    }

    pub fn recv_capacity(mut self, capacity: usize) -> Self {
        self.recv_capacity = capacity;
        self
    }

    pub fn send_capacity(mut self, capacity: usize) -> Self {
        self.send_capacity = capacity;
        self
    }

    /// Sets both stream capacities
    pub fn capacity(self, capacity: usize) -> Self {
        self.recv_capacity(capacity).send_capacity(capacity)
    }

    pub fn fixed_isn(mut self, isn: impl Into<SeqNum>) -> Self {
        self.fixed_isn = Some(isn.into());
        self
    }

    pub fn max_retx_attempts(mut self, attempts: u32) -> Self {
        self.max_retx_attempts = attempts;
        self
    }

    /// How long a cleanly finished connection waits for stray segments
    /// before closing.
    pub fn linger_timeout(&self) -> u64 {
        self.rt_timeout.saturating_mul(LINGER_MULTIPLIER)
    }

    /// Checks that the parameters describe a usable connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rt_timeout == 0 {
            Err(ConfigError::ZeroTimeout)?
        }
        if self.recv_capacity == 0 || self.send_capacity == 0 {
            Err(ConfigError::ZeroCapacity)?
        }
        if self.recv_capacity as u64 > u32::MAX as u64 {
            Err(ConfigError::CapacityTooLarge(self.recv_capacity))?
        }
        Ok(())
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            rt_timeout: TIMEOUT_DFLT,
            recv_capacity: DEFAULT_CAPACITY,
            send_capacity: DEFAULT_CAPACITY,
            fixed_isn: None,
            max_retx_attempts: MAX_RETX_ATTEMPTS,
        }
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("The retransmission timeout must be nonzero")]
    ZeroTimeout,
    #[error("Stream capacities must be nonzero")]
    ZeroCapacity,
    #[error("A receive capacity of {0} bytes cannot be expressed in sequence space")]
    CapacityTooLarge(usize),
}
