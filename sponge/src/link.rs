//! A one-directional, in-memory channel with configurable misbehavior.

use crate::simulation::SimulationError;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use sponge_core::{segment::Ports, Segment};
use std::collections::VecDeque;

/// How badly a [`Link`] treats the segments given to it. Each value is the
/// independent probability, in the range [0, 1], of that thing happening to
/// a segment.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    /// The segment never arrives
    pub loss: f64,
    /// One byte of the serialized segment is flipped
    pub corruption: f64,
    /// The segment is held back and arrives after the next one
    pub reorder: f64,
}

impl LinkConfig {
    /// A link that delivers everything intact and in order.
    pub const RELIABLE: Self = Self {
        loss: 0.0,
        corruption: 0.0,
        reorder: 0.0,
    };

    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, value) in [
            ("loss", self.loss),
            ("corruption", self.corruption),
            ("reorder", self.reorder),
        ] {
            if !(0.0..=1.0).contains(&value) {
                Err(SimulationError::InvalidProbability { name, value })?
            }
        }
        Ok(())
    }
}

/// What happened to the segments a link was given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkStats {
    /// Segments given to the link
    pub sent: u64,
    /// Segments the link lost
    pub dropped: u64,
    /// Segments that arrived damaged and were discarded
    pub corrupted: u64,
    /// Segments that arrived intact
    pub delivered: u64,
}

/// A lossy link. Segments cross it in their wire format, so corruption is
/// caught by the receiving side's checksum verification just as it would be
/// on a real network.
#[derive(Debug)]
pub struct Link {
    config: LinkConfig,
    /// The ports written into every serialized header
    ports: Ports,
    /// A random number generator to determine what happens to each segment
    rng: SmallRng,
    in_transit: VecDeque<Vec<u8>>,
    /// A segment waiting for the next one to overtake it
    held: Option<Vec<u8>>,
    stats: LinkStats,
}

impl Link {
    /// Creates a link whose behavior is fully determined by `seed`.
    pub fn new(config: LinkConfig, ports: Ports, seed: u64) -> Self {
        Self {
            config,
            ports,
            rng: SmallRng::seed_from_u64(seed),
            in_transit: VecDeque::new(),
            held: None,
            stats: LinkStats::default(),
        }
    }

    /// Puts a segment on the link.
    pub fn send(&mut self, segment: &Segment) {
        self.stats.sent += 1;
        if self.rng.gen_bool(self.config.loss) {
            self.stats.dropped += 1;
            return;
        }

        let mut bytes = segment.serialize(self.ports);
        if self.rng.gen_bool(self.config.corruption) {
            let offset = self.rng.gen_range(0..bytes.len());
            bytes[offset] ^= 1u8 << self.rng.gen_range(0..8u32);
        }

        if self.held.is_none() && self.rng.gen_bool(self.config.reorder) {
            self.held = Some(bytes);
            return;
        }
        self.in_transit.push_back(bytes);
        if let Some(held) = self.held.take() {
            self.in_transit.push_back(held);
        }
    }

    /// Takes every segment that has made it across. Damaged segments are
    /// discarded here.
    pub fn deliver(&mut self) -> Vec<Segment> {
        let mut delivered = Vec::with_capacity(self.in_transit.len());
        for bytes in self.in_transit.drain(..) {
            match Segment::from_bytes(&bytes) {
                Ok((segment, _)) => {
                    self.stats.delivered += 1;
                    delivered.push(segment);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Discarding damaged segment");
                    self.stats.corrupted += 1;
                }
            }
        }
        delivered
    }

    /// Whether nothing is on its way, including a segment held back.
    pub fn is_idle(&self) -> bool {
        self.in_transit.is_empty() && self.held.is_none()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
