//! Runs [`sponge_core`] connections against each other over simulated,
//! unreliable links.
//!
//! A [`Link`] carries serialized segments in one direction and may lose,
//! corrupt, or reorder them. [`run_transfer`] wires two connections together
//! with a pair of links, streams data from one to the other, and verifies
//! every byte that arrives. All time is virtual, so a transfer is fully
//! determined by its [`TransferConfig`].

pub mod cli;

pub mod link;
pub use link::{Link, LinkConfig, LinkStats};

pub mod simulation;
pub use simulation::{run_transfer, SimulationError, TransferConfig, TransferReport};
