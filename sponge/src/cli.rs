//! Parses the command line arguments and runs a transfer.
//!
//! Basic usage for a lossy transfer with logging on:
//!
//! ```cargo run --release -- --log --loss 0.1 --bytes 1000000```

use crate::{
    link::LinkConfig,
    simulation::{run_transfer, SimulationError, TransferConfig},
};
use clap::Parser;
use sponge_core::{
    config::{DEFAULT_CAPACITY, TIMEOUT_DFLT},
    TcpConfig,
};
use std::{
    fs::{create_dir_all, OpenOptions},
    io,
    sync::Arc,
};
use thiserror::Error as ThisError;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Stores the different command line arguments.
#[derive(Debug, Parser)]
#[command(about = "Streams bytes between two TCP connections over a simulated lossy link")]
struct Args {
    /// Logging flag. Writes JSON logs to ./logs when set.
    #[arg(short, long)]
    log: bool,
    /// Number of bytes to transfer
    #[arg(short, long, default_value_t = 100_000)]
    bytes: usize,
    /// Probability that a segment is lost
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// Probability that a segment is corrupted
    #[arg(long, default_value_t = 0.0)]
    corruption: f64,
    /// Probability that a segment arrives after the one sent after it
    #[arg(long, default_value_t = 0.0)]
    reorder: f64,
    /// Seed for the payload, initial sequence numbers, and link behavior
    #[arg(short, long, default_value_t = 0xBAD5EED)]
    seed: u64,
    /// Virtual milliseconds per round of segment exchange
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
    /// Initial retransmission timeout in milliseconds
    #[arg(long, default_value_t = TIMEOUT_DFLT)]
    rt_timeout: u64,
    /// Capacity of each connection's streams in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,
    /// Virtual time after which the transfer is abandoned
    #[arg(long, default_value_t = 600_000)]
    max_time_ms: u64,
}

impl Args {
    fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            bytes: self.bytes,
            tick_ms: self.tick_ms,
            max_time_ms: self.max_time_ms,
            link: LinkConfig {
                loss: self.loss,
                corruption: self.corruption,
                reorder: self.reorder,
            },
            tcp: TcpConfig::default()
                .rt_timeout(self.rt_timeout)
                .capacity(self.capacity),
            seed: self.seed,
        }
    }
}

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("Could not open the log file: {0}")]
    Log(#[from] io::Error),
    #[error("Could not install the log subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
    #[error("{0}")]
    Simulation(#[from] SimulationError),
}

/// Parses command line arguments, runs the transfer they describe, and
/// prints its report.
pub fn parse_args() -> Result<(), CliError> {
    let cli = Args::parse();
    if cli.log {
        initialize_logging()?;
    }
    let report = run_transfer(&cli.transfer_config())?;
    println!("{report}");
    Ok(())
}

/// Initializes the event subscriber. Should only be called once, before the
/// transfer starts. Events are written as JSON to a timestamped file in
/// ./logs.
fn initialize_logging() -> Result<(), CliError> {
    let main_path = "./logs";
    create_dir_all(main_path)?;
    let file_path = format!(
        "{}/debug-{}.log",
        main_path,
        chrono::offset::Local::now().format("%y-%m-%d_%H-%M-%S")
    );
    let file = OpenOptions::new()
        .write(true)
        .append(true)
        .create(true)
        .open(file_path)?;
    let subscriber = FmtSubscriber::builder()
        .with_writer(Arc::new(file))
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
