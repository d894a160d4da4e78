use sponge::cli::parse_args;
use std::process::ExitCode;

/// Without arguments, main runs a lossless transfer with the default settings
fn main() -> ExitCode {
    println!("Sponge v{}", env!("CARGO_PKG_VERSION"));
    match parse_args() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
