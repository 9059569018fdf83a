//! Command-line surfaces for the two binaries.

use clap::Parser;

/// Read bytes from stdin and deliver them reliably to a receiver.
#[derive(Debug, Parser)]
#[command(name = "sender")]
pub struct SenderArgs {
    /// Destination in `host:port` form.
    pub addr: String,

    /// Increase log verbosity (`-v` for debug, `-vv` for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Bind an ephemeral UDP port and write received bytes to stdout.
#[derive(Debug, Parser)]
#[command(name = "receiver")]
pub struct ReceiverArgs {
    /// Increase log verbosity (`-v` for debug, `-vv` for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
