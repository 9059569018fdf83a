//! Diagnostic sink setup.
//!
//! Installs a `tracing` subscriber writing microsecond-timestamped lines to
//! stderr. Verbosity is controlled by repeating `-v`: the default level is
//! `INFO` (protocol milestones -- bound port, handshake, completion,
//! timeout/retransmit events), `-v` adds `DEBUG` (per-packet send/recv/ack
//! lines), `-vv` adds `TRACE`.

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber for a binary.
///
/// `verbosity` is the number of `-v` flags passed on the command line.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
