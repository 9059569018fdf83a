//! Named constants for the protocol engine.
//!
//! Folding these into one place keeps the sender/receiver engines free of
//! magic numbers.

use std::time::Duration;

/// Maximum on-wire datagram size (MTU).
pub const MSG_SIZE: usize = 1500;

/// Maximum payload bytes per data packet.
pub const DATA_SIZE: usize = 1200;

/// Sequence numbers wrap modulo this value (2^32 - 1).
pub const SEQUENCE_MODULUS: u64 = u32::MAX as u64;

/// Wall-clock wait for a handshake reply before retrying from SYN.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Receiver-side idle timeout; exceeding it is fatal.
pub const RECEIVER_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bootstrap RTO before any RTT sample exists.
pub const BOOTSTRAP_RTO: Duration = Duration::from_secs(30);

/// Lower bound enforced on RTO after the first RTT sample.
pub const MIN_RTO: Duration = Duration::from_millis(500);

/// EWMA smoothing factor for the RTT estimator.
pub const RTT_ALPHA: f64 = 0.875;

/// Initial congestion window, in packets.
pub const INITIAL_CWND: f64 = 1.0;

/// Initial slow-start threshold, in packets.
pub const INITIAL_SSTHRESH: f64 = 4.0;

/// Loopback address the receiver binds an ephemeral port on.
pub const RECEIVER_BIND_ADDR: &str = "127.0.0.1:0";

/// Runtime configuration shared by both peers.
///
/// Every field here defaults to the constant of the same name; there is
/// deliberately no CLI override for any of them -- two peers with different
/// values would silently fail to interoperate.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub data_size: usize,
    pub msg_size: usize,
    pub handshake_timeout: Duration,
    pub receiver_idle_timeout: Duration,
    pub bootstrap_rto: Duration,
    pub min_rto: Duration,
    pub rtt_alpha: f64,
    pub initial_cwnd: f64,
    pub initial_ssthresh: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_size: DATA_SIZE,
            msg_size: MSG_SIZE,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            receiver_idle_timeout: RECEIVER_IDLE_TIMEOUT,
            bootstrap_rto: BOOTSTRAP_RTO,
            min_rto: MIN_RTO,
            rtt_alpha: RTT_ALPHA,
            initial_cwnd: INITIAL_CWND,
            initial_ssthresh: INITIAL_SSTHRESH,
        }
    }
}
