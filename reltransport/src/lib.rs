//! Reliable, ordered, one-way byte-stream transport over an unreliable
//! datagram substrate.
//!
//! This crate is the protocol engine shared by the `sender` and `receiver`
//! binaries: a self-describing wire codec, wrapping sequence-number
//! arithmetic, an RTT/RTO estimator, AIMD congestion control, and the two
//! peer state machines (`sender::SenderState`, `receiver::ReceiverState`).
//! Socket I/O, stdin/stdout, CLI parsing, and logging setup live in the
//! binaries -- the engine itself only touches the clock and the wire.

pub mod cli;
pub mod config;
pub mod congestion;
pub mod error;
pub mod logging;
pub mod receiver;
pub mod rtt;
pub mod sender;
pub mod seq;
pub mod socket;
pub mod wire;

pub use config::Config;
pub use error::{Result, TransportError};
pub use receiver::ReceiverState;
pub use sender::SenderState;
pub use wire::Packet;
