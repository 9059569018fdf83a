use thiserror::Error;

/// All errors produced by the reliable-transport engine.
///
/// Most variants are recoverable at the call site (a corrupt datagram is
/// logged and discarded, never bubbled up); only [`TransportError::ReceiverIdle`]
/// and I/O failures during socket setup are expected to reach `main`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed datagram: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("handshake wait timed out")]
    HandshakeTimeout,

    #[error("handshake reply did not match expectation: got syn={syn:?} ack={ack:?}")]
    HandshakeMismatch {
        syn: Option<u32>,
        ack: Option<u32>,
    },

    #[error("receiver idle for longer than the idle timeout")]
    ReceiverIdle,

    #[error("invalid target address {0:?}: expected host:port")]
    InvalidAddr(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
