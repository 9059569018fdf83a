//! Self-describing wire codec.
//!
//! Datagrams are text-framed JSON objects. Field *presence* is meaningful --
//! `ack: 0` and an absent `ack` are different statements -- so every
//! optional field is modeled as `Option<T>` with `skip_serializing_if`
//! rather than a sentinel value.
//!
//! `data` carries arbitrary bytes, not necessarily valid UTF-8, so it is
//! base64-encoded before being placed in the JSON string field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// The `syn` field is a bare flag during the first handshake leg and an
/// echo of the peer's initial sequence number on the reply leg, so it is
/// encoded as either a bool or an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Syn {
    Flag(bool),
    Echo(u32),
}

impl Syn {
    /// The sequence echoed back, if this is an `Echo` variant.
    pub fn as_echo(&self) -> Option<u32> {
        match self {
            Syn::Echo(s) => Some(*s),
            Syn::Flag(_) => None,
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            Syn::Flag(f) => *f,
            Syn::Echo(_) => true,
        }
    }
}

/// A single datagram on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub syn: Option<Syn>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ack: Option<u32>,
    #[serde(default)]
    pub eof: bool,
}

impl Packet {
    /// A data-bearing packet with its payload base64-encoded.
    pub fn data(sequence: u32, payload: &[u8], eof: bool) -> Self {
        Self {
            sequence,
            data: Some(BASE64.encode(payload)),
            syn: None,
            ack: None,
            eof,
        }
    }

    /// A standalone end-of-file sentinel.
    pub fn eof_sentinel() -> Self {
        Self {
            sequence: 0,
            data: None,
            syn: None,
            ack: None,
            eof: true,
        }
    }

    /// The initial handshake SYN.
    pub fn syn(sequence: u32) -> Self {
        Self {
            sequence,
            data: None,
            syn: Some(Syn::Flag(true)),
            ack: None,
            eof: false,
        }
    }

    /// The receiver's SYN/ACK reply.
    pub fn syn_ack(sequence: u32, echoed_syn: u32, ack: u32) -> Self {
        Self {
            sequence,
            data: None,
            syn: Some(Syn::Echo(echoed_syn)),
            ack: Some(ack),
            eof: false,
        }
    }

    /// The sender's final handshake leg.
    pub fn syn_final(sequence: u32, ack: u32) -> Self {
        Self {
            sequence,
            data: None,
            syn: Some(Syn::Flag(true)),
            ack: Some(ack),
            eof: false,
        }
    }

    /// A bare cumulative (or per-packet hint) ACK.
    pub fn ack_only(sequence: u32, ack: u32) -> Self {
        Self {
            sequence,
            data: None,
            syn: None,
            ack: Some(ack),
            eof: false,
        }
    }

    /// Decode this packet's base64 payload, if any.
    pub fn decoded_data(&self) -> Result<Option<Vec<u8>>> {
        match &self.data {
            Some(s) => Ok(Some(BASE64.decode(s)?)),
            None => Ok(None),
        }
    }

    /// Payload length in bytes, or 0 if there is no payload -- used purely
    /// for the diagnostic sink's `(<len>)` suffix.
    pub fn data_len(&self) -> usize {
        self.decoded_data().ok().flatten().map_or(0, |d| d.len())
    }

    /// Serialize to the wire representation.
    pub fn encode(&self) -> Vec<u8> {
        // Infallible: `Packet` contains no types that fail to serialize.
        serde_json::to_vec(self).expect("Packet serialization is infallible")
    }

    /// Parse a datagram off the wire. Corrupt input is a recoverable error --
    /// callers log and discard rather than propagate.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(TransportError::from)
    }
}
