//! Receiver-side reassembly engine.
//!
//! `ReceiverState` keeps a `BTreeMap` reorder buffer that drains on
//! contiguous arrival, and replies to out-of-order and duplicate datagrams
//! with a per-packet ack hint rather than the cumulative watermark --
//! preserved as-is for interoperability with a peer built to the same wire
//! contract, even though a cumulative ack would also be correct.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::seq::wrap_sequence;
use crate::wire::Packet;

/// Classification of an inbound data packet relative to the receiver's
/// current watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InOrder,
    OutOfOrder,
    Duplicate,
}

/// What the receiver should do in response to one inbound datagram.
pub enum ReceiveEvent {
    /// Reply with a SYN/ACK; handshake still in progress.
    SynHandshake(Packet),
    /// The final handshake leg arrived; nothing to send back.
    HandshakeComplete,
    /// Bytes ready to write to the output sink, plus the ack to send.
    Data { emit: Vec<u8>, reply: Packet },
    /// No bytes to emit (buffered or discarded); just send the reply.
    Ack { reply: Packet },
    /// The envelope parsed but its payload was not valid base64; logged and
    /// discarded without altering protocol state, same as an unparsable
    /// datagram at the wire-codec layer -- no reply is sent.
    Corrupt,
}

pub struct ReceiverState {
    acked_sequence: u32,
    buffered: BTreeMap<u32, Vec<u8>>,
    end_of_file: bool,
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverState {
    pub fn new() -> Self {
        Self {
            acked_sequence: 0,
            buffered: BTreeMap::new(),
            end_of_file: false,
        }
    }

    pub fn acked_sequence(&self) -> u32 {
        self.acked_sequence
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    pub fn end_of_file(&self) -> bool {
        self.end_of_file
    }

    /// True once EOF has been observed and nothing remains buffered.
    pub fn is_complete(&self) -> bool {
        self.end_of_file && self.buffered.is_empty()
    }

    fn classify(&self, sequence: u32) -> Status {
        if sequence == self.acked_sequence {
            Status::InOrder
        } else if sequence > self.acked_sequence && !self.buffered.contains_key(&sequence) {
            Status::OutOfOrder
        } else {
            Status::Duplicate
        }
    }

    /// Process one inbound, already-decoded datagram.
    pub fn handle_packet(&mut self, packet: &Packet) -> Result<ReceiveEvent> {
        if packet.syn.is_some() {
            return Ok(self.handle_handshake_leg(packet));
        }

        let payload = match packet.decoded_data() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    "[error] corrupt payload at sequence {}: {err}",
                    packet.sequence
                );
                return Ok(ReceiveEvent::Corrupt);
            }
        };

        self.end_of_file = self.end_of_file || packet.eof;
        let status = self.classify(packet.sequence);

        match (status, payload) {
            (Status::InOrder, Some(data)) if !data.is_empty() => {
                tracing::debug!(
                    "[recv data] {} ({}) ACCEPTED (in-order)",
                    packet.sequence,
                    data.len()
                );
                let mut emit = data.clone();
                self.acked_sequence = wrap_sequence(packet.sequence, data.len());
                let reply = Packet::ack_only(0, self.acked_sequence);

                while let Some(buffered) = self.buffered.remove(&self.acked_sequence) {
                    self.acked_sequence = wrap_sequence(self.acked_sequence, buffered.len());
                    emit.extend(buffered);
                }
                Ok(ReceiveEvent::Data { emit, reply })
            }
            (Status::OutOfOrder, Some(data)) => {
                tracing::debug!(
                    "[recv data] {} ({}) ACCEPTED (out-of-order)",
                    packet.sequence,
                    data.len()
                );
                let hint = wrap_sequence(packet.sequence, data.len());
                self.buffered.insert(packet.sequence, data);
                Ok(ReceiveEvent::Ack {
                    reply: Packet::ack_only(0, hint),
                })
            }
            (_, data) => {
                let len = data.as_ref().map_or(0, |d| d.len());
                tracing::debug!(
                    "[recv data] {} ({}) IGNORED (duplicate)",
                    packet.sequence,
                    len
                );
                let hint = wrap_sequence(packet.sequence, len);
                Ok(ReceiveEvent::Ack {
                    reply: Packet::ack_only(0, hint),
                })
            }
        }
    }

    fn handle_handshake_leg(&mut self, packet: &Packet) -> ReceiveEvent {
        if packet.ack.is_some() {
            tracing::info!("[recv ack] handshake complete");
            return ReceiveEvent::HandshakeComplete;
        }
        let seq = packet.sequence;
        tracing::info!("[recv syn] {seq}");
        self.acked_sequence = wrap_sequence(seq, 1);
        ReceiveEvent::SynHandshake(Packet::syn_ack(0, seq, self.acked_sequence))
    }
}
