//! Sender-side reliability engine.
//!
//! `SenderState` owns every piece of mutable session state -- sequence
//! cursor, loaded/in-flight buffers, RTT/RTO estimate, congestion window,
//! duplicate-ack counter, end-of-file flag -- as one record passed
//! explicitly to each operation rather than scattered globals. `loaded` and
//! `sent` are kept as two `BTreeMap`s keyed by *post-packet* sequence so a
//! packet is always owned by exactly one collection and ordered traversal
//! for transmission is free.

use std::io::Read;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::Config;
use crate::congestion::{Aimd, CongestionController};
use crate::error::{Result, TransportError};
use crate::rtt::RttEstimator;
use crate::seq::wrap_sequence;
use crate::socket::{RecvOutcome, Substrate};
use crate::wire::Packet;

/// A packet payload plus the sequence number of its first byte, kept in
/// `loaded`/`sent` (the post-packet sequence is the map key).
#[derive(Debug, Clone)]
struct PacketRecord {
    seq_start: u32,
    payload: Vec<u8>,
    eof: bool,
}

impl PacketRecord {
    fn to_packet(&self) -> Packet {
        Packet::data(self.seq_start, &self.payload, self.eof)
    }
}

/// An in-flight packet, augmented with send bookkeeping.
#[derive(Debug, Clone)]
struct InFlight {
    record: PacketRecord,
    timestamp: Instant,
    /// Per-packet deadline, recorded for diagnostics only -- the event
    /// loop's global RTO wait is the real retransmission clock.
    #[allow(dead_code)]
    timeout: Instant,
}

/// What happened while processing one inbound ACK-bearing datagram.
pub enum AckEvent {
    /// The ACK retired an in-flight packet; RTT and CWND were updated.
    Retired,
    /// The datagram carried a `syn` bit; ignored as a stray handshake retry.
    StraySyn,
    /// The ACK didn't retire anything and the duplicate count is still below 3.
    Duplicate,
    /// Three duplicate ACKs triggered fast retransmit + fast recovery.
    /// Carries the packets that must be retransmitted now, in window order.
    FastRetransmit(Vec<Packet>),
}

pub struct SenderState {
    config: Config,
    sequence: u32,
    loaded: std::collections::BTreeMap<u32, PacketRecord>,
    sent: std::collections::BTreeMap<u32, InFlight>,
    rtt: RttEstimator,
    congestion: Aimd,
    dup_acks: u32,
    end_of_file: bool,
}

impl SenderState {
    /// Create a new sender with a uniformly random initial sequence number.
    pub fn new(config: Config) -> Self {
        let sequence = rand::thread_rng().gen_range(0..=u32::MAX - 1);
        Self::with_sequence(config, sequence)
    }

    fn with_sequence(config: Config, sequence: u32) -> Self {
        Self {
            rtt: RttEstimator::new(config.rtt_alpha, config.min_rto, config.bootstrap_rto),
            congestion: Aimd::new(config.initial_cwnd, config.initial_ssthresh),
            config,
            sequence,
            loaded: Default::default(),
            sent: Default::default(),
            dup_acks: 0,
            end_of_file: false,
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn cwnd(&self) -> f64 {
        self.congestion.cwnd()
    }

    pub fn rto(&self) -> Duration {
        self.rtt.rto_duration()
    }

    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    pub fn sent_len(&self) -> usize {
        self.sent.len()
    }

    pub fn end_of_file(&self) -> bool {
        self.end_of_file
    }

    /// True once input is exhausted and nothing remains loaded or in flight.
    pub fn is_complete(&self) -> bool {
        self.end_of_file && self.loaded.is_empty() && self.sent.is_empty()
    }

    fn cwnd_floor(&self) -> usize {
        self.congestion.cwnd().floor().max(1.0) as usize
    }

    /// Perform the three-way handshake, retrying from SYN on timeout or
    /// mismatch. On success, seeds the RTT estimator from the elapsed
    /// wall-clock and advances `sequence` to the receiver's expected next
    /// offset.
    pub fn handshake(&mut self, substrate: &Substrate, dest: &str) -> Result<()> {
        let start = Instant::now();
        loop {
            let syn_seq = self.sequence;
            substrate.send_to(&Packet::syn(syn_seq), dest)?;
            tracing::info!("[send syn] {syn_seq}");

            match substrate.recv_timeout(self.config.handshake_timeout, self.config.msg_size)? {
                RecvOutcome::Packet(reply, _addr) => {
                    let expected_ack = wrap_sequence(syn_seq, 1);
                    let echoed = reply.syn.and_then(|s| s.as_echo());
                    if let (Some(echoed_syn), Some(ack)) = (echoed, reply.ack) {
                        if ack == expected_ack {
                            tracing::info!("[recv syn/ack] {echoed_syn}/{ack}");
                            self.sequence = ack;
                            let final_ack = wrap_sequence(echoed_syn, 1);
                            substrate.send_to(&Packet::syn_final(self.sequence, final_ack), dest)?;

                            let elapsed = start.elapsed().as_secs_f64();
                            self.rtt.update(elapsed);
                            return Ok(());
                        }
                        tracing::warn!(
                            "[error] syn/ack did not match expectation {:?}/{:?}",
                            echoed,
                            reply.ack
                        );
                    } else {
                        tracing::warn!("[error] malformed handshake reply");
                    }
                }
                RecvOutcome::Corrupt => {
                    tracing::warn!("[error] corrupt packet during handshake");
                }
                RecvOutcome::TimedOut => {
                    tracing::warn!("[error] timeout during handshake");
                }
            }
        }
    }

    /// Read up to `floor(CWND) - len(loaded)` chunks from `reader`, queuing
    /// each as a loaded packet. A short read marks EOF on that packet; a
    /// zero-byte read is reported back as a standalone EOF sentinel for the
    /// caller to transmit immediately (it never enters `loaded`/`sent`).
    pub fn load_from_reader<R: Read>(&mut self, reader: &mut R) -> Result<Option<Packet>> {
        if self.end_of_file {
            return Ok(None);
        }

        let budget = self.cwnd_floor().saturating_sub(self.loaded.len());
        let mut buf = vec![0u8; self.config.data_size];

        for _ in 0..budget {
            let n = read_up_to(reader, &mut buf)?;
            if n > 0 {
                let eof = n < self.config.data_size;
                self.end_of_file = eof;
                let seq_start = self.sequence;
                let payload = buf[..n].to_vec();
                self.sequence = wrap_sequence(seq_start, n);
                self.loaded.insert(
                    self.sequence,
                    PacketRecord {
                        seq_start,
                        payload,
                        eof,
                    },
                );
                if eof {
                    break;
                }
            } else {
                self.end_of_file = true;
                return Ok(Some(Packet::eof_sentinel()));
            }
        }
        Ok(None)
    }

    /// Move packets from `loaded` into `sent` in ascending key order while
    /// there is room in the window, returning the packets to transmit on
    /// the wire.
    pub fn transmit(&mut self, now: Instant) -> Vec<Packet> {
        let mut out = Vec::new();
        let keys: Vec<u32> = self.loaded.keys().copied().collect();
        for key in keys {
            if self.sent.len() >= self.cwnd_floor() {
                break;
            }
            let record = self.loaded.remove(&key).expect("key just read from loaded");
            let packet = record.to_packet();
            tracing::debug!("[send data] {} ({})", record.seq_start, packet.data_len());
            self.sent.insert(
                key,
                InFlight {
                    record,
                    timestamp: now,
                    timeout: now + self.rtt.rto_duration(),
                },
            );
            out.push(packet);
        }
        out
    }

    /// Process an inbound datagram carrying `ack`.
    pub fn handle_ack(&mut self, ack: Option<u32>, has_syn: bool, now: Instant) -> AckEvent {
        if let Some(ack) = ack {
            if let Some(in_flight) = self.sent.remove(&ack) {
                tracing::debug!("[recv ack] {ack}");
                self.dup_acks = 0;
                let sample = now.duration_since(in_flight.timestamp).as_secs_f64();
                self.rtt.update(sample);
                tracing::debug!("[update RTO] {}", self.rtt.rto());
                self.congestion.on_ack();
                return AckEvent::Retired;
            }
        }

        // A syn-bearing datagram (with or without an ack) that didn't match
        // an in-flight packet is a stray handshake retry -- it never counts
        // toward the duplicate-ack retransmit trigger.
        if has_syn {
            return AckEvent::StraySyn;
        }

        self.count_duplicate()
    }

    fn count_duplicate(&mut self) -> AckEvent {
        self.dup_acks += 1;
        if self.dup_acks == 3 {
            self.dup_acks = 0;
            tracing::info!("[fast retransmit] resending packets");
            self.resurface_all();
            // Resend at the pre-fast-recovery window size; only *future*
            // growth is governed by the halved cwnd.
            let packets = self.transmit(Instant::now());
            self.congestion.on_triple_duplicate_ack();
            AckEvent::FastRetransmit(packets)
        } else {
            AckEvent::Duplicate
        }
    }

    /// Timeout-driven retransmission. Resets slow start, pessimistically
    /// re-estimates RTT from the current RTO, and returns the packets to
    /// retransmit within the new (size-1) window.
    pub fn handle_timeout(&mut self, now: Instant) -> Vec<Packet> {
        tracing::info!("[timeout] resending packets");
        self.congestion.on_timeout();

        // Re-estimate RTT as if the sample were `now - RTO` (pessimistic).
        let pessimistic_sample = self.rtt.rto();
        self.rtt.update(pessimistic_sample);
        tracing::debug!("[update RTO] {}", self.rtt.rto());

        self.resurface_all();
        self.transmit(now)
    }

    /// Move every in-flight packet back into `loaded`, preserving ascending
    /// key order for the next windowed `transmit`.
    fn resurface_all(&mut self) {
        for (key, in_flight) in std::mem::take(&mut self.sent) {
            self.loaded.insert(key, in_flight.record);
        }
    }
}

/// Read into `buf` until it is either full or the underlying reader returns
/// `0` once (a genuine EOF) -- `Read::read` is permitted to return short of
/// a full buffer without that meaning EOF, so a single `read` call is not
/// sufficient to detect a short read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(total)
}
