//! Receiver binary: binds an ephemeral UDP port, reassembles the incoming
//! byte stream, and writes it to stdout in order.

use std::io::Write;

use clap::Parser;

use reltransport::cli::ReceiverArgs;
use reltransport::config::Config;
use reltransport::error::TransportError;
use reltransport::receiver::{ReceiveEvent, ReceiverState};
use reltransport::socket::{RecvOutcome, Substrate};
use reltransport::Result;

fn main() {
    let args = ReceiverArgs::parse();
    reltransport::logging::init(args.verbose);

    if let Err(err) = run(&args) {
        tracing::error!("[error] {err}");
        std::process::exit(-1);
    }
}

fn run(_args: &ReceiverArgs) -> Result<()> {
    let config = Config::default();
    let substrate = Substrate::bind_ephemeral()?;
    let port = substrate.local_addr()?.port();
    tracing::info!("[bound] {port}");

    let mut state = ReceiverState::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        match substrate.recv_timeout(config.receiver_idle_timeout, config.msg_size)? {
            RecvOutcome::Packet(packet, addr) => {
                match state.handle_packet(&packet)? {
                    ReceiveEvent::SynHandshake(reply) => substrate.reply_to(&reply, addr)?,
                    ReceiveEvent::HandshakeComplete => {}
                    ReceiveEvent::Data { emit, reply } => {
                        out.write_all(&emit)?;
                        out.flush()?;
                        substrate.reply_to(&reply, addr)?;
                    }
                    ReceiveEvent::Ack { reply } => substrate.reply_to(&reply, addr)?,
                    ReceiveEvent::Corrupt => {}
                }
                if state.is_complete() {
                    tracing::info!("[completed]");
                    return Ok(());
                }
            }
            RecvOutcome::Corrupt => {
                tracing::warn!("[recv corrupt packet]");
            }
            RecvOutcome::TimedOut => {
                tracing::error!("[error] idle timeout waiting for a datagram");
                return Err(TransportError::ReceiverIdle);
            }
        }
    }
}
