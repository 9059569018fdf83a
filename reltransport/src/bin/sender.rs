//! Sender binary: reads bytes from stdin and delivers them reliably to a
//! receiver at `host:port`.

use std::io;
use std::time::Instant;

use clap::Parser;

use reltransport::cli::SenderArgs;
use reltransport::config::Config;
use reltransport::sender::{AckEvent, SenderState};
use reltransport::socket::{RecvOutcome, Substrate};
use reltransport::Result;

fn main() {
    let args = SenderArgs::parse();
    reltransport::logging::init(args.verbose);

    if let Err(err) = run(&args) {
        tracing::error!("[error] {err}");
        std::process::exit(-1);
    }
}

fn run(args: &SenderArgs) -> Result<()> {
    let config = Config::default();
    let substrate = Substrate::bind_client()?;
    let mut state = SenderState::new(config);

    state.handshake(&substrate, &args.addr)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        if let Some(sentinel) = state.load_from_reader(&mut input)? {
            substrate.send_to(&sentinel, &args.addr)?;
        }
        for packet in state.transmit(Instant::now()) {
            substrate.send_to(&packet, &args.addr)?;
        }

        if state.is_complete() {
            tracing::info!("[completed]");
            return Ok(());
        }

        match substrate.recv_timeout(state.rto(), config.msg_size)? {
            RecvOutcome::Packet(reply, _addr) => {
                let event = state.handle_ack(reply.ack, reply.syn.is_some(), Instant::now());
                if let AckEvent::FastRetransmit(packets) = event {
                    for packet in packets {
                        substrate.send_to(&packet, &args.addr)?;
                    }
                }
            }
            RecvOutcome::Corrupt => {
                tracing::warn!("[recv corrupt packet]");
            }
            RecvOutcome::TimedOut => {
                for packet in state.handle_timeout(Instant::now()) {
                    substrate.send_to(&packet, &args.addr)?;
                }
            }
        }
    }
}
