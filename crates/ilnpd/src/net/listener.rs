//! Polls a [`LinkInterface`] for incoming datagrams, parses them into [`IlnpPacket`]s, registers
//! one-hop neighbour addresses learned from control traffic, and hands finished packets to the
//! router task.
//!
//! Grounded on `router.py::IncomingMessageParserThread`, rendered as a tokio task reading a
//! `LinkInterface` instead of a `threading.Thread` polling a raw socket.

use crate::net::LinkInterface;
use ilnp_proto::packet::IlnpPacket;
use ilnp_proto::transport::{
    PayloadKind,
    TransportMessage,
};
use log::{
    debug,
    info,
    warn,
};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Seconds between each `receive` timeout, at which the shutdown flag is re-checked.
/// Mirrors `router.py::SECONDS_BETWEEN_SHUTDOWN_CHECKS`.
pub const SECONDS_BETWEEN_SHUTDOWN_CHECKS: u64 = 3;

/// A fully decoded inbound packet, handed off to the router task for dispatch.
pub struct InboundPacket {
    pub header: ilnp_proto::header::IlnpHeader,
    pub message: TransportMessage,
}

/// Runs until `shutdown` is set or the link interface reports a fatal error.
pub async fn run<L: LinkInterface>(link: Arc<L>, to_route: mpsc::Sender<InboundPacket>, shutdown: Arc<AtomicBool>) {
    info!("link listener starting");

    while !shutdown.load(Ordering::Relaxed) {
        let received = match link.receive(Duration::from_secs(SECONDS_BETWEEN_SHUTDOWN_CHECKS)).await {
            Ok(Some(datagram)) => datagram,
            Ok(None) => continue,
            Err(err) => {
                warn!("link listener stopping: {err}");
                break;
            }
        };

        let (bytes, src_addr) = received;

        let packet = match IlnpPacket::parse(&bytes) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("dropping malformed packet from {src_addr}: {err}");
                continue;
            }
        };

        let message = match TransportMessage::parse(&packet.payload) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping packet with malformed transport payload from {src_addr}: {err}");
                continue;
            }
        };

        if matches!(message.header.payload_type, PayloadKind::ControlLocal) {
            debug!("registering {} ({src_addr}) as link-local neighbour", packet.header.src.id);
            link.register(packet.header.src.id, src_addr);
        }

        if to_route
            .send(InboundPacket {
                header: packet.header,
                message,
            })
            .await
            .is_err()
        {
            warn!("router channel closed, listener stopping");
            break;
        }
    }

    info!("link listener finished");
}
