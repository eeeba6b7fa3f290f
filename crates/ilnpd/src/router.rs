//! The router task: consumes parsed packets from the to-route queue, performs source-locator
//! backward learning, dispatches control packets to the control plane, and forwards or locally
//! delivers data packets using the forwarding table. Also the host application's front door —
//! `send`/`receive` enqueue and dequeue through the very same queues the network uses.
//!
//! Grounded on `router.py::Router`, rendered as one tokio task reading an `mpsc::Receiver`
//! instead of a `threading.Thread` blocking on a queue.

use crate::control::ControlPlane;
use crate::net::listener::InboundPacket;
use crate::net::LinkInterface;
use ilnp_common::Address;
use ilnp_proto::header::IlnpHeader;
use ilnp_proto::transport::{
    TransportBody,
    TransportMessage,
};
use ilnp_proto::IlnpPacket;
use log::{
    debug,
    info,
    warn,
};
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{
    mpsc,
    Mutex,
};

/// Errors the host application's `send`/`receive` calls can surface. Every other error in the
/// router loop is contained and logged, never returned to the caller.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("cannot send: the router has stopped")]
    HostSendOnClosed,
}

/// One packet delivered to the host application: its payload and the id it arrived from.
pub type HostDelivery = (Vec<u8>, u64);

/// The host application's handle onto a running router: `send` enqueues a host-originated
/// packet on the same to-route queue the network uses, `receive` dequeues payloads addressed to
/// this node. Cloning is cheap; every clone shares the same underlying queues.
pub struct RouterHandle<L: LinkInterface> {
    my_address: Address,
    control_plane: Arc<ControlPlane<L>>,
    to_route: mpsc::Sender<InboundPacket>,
    host_inbox: Arc<Mutex<mpsc::UnboundedReceiver<HostDelivery>>>,
}

impl<L: LinkInterface> Clone for RouterHandle<L> {
    fn clone(&self) -> Self {
        Self {
            my_address: self.my_address,
            control_plane: self.control_plane.clone(),
            to_route: self.to_route.clone(),
            host_inbox: self.host_inbox.clone(),
        }
    }
}

impl<L: LinkInterface> RouterHandle<L> {
    fn new(my_address: Address, control_plane: Arc<ControlPlane<L>>, to_route: mpsc::Sender<InboundPacket>, host_inbox: mpsc::UnboundedReceiver<HostDelivery>) -> Self {
        Self {
            my_address,
            control_plane,
            to_route,
            host_inbox: Arc::new(Mutex::new(host_inbox)),
        }
    }

    /// Hands `payload` to the router as a data packet addressed to `dest_id`. If this node has
    /// previously resolved `dest_id`'s locator (via the forwarding table's locator cache), the
    /// outgoing packet already carries it, so the router can forward directly instead of
    /// re-running reactive discovery. Otherwise the locator is left unresolved and the router
    /// triggers discovery itself. Grounded on `router.py::Router.send`.
    pub async fn send(&self, payload: Vec<u8>, dest_id: u64) -> Result<(), RouterError> {
        let known_locator = self.control_plane.cached_locator_for(dest_id).await;
        let dst = match known_locator {
            Some(locator) => Address::new(locator, dest_id),
            None => Address::with_unknown_locator(dest_id),
        };

        let header = IlnpHeader {
            version: 6,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 0,
            next_header: ilnp_proto::header::NextHeader::Data,
            hop_limit: crate::control::DEFAULT_HOP_LIMIT,
            src: self.my_address,
            dst,
        };
        let message = TransportMessage::data(payload);
        self.to_route.send(InboundPacket { header, message }).await.map_err(|_| RouterError::HostSendOnClosed)
    }

    /// Blocks until a data packet addressed to this node arrives, returning its payload and
    /// sender id. Returns `None` once the router has shut down and no further deliveries will
    /// ever arrive. Grounded on `router.py::Router.receive`.
    pub async fn receive(&self) -> Option<HostDelivery> {
        self.host_inbox.lock().await.recv().await
    }
}

/// The router task itself. Owns the control plane and link it forwards through; its queues are
/// shared with the listener task (inbound) and [`RouterHandle`] (host-originated, and host
/// delivery).
pub struct Router<L: LinkInterface> {
    my_address: Address,
    control_plane: Arc<ControlPlane<L>>,
    link: Arc<L>,
    host_outbox: mpsc::UnboundedSender<HostDelivery>,
}

/// Builds a router task plus the handle the host application drives it with, and the sender the
/// link listener feeds inbound packets into.
pub fn build<L: LinkInterface>(my_address: Address, control_plane: Arc<ControlPlane<L>>, link: Arc<L>) -> (Router<L>, RouterHandle<L>, mpsc::Sender<InboundPacket>, mpsc::Receiver<InboundPacket>) {
    let (to_route_tx, to_route_rx) = mpsc::channel(256);
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let router = Router {
        my_address,
        control_plane: control_plane.clone(),
        link,
        host_outbox: host_tx,
    };
    let handle = RouterHandle::new(my_address, control_plane, to_route_tx.clone(), host_rx);
    (router, handle, to_route_tx, to_route_rx)
}

fn rebuild_packet(header: &IlnpHeader, message: &TransportMessage, hop_limit: u8) -> IlnpPacket {
    let payload = message.pack();
    IlnpPacket {
        header: IlnpHeader {
            payload_length: payload.len() as u16,
            hop_limit,
            ..*header
        },
        payload,
    }
}

impl<L: LinkInterface> Router<L> {
    /// Runs the router loop until `shutdown` is set and the to-route queue is drained and
    /// closed. Grounded on `router.py::Router.run`.
    pub async fn run(self, mut to_route: mpsc::Receiver<InboundPacket>, shutdown: Arc<AtomicBool>) {
        info!("router starting");

        loop {
            let received = tokio::time::timeout(std::time::Duration::from_secs(3), to_route.recv()).await;
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let Ok(maybe_packet) = received else {
                continue;
            };
            let Some(inbound) = maybe_packet else {
                break;
            };

            self.handle_one(inbound).await;
        }

        info!("router finished");
    }

    async fn handle_one(&self, inbound: InboundPacket) {
        let InboundPacket { header, message } = inbound;

        if header.src.id != self.my_address.id {
            self.control_plane.learn_source_locator(header.src).await;
        }

        if message.is_control() {
            self.control_plane.handle_control(&header, message).await;
            return;
        }

        let TransportBody::Data(payload) = message.body else {
            return;
        };

        if header.dst.id == self.my_address.id {
            debug!("delivering {} bytes from {} to host", payload.len(), header.src.id);
            let _ = self.host_outbox.send((payload, header.src.id));
            return;
        }

        let message = TransportMessage::data(payload);
        let host_originated = header.src.id == self.my_address.id;

        if !header.dst.has_known_locator() {
            if host_originated {
                let packet = rebuild_packet(&header, &message, header.hop_limit);
                crate::control::external::find_route(&self.control_plane, packet).await;
            } else {
                debug!("dropping data packet with unknown destination locator from {}", header.src.id);
            }
            return;
        }

        let dest_is_local = header.dst.loc == self.my_address.loc;
        let next_hop = self.control_plane.next_hop(header.dst, dest_is_local).await;

        match next_hop {
            Some(next_hop) => {
                let hop_limit = header.hop_limit.saturating_sub(1);
                if hop_limit == 0 {
                    debug!("dropping data packet to {}: hop limit exhausted", header.dst);
                    return;
                }
                let packet = rebuild_packet(&header, &message, hop_limit);
                if let Err(err) = self.link.send(&packet.pack(), next_hop).await {
                    warn!("forwarding send to {next_hop} failed: {err}");
                }
            }
            None if dest_is_local => {
                debug!("dropping data packet: no id {} in this locator", header.dst.id);
            }
            None if host_originated => {
                let packet = rebuild_packet(&header, &message, header.hop_limit);
                crate::control::external::find_route(&self.control_plane, packet).await;
            }
            None => {
                debug!("dropping data packet to {}: no route known", header.dst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::Battery;
    use crate::monitor::Monitor;
    use crate::net::memory::MemoryNetwork;
    use std::time::Duration;

    fn make_plane(my_address: Address, link: Arc<crate::net::memory::MemoryLinkInterface>) -> Arc<ControlPlane<crate::net::memory::MemoryLinkInterface>> {
        Arc::new(ControlPlane::new(my_address, Arc::new(Battery::new(1_000)), Arc::new(Monitor::new(my_address.id)), link))
    }

    #[tokio::test]
    async fn loopback_delivers_without_touching_the_network() {
        let network = MemoryNetwork::new();
        let link = Arc::new(network.join(10, 1, Arc::new(Battery::new(1_000))));
        let plane = make_plane(Address::new(10, 1), link.clone());
        let (router, handle, _to_route_tx, to_route_rx) = build(Address::new(10, 1), plane, link.clone());

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_router = shutdown.clone();
        let join = tokio::spawn(router.run(to_route_rx, shutdown_for_router));

        handle.send(b"abc".to_vec(), 1).await.unwrap();
        let (payload, src) = handle.receive().await.unwrap();
        assert_eq!(payload, b"abc");
        assert_eq!(src, 1);

        shutdown.store(true, Ordering::Relaxed);
        let _ = tokio::time::timeout(Duration::from_secs(1), join).await;
    }

    #[tokio::test]
    async fn forwards_transit_data_using_the_internal_next_hop() {
        let network = MemoryNetwork::new();
        let battery = Arc::new(Battery::new(1_000));
        let link_a = Arc::new(network.join(10, 1, battery.clone()));
        let link_b = network.join(10, 2, battery.clone());
        let _link_x = network.join(30, 5, battery);

        let plane = make_plane(Address::new(10, 1), link_a.clone());
        {
            let mut state = plane.state.lock().await;
            state.table.add_internal_entry(3, 2);
        }
        let (router, _handle, to_route_tx, to_route_rx) = build(Address::new(10, 1), plane, link_a.clone());

        let shutdown = Arc::new(AtomicBool::new(false));
        let join = tokio::spawn(router.run(to_route_rx, shutdown.clone()));

        let header = IlnpHeader {
            version: 6,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 0,
            next_header: ilnp_proto::header::NextHeader::Data,
            hop_limit: 32,
            src: Address::new(30, 5),
            dst: Address::new(10, 3),
        };
        to_route_tx
            .send(InboundPacket {
                header,
                message: TransportMessage::data(b"transit".to_vec()),
            })
            .await
            .unwrap();

        let received = link_b.receive(Duration::from_millis(200)).await.unwrap();
        assert!(received.is_some());

        shutdown.store(true, Ordering::Relaxed);
        let _ = tokio::time::timeout(Duration::from_secs(1), join).await;
    }
}
