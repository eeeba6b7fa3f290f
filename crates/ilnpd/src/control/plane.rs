//! Neighbour tracking, HELLO/LSDB/EXPIRED_LINKS handling, and forwarding-table recomputation.
//!
//! Grounded on `control.py::RouterControlPlane`, rendered as a `tokio::sync::Mutex`-guarded state
//! struct driven by a keepalive task instead of a `threading.Thread` sleeping in a loop.

use super::external;
use super::state::{
    ControlPlaneState,
    Outbound,
};
use super::{
    calc_lambda,
    DEFAULT_HOP_LIMIT,
    HELLO_HOP_LIMIT,
    KEEPALIVE_INTERVAL,
};
use crate::battery::Battery;
use crate::monitor::Monitor;
use crate::net::LinkInterface;
use ilnp_common::Address;
use ilnp_proto::control::{
    ControlBody,
    ControlMessage,
    ExpiredLinks,
    Hello,
};
use ilnp_proto::header::{
    IlnpHeader,
    NextHeader,
};
use ilnp_proto::transport::{
    PayloadKind,
    TransportBody,
    TransportMessage,
};
use ilnp_proto::IlnpPacket;
use ilnp_table::recompute::recompute_forwarding_table;
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
use std::time::{
    SystemTime,
    UNIX_EPOCH,
};
use tokio::sync::Mutex;

pub struct ControlPlane<L: LinkInterface> {
    pub(crate) my_address: Address,
    pub(crate) battery: Arc<Battery>,
    pub(crate) monitor: Arc<Monitor>,
    pub(crate) link: Arc<L>,
    pub(crate) state: Mutex<ControlPlaneState>,
}

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn control_packet(src: Address, dst: Address, kind: PayloadKind, body: ControlBody, hop_limit: u8) -> IlnpPacket {
    let message = TransportMessage::control(kind, ControlMessage::new(body));
    IlnpPacket::new(src, dst, NextHeader::Control, hop_limit, message.pack())
}

impl<L: LinkInterface> ControlPlane<L> {
    pub fn new(my_address: Address, battery: Arc<Battery>, monitor: Arc<Monitor>, link: Arc<L>) -> Self {
        let my_lambda = calc_lambda(battery.fraction_remaining());
        Self {
            my_address,
            battery,
            monitor,
            link,
            state: Mutex::new(ControlPlaneState::new(my_address.id, my_lambda)),
        }
    }

    fn my_lambda(&self) -> u32 {
        calc_lambda(self.battery.fraction_remaining())
    }

    async fn dispatch(&self, outbound: Vec<Outbound>, is_control: bool, forwarded: bool) {
        for item in outbound {
            let result = match item {
                Outbound::Broadcast(bytes) => self.link.broadcast(&bytes).await,
                Outbound::Unicast { bytes, next_hop } => self.link.send(&bytes, next_hop).await,
            };
            match result {
                Ok(()) => self.monitor.record_sent_packet(now_unix_secs(), is_control, forwarded),
                Err(err) => warn!("control plane send failed: {err}"),
            }
        }
    }

    /// Broadcasts a HELLO carrying this node's current λ. Grounded on
    /// `control.py::__send_keepalive`.
    pub async fn send_keepalive(&self) {
        let packet = control_packet(
            self.my_address,
            Address::ALL_LINK_LOCAL,
            PayloadKind::ControlLocal,
            ControlBody::Hello(Hello { lambda: self.my_lambda() }),
            HELLO_HOP_LIMIT,
        );
        self.dispatch(vec![Outbound::Broadcast(packet.pack())], true, false).await;
    }

    async fn broadcast_lsdb(&self) {
        let outbound = {
            let mut state = self.state.lock().await;
            let lsdb = state.graph.to_lsdb_message(state.lsdb_sequence.next());
            let packet = control_packet(self.my_address, Address::ALL_LINK_LOCAL, PayloadKind::ControlLocal, ControlBody::Lsdb(lsdb), DEFAULT_HOP_LIMIT);
            vec![Outbound::Broadcast(packet.pack())]
        };
        self.dispatch(outbound, true, false).await;
    }

    /// Runs the recurring keepalive/maintenance tick: send HELLO, age neighbours, drop and
    /// announce expired links, run reactive-discovery maintenance, and recompute the forwarding
    /// table if anything changed. Grounded on `control.py::RouterControlPlane.run`.
    pub async fn run_keepalive(self: Arc<Self>, shutdown: Arc<AtomicBool>) {
        info!("control plane starting");
        self.send_keepalive().await;

        let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
        ticker.tick().await;

        while !shutdown.load(Ordering::Relaxed) {
            ticker.tick().await;
            if self.battery.is_exhausted() {
                warn!("control plane stopping: battery exhausted");
                shutdown.store(true, Ordering::Relaxed);
                break;
            }

            self.send_keepalive().await;

            let (expired, recompute_needed) = {
                let mut state = self.state.lock().await;
                state.neighbours.age_all(KEEPALIVE_INTERVAL.as_secs() as u32);
                let expired = state.neighbours.pop_expired(super::MAX_AGE_OF_LINK_SECS);
                (expired, !expired.is_empty())
            };

            if !expired.is_empty() {
                info!("neighbour links expired: {expired:?}");
                self.handle_expired_links(expired).await;
            }

            external::run_maintenance(self.as_ref()).await;

            if recompute_needed || self.take_update_available().await {
                self.recompute().await;
            }
        }
        info!("control plane finished");
    }

    async fn take_update_available(&self) -> bool {
        let mut state = self.state.lock().await;
        std::mem::take(&mut state.update_available)
    }

    /// Dispatches an inbound control message to the appropriate handler. Grounded on
    /// `control.py::handle_control_packet`.
    pub async fn handle_control(&self, header: &IlnpHeader, message: TransportMessage) {
        if header.src.id == self.my_address.id {
            return;
        }

        let TransportBody::Control(control) = message.body else {
            return;
        };

        match control.body {
            ControlBody::Hello(hello) => self.handle_hello(header.src, hello).await,
            ControlBody::Lsdb(lsdb) => self.handle_lsdb_message(header.src, lsdb).await,
            ControlBody::ExpiredLinks(expired) => self.handle_expired_link_list_message(header, expired).await,
            ControlBody::LocatorRreq(rreq) => external::handle_route_request(self, header, rreq).await,
            ControlBody::LocatorRrep(rrep) => external::handle_route_reply(self, header, rrep).await,
            ControlBody::LocatorRerr(rerr) => {
                debug!("received locator link error for locator {} (not processed)", rerr.lost_locator);
            }
            ControlBody::Unknown { control_type, .. } => {
                debug!("received unknown control message type {control_type}");
            }
        }
    }

    async fn handle_hello(&self, src: Address, hello: Hello) {
        let is_known = {
            let state = self.state.lock().await;
            state.neighbours.contains(src.id)
        };

        if is_known {
            info!("refreshing neighbour link {}", src.id);
            let mut state = self.state.lock().await;
            state.neighbours.refresh(src.id);
            return;
        }

        info!("new neighbour {}", src.id);
        let is_internal = src.loc == self.my_address.loc;
        let my_lambda = self.my_lambda();

        {
            let mut state = self.state.lock().await;
            state.neighbours.add(src.id);
            if is_internal {
                state.graph.add_internal_link(self.my_address.id, my_lambda, src.id, hello.lambda);
            } else {
                let _ = state.graph.add_external_link(self.my_address.id, src.loc, src.id, hello.lambda);
            }
            state.update_available = true;
        }

        self.broadcast_lsdb().await;
    }

    async fn handle_lsdb_message(&self, src: Address, lsdb: ilnp_proto::control::LsdbMessage) {
        if src.loc != self.my_address.loc {
            debug!("discarding LSDB from other locator");
            return;
        }

        let changed = {
            let mut state = self.state.lock().await;
            let changed = state.graph.add_all(&lsdb);
            if changed {
                state.lsdb_sequence.catch_up_past(lsdb.sequence);
                state.update_available = true;
            }
            changed
        };

        if changed {
            info!("change detected from local network LSDB");
            self.broadcast_lsdb().await;
        } else {
            debug!("no new information in LSDB, discarding");
        }
    }

    async fn handle_expired_link_list_message(&self, header: &IlnpHeader, expired: ExpiredLinks) {
        if header.src.loc != self.my_address.loc {
            debug!("link failure in other locator, not my concern");
            return;
        }

        let central_node_id = header.src.id;
        let (learned_something, hop_limit_after_decrement) = {
            let mut state = self.state.lock().await;
            let mut learned = false;
            for lost_id in &expired.lost_ids {
                learned |= state.graph.remove_link(central_node_id, *lost_id);
            }
            if learned {
                state.update_available = true;
            }
            (learned, header.hop_limit.saturating_sub(1))
        };

        if learned_something && hop_limit_after_decrement > 0 {
            let packet = control_packet(header.src, Address::ALL_LINK_LOCAL, PayloadKind::ControlLocal, ControlBody::ExpiredLinks(expired), hop_limit_after_decrement);
            self.dispatch(vec![Outbound::Broadcast(packet.pack())], true, true).await;
        }
    }

    async fn handle_expired_links(&self, expired: Vec<u64>) {
        {
            let mut state = self.state.lock().await;
            for expired_id in &expired {
                state.graph.remove_link(self.my_address.id, *expired_id);
            }
        }

        let packet = control_packet(self.my_address, Address::ALL_LINK_LOCAL, PayloadKind::ControlLocal, ControlBody::ExpiredLinks(ExpiredLinks::new(expired)), DEFAULT_HOP_LIMIT);
        self.dispatch(vec![Outbound::Broadcast(packet.pack())], true, false).await;
    }

    /// Backward learning: records the locator a packet's source was last observed in. Grounded
    /// on `router.py::Router.route_packet`'s `forwarding_table.locator_cache[src.id] = src.loc`.
    pub async fn learn_source_locator(&self, src: Address) {
        if src.id == self.my_address.id || !src.has_known_locator() {
            return;
        }
        let mut state = self.state.lock().await;
        state.table.record_locator_for_id(src.id, src.loc);
    }

    /// Looks up the next hop for `dest` in the current forwarding table snapshot.
    pub async fn next_hop(&self, dest: Address, dest_is_local: bool) -> Option<u64> {
        let state = self.state.lock().await;
        state.table.next_hop(&dest, dest_is_local)
    }

    /// Looks up a remote id's last-known locator, so the host's outgoing packets can skip
    /// reactive discovery entirely once a destination has already been resolved once.
    pub async fn cached_locator_for(&self, id: u64) -> Option<u64> {
        let state = self.state.lock().await;
        state.table.locator_for_id(id)
    }

    /// Whether `neighbour_id` currently has a live link-local entry. Exposed for integration
    /// tests driving multiple nodes over [`crate::net::memory::MemoryNetwork`], which assert
    /// directly on neighbour-table membership rather than only on its effects.
    pub async fn has_neighbour(&self, neighbour_id: u64) -> bool {
        self.state.lock().await.neighbours.contains(neighbour_id)
    }

    /// Number of destinations this node is currently awaiting a `LOCATOR_RREP` for.
    pub async fn pending_request_count(&self) -> usize {
        self.state.lock().await.pending_requests.iter().count()
    }

    /// The currently cached main path to `locator`, if any route to it has ever been discovered.
    pub async fn path_cache_main_path(&self, locator: u64) -> Option<Vec<u64>> {
        self.state.lock().await.path_cache.main_path(locator).map(|path| path.to_vec())
    }

    /// Directly installs an external next-hop entry, bypassing link-state recompute. Used by
    /// integration tests to seed a converged forwarding table without running the full
    /// keepalive/LSDB flood to reach it.
    pub async fn seed_external_route(&self, locator: u64, next_hop: u64) {
        self.state.lock().await.table.add_external_entry(locator, next_hop);
    }

    async fn recompute(&self) {
        info!("recalculating forwarding table");
        let mut state = self.state.lock().await;
        let my_id = self.my_address.id;
        if let Err(err) = recompute_forwarding_table(&state.graph, my_id, &mut state.table) {
            warn!("forwarding table recompute failed: {err}");
            return;
        }
        external::add_external_paths_to_forwarding_table(&mut state);
    }
}
