//! Channel-backed [`LinkInterface`] double used in place of real UDP sockets for deterministic
//! multi-node integration tests.
//!
//! Every node in a test topology shares one [`MemoryNetwork`], which models a flat collection of
//! link-local broadcast zones: a node's `broadcast` fans out to every other node registered under
//! the same zone tag, and `send` delivers directly to one peer's inbox regardless of zone,
//! mirroring how a real link only ever reaches registered one-hop neighbours.

use crate::battery::Battery;
use crate::net::{
    LinkError,
    LinkInterface,
};
use std::collections::HashMap;
use std::net::{
    IpAddr,
    Ipv6Addr,
    SocketAddr,
};
use std::sync::{
    Arc,
    Mutex,
};
use tokio::sync::mpsc;

type Inbox = mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>;

struct NetworkState {
    inboxes_by_zone: HashMap<u64, Vec<(u64, Inbox)>>,
    addr_by_id: HashMap<u64, SocketAddr>,
}

/// Shared switchboard every [`MemoryLinkInterface`] in a test topology registers with.
#[derive(Clone)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                inboxes_by_zone: HashMap::new(),
                addr_by_id: HashMap::new(),
            })),
        }
    }

    /// Registers a node in zone `zone_id` under identifier `id`, returning its link interface.
    pub fn join(&self, zone_id: u64, id: u64, battery: Arc<Battery>) -> MemoryLinkInterface {
        self.join_zones(&[zone_id], id, battery)
    }

    /// Registers a node under identifier `id` in every zone in `zone_ids`, broadcasting into and
    /// hearing broadcasts from all of them. A border node bridging two locators joins both, the
    /// same way a real deployment configures it to listen on a neighbouring locator's multicast
    /// group in addition to its own (`config.rs`'s `mcast_groups`).
    pub fn join_zones(&self, zone_ids: &[u64], id: u64, battery: Arc<Battery>) -> MemoryLinkInterface {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = synthetic_addr(id);

        let mut state = self.state.lock().expect("memory network state poisoned");
        for &zone_id in zone_ids {
            state.inboxes_by_zone.entry(zone_id).or_default().push((id, tx.clone()));
        }
        state.addr_by_id.insert(id, addr);

        MemoryLinkInterface {
            id,
            addr,
            zone_ids: zone_ids.to_vec(),
            network: self.clone(),
            battery,
            inbox: Mutex::new(rx),
        }
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

fn synthetic_addr(id: u64) -> SocketAddr {
    SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, (id >> 16) as u16, id as u16)), 0)
}

pub struct MemoryLinkInterface {
    id: u64,
    addr: SocketAddr,
    zone_ids: Vec<u64>,
    network: MemoryNetwork,
    battery: Arc<Battery>,
    inbox: Mutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>,
}

impl MemoryLinkInterface {
    fn check_battery(&self) -> Result<(), LinkError> {
        if self.battery.is_exhausted() {
            return Err(LinkError::EnergyExhausted);
        }
        Ok(())
    }
}

impl LinkInterface for MemoryLinkInterface {
    async fn broadcast(&self, bytes: &[u8]) -> Result<(), LinkError> {
        self.check_battery()?;
        let state = self.network.state.lock().expect("memory network state poisoned");
        let mut already_sent = std::collections::HashSet::new();
        for zone_id in &self.zone_ids {
            if let Some(peers) = state.inboxes_by_zone.get(zone_id) {
                for (peer_id, inbox) in peers {
                    if *peer_id != self.id && already_sent.insert(*peer_id) {
                        let _ = inbox.send((bytes.to_vec(), self.addr));
                    }
                }
            }
        }
        drop(state);
        self.battery.decrement();
        Ok(())
    }

    async fn send(&self, bytes: &[u8], next_hop: u64) -> Result<(), LinkError> {
        self.check_battery()?;
        let state = self.network.state.lock().expect("memory network state poisoned");
        let inbox = state
            .inboxes_by_zone
            .values()
            .flatten()
            .find(|(id, _)| *id == next_hop)
            .map(|(_, inbox)| inbox.clone())
            .ok_or(LinkError::UnknownNextHop(next_hop))?;
        drop(state);
        let _ = inbox.send((bytes.to_vec(), self.addr));
        self.battery.decrement();
        Ok(())
    }

    async fn receive(&self, timeout: std::time::Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, LinkError> {
        let mut inbox = self.inbox.lock().expect("memory link inbox poisoned");
        match tokio::time::timeout(timeout, inbox.recv()).await {
            Ok(Some(datagram)) => {
                self.check_battery()?;
                self.battery.decrement();
                Ok(Some(datagram))
            }
            Ok(None) => Ok(None),
            Err(_elapsed) => Ok(None),
        }
    }

    fn register(&self, _id: u64, _addr: SocketAddr) {
        // Identity resolution in the memory double is handled by `MemoryNetwork::join`; HELLO
        // senders are already reachable by id via `send`, so there is nothing to cache here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn broadcast_reaches_zone_peers_only() {
        let network = MemoryNetwork::new();
        let a = network.join(1, 10, Arc::new(Battery::new(100)));
        let b = network.join(1, 11, Arc::new(Battery::new(100)));
        let c = network.join(2, 12, Arc::new(Battery::new(100)));

        a.broadcast(b"hello").await.unwrap();

        let received = b.receive(Duration::from_millis(50)).await.unwrap();
        assert_eq!(received.unwrap().0, b"hello");

        let not_received = c.receive(Duration::from_millis(50)).await.unwrap();
        assert!(not_received.is_none());
    }

    #[tokio::test]
    async fn send_delivers_to_a_single_peer_across_zones() {
        let network = MemoryNetwork::new();
        let a = network.join(1, 10, Arc::new(Battery::new(100)));
        let b = network.join(2, 20, Arc::new(Battery::new(100)));

        a.send(b"direct", 20).await.unwrap();
        let received = b.receive(Duration::from_millis(50)).await.unwrap();
        assert_eq!(received.unwrap().0, b"direct");
    }

    #[tokio::test]
    async fn send_to_unknown_id_fails() {
        let network = MemoryNetwork::new();
        let a = network.join(1, 10, Arc::new(Battery::new(100)));
        let err = a.send(b"x", 999).await.unwrap_err();
        assert!(matches!(err, LinkError::UnknownNextHop(999)));
    }

    #[tokio::test]
    async fn exhausted_battery_blocks_sends() {
        let network = MemoryNetwork::new();
        let battery = Arc::new(Battery::new(0));
        let a = network.join(1, 10, battery);
        let err = a.broadcast(b"x").await.unwrap_err();
        assert!(matches!(err, LinkError::EnergyExhausted));
    }
}
