//! Link-layer abstraction the routing core sends and receives raw bytes through.
//!
//! [`LinkInterface`] is generic-consumed (`Router<L: LinkInterface>`, `ControlPlane<L>`) rather
//! than boxed as `dyn`, since its methods are `async fn`s and a trait object would need them
//! pinned and boxed on every call for no benefit here — every caller already knows its concrete
//! link type at compile time. [`udp::UdpLinkInterface`] is the production transport;
//! [`memory::MemoryLinkInterface`] is a channel-backed double used for deterministic multi-node
//! integration tests.

pub mod listener;
pub mod memory;
pub mod udp;

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("no link-layer address known for node {0}")]
    UnknownNextHop(u64),
    #[error("link interface energy exhausted")]
    EnergyExhausted,
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The byte-pipe the routing core is built on top of: broadcast to the local zone, unicast to a
/// known one-hop neighbour, and register/receive link-layer addresses.
///
/// Implementations own their own energy accounting (see [`crate::battery::Battery`]) and return
/// [`LinkError::EnergyExhausted`] once exhausted rather than silently dropping bytes.
pub trait LinkInterface: Send + Sync + 'static {
    /// Sends `bytes` to every node in this node's own multicast zone.
    async fn broadcast(&self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Sends `bytes` to the single node `next_hop`, using its registered link-layer address.
    async fn send(&self, bytes: &[u8], next_hop: u64) -> Result<(), LinkError>;

    /// Waits up to `timeout` for an incoming datagram, returning `None` on timeout.
    async fn receive(&self, timeout: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, LinkError>;

    /// Associates `id` with `addr` for future [`Self::send`] calls, emulating neighbour discovery
    /// over a layer that has no address resolution protocol of its own.
    fn register(&self, id: u64, addr: SocketAddr);
}
