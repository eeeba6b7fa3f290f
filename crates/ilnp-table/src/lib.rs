//! In-memory link-state graph, forwarding table, and reactive-discovery bookkeeping for a single
//! node's view of its zone and its known inter-zone paths.
//!
//! This crate has no notion of sockets or threads: it is the pure data layer that `ilnpd`'s
//! control plane and reactive request handler mutate in response to control messages decoded by
//! [`ilnp_proto`]. Keeping it free of I/O makes the recompute algorithm and path-cache logic
//! straightforward to exercise directly in unit tests.
//!
//! ## Layout
//! | Module        | Contents                                                              |
//! |---------------|------------------------------------------------------------------------|
//! | [`graph`]      | `ZonedNetworkGraph`, the intra-zone link-state topology                |
//! | [`recompute`]  | the BFS next-hop computation run whenever the graph changes            |
//! | [`table`]      | `ForwardingTable`, the computed next-hop/locator-cache lookup structure |
//! | [`pathcache`]  | `PathCache`, main/backup inter-zone paths discovered via route replies  |
//! | [`requests`]   | `RecentRequests` dedup ring and `PendingRequests` retry bookkeeping     |
//! | [`neighbours`] | `NeighbourLinks`, one-hop link-local neighbour ages                    |
//! | [`sequence`]   | `BoundedSequenceGenerator`, the wrapping counter backing LSDB/RREQ ids  |

pub mod graph;
pub mod neighbours;
pub mod pathcache;
pub mod recompute;
pub mod requests;
pub mod sequence;
pub mod table;

pub use graph::{
    InternalNode,
    LocatorLink,
    ZonedNetworkGraph,
};
pub use neighbours::NeighbourLinks;
pub use pathcache::PathCache;
pub use requests::{
    PendingRequests,
    RecentRequests,
};
pub use sequence::BoundedSequenceGenerator;
pub use table::ForwardingTable;

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TableError {
    #[error("node {0} is not present in the network graph")]
    UnknownNode(u64),
    #[error("node {0} has no recorded link to locator {1}")]
    UnknownLocatorLink(u64, u64),
}
