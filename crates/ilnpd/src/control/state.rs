//! The control plane's shared mutable state, held behind one coarse lock owned by the control
//! plane and mutated by both [`super::plane`] and [`super::external`].

use super::SEQUENCE_MODULUS;
use ilnp_table::{
    BoundedSequenceGenerator,
    ForwardingTable,
    PathCache,
    PendingRequests,
    RecentRequests,
    ZonedNetworkGraph,
};
use ilnp_table::neighbours::NeighbourLinks;

pub struct ControlPlaneState {
    pub neighbours: NeighbourLinks,
    pub graph: ZonedNetworkGraph,
    pub table: ForwardingTable,
    pub lsdb_sequence: BoundedSequenceGenerator,
    pub request_id_generator: BoundedSequenceGenerator,
    pub recent_requests: RecentRequests,
    pub pending_requests: PendingRequests,
    pub path_cache: PathCache,
    pub update_available: bool,
}

impl ControlPlaneState {
    pub fn new(my_id: u64, my_lambda: u32) -> Self {
        Self {
            neighbours: NeighbourLinks::new(),
            graph: ZonedNetworkGraph::new(my_id, my_lambda),
            table: ForwardingTable::new(),
            lsdb_sequence: BoundedSequenceGenerator::new(SEQUENCE_MODULUS),
            request_id_generator: BoundedSequenceGenerator::new(SEQUENCE_MODULUS),
            recent_requests: RecentRequests::new(),
            pending_requests: PendingRequests::new(),
            path_cache: PathCache::new(),
            update_available: false,
        }
    }
}

/// Something the control plane decided to send while holding the state lock, dispatched through
/// the link interface after the lock is released so sends never happen while the lock is held.
pub enum Outbound {
    Broadcast(Vec<u8>),
    Unicast { bytes: Vec<u8>, next_hop: u64 },
}
