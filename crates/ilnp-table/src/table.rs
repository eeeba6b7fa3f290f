//! The computed forwarding table: next hop per local node id, next hop per neighbouring locator,
//! and a cache of which locator a given remote id was last found in.
//!
//! Grounded on `forwardingtable.py::ForwardingTable`. Rebuilt wholesale by
//! [`crate::recompute::recompute_forwarding_table`] whenever the link-state graph changes;
//! entries learned reactively (via route replies) are added directly by the daemon crate.

use ilnp_common::Address;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct ForwardingTable {
    next_hop_internal: HashMap<u64, u64>,
    next_hop_to_locator: HashMap<u64, u64>,
    locator_cache: HashMap<u64, u64>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next hop id to reach `dest`, resolving via the internal table when `dest` names a
    /// node in this zone, or via the locator table otherwise.
    pub fn next_hop(&self, dest: &Address, dest_is_local: bool) -> Option<u64> {
        if dest_is_local {
            self.next_hop_for_local_node(dest.id)
        } else {
            self.next_hop_for_locator(dest.loc)
        }
    }

    pub fn next_hop_for_local_node(&self, dest_id: u64) -> Option<u64> {
        self.next_hop_internal.get(&dest_id).copied()
    }

    pub fn next_hop_for_locator(&self, dest_locator: u64) -> Option<u64> {
        self.next_hop_to_locator.get(&dest_locator).copied()
    }

    pub fn add_internal_entry(&mut self, dest_id: u64, next_hop: u64) {
        log::info!("forwarding table: id {dest_id} -> next hop {next_hop}");
        self.next_hop_internal.insert(dest_id, next_hop);
    }

    pub fn add_external_entry(&mut self, dest_locator: u64, next_hop: u64) {
        log::info!("forwarding table: locator {dest_locator} -> next hop {next_hop}");
        self.next_hop_to_locator.insert(dest_locator, next_hop);
    }

    pub fn record_locator_for_id(&mut self, node_id: u64, node_locator: u64) {
        self.locator_cache.insert(node_id, node_locator);
    }

    pub fn locator_for_id(&self, node_id: u64) -> Option<u64> {
        self.locator_cache.get(&node_id).copied()
    }

    pub fn known_locators(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.next_hop_to_locator.iter().map(|(locator, next_hop)| (*locator, *next_hop))
    }

    pub fn has_any_locator_neighbour(&self) -> bool {
        !self.next_hop_to_locator.is_empty()
    }

    /// Clears the computed next-hop tables. The locator cache survives a clear: it records
    /// facts learned reactively, not the link-state recompute's output.
    pub fn clear(&mut self) {
        self.next_hop_internal.clear();
        self.next_hop_to_locator.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_local_and_locator_next_hops_independently() {
        let mut table = ForwardingTable::new();
        table.add_internal_entry(5, 2);
        table.add_external_entry(99, 3);

        assert_eq!(table.next_hop(&Address::new(0, 5), true), Some(2));
        assert_eq!(table.next_hop(&Address::new(99, 5), false), Some(3));
    }

    #[test]
    fn clear_preserves_locator_cache() {
        let mut table = ForwardingTable::new();
        table.add_internal_entry(5, 2);
        table.record_locator_for_id(5, 77);

        table.clear();

        assert_eq!(table.next_hop_for_local_node(5), None);
        assert_eq!(table.locator_for_id(5), Some(77));
    }
}
