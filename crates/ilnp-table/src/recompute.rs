//! BFS-based recomputation of the forwarding table from the link-state graph, run whenever a
//! neighbour's λ changes or a link is gained/lost.
//!
//! Grounded on `forwardingtable.py::get_distance_and_next_hops`/`update_forwarding_table`. The
//! Python version drives its breadth-first walk with a plain list used as a stack (`queue.pop()`
//! off the end, not the front) and infers "current depth" from an incrementing counter rather
//! than from the BFS frontier itself — a holdover from its first iteration, since correct when
//! the list happens to stay FIFO-ordered but fragile in general. This version tracks each node's
//! distance directly from its BFS parent and drives the walk with a proper FIFO queue, which is
//! equivalent on a connected graph and does not depend on insertion order.

use crate::{
    graph::ZonedNetworkGraph,
    table::ForwardingTable,
    TableError,
};
use std::collections::{
    HashMap,
    VecDeque,
};

/// For every node reachable from `root_id`, its distance in hops and the set of immediate
/// next-hop node ids that all achieve that shortest distance.
pub fn distances_and_next_hops(graph: &ZonedNetworkGraph, root_id: u64) -> Result<(HashMap<u64, u32>, HashMap<u64, Vec<u64>>), TableError> {
    graph.get_node(root_id).ok_or(TableError::UnknownNode(root_id))?;

    let mut distance_from_root = HashMap::new();
    let mut next_hops_for_destination: HashMap<u64, Vec<u64>> = HashMap::new();
    distance_from_root.insert(root_id, 0u32);

    let mut queue = VecDeque::new();
    for neighbour_id in graph.get_node(root_id).unwrap().internal_neighbour_ids() {
        distance_from_root.insert(neighbour_id, 1);
        next_hops_for_destination.insert(neighbour_id, vec![neighbour_id]);
        queue.push_back(neighbour_id);
    }

    while let Some(current_id) = queue.pop_front() {
        let current_distance = distance_from_root[&current_id];
        let current_next_hops = next_hops_for_destination[&current_id].clone();
        let Some(current) = graph.get_node(current_id) else {
            continue;
        };

        for neighbour_id in current.internal_neighbour_ids() {
            match distance_from_root.get(&neighbour_id) {
                None => {
                    distance_from_root.insert(neighbour_id, current_distance + 1);
                    next_hops_for_destination.insert(neighbour_id, current_next_hops.clone());
                    queue.push_back(neighbour_id);
                }
                Some(&existing_distance) if existing_distance == current_distance + 1 => {
                    let entry = next_hops_for_destination.get_mut(&neighbour_id).unwrap();
                    for hop in &current_next_hops {
                        if !entry.contains(hop) {
                            entry.push(*hop);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok((distance_from_root, next_hops_for_destination))
}

/// Picks the best of several equal-distance first hops: highest λ, ties broken by lowest id so
/// the choice is deterministic regardless of the candidate list's iteration order.
fn best_next_hop(graph: &ZonedNetworkGraph, candidates: &[u64]) -> Option<u64> {
    candidates
        .iter()
        .filter_map(|&id| graph.get_node(id).map(|node| (id, node.lambda)))
        .max_by(|(a_id, a_lambda), (b_id, b_lambda)| a_lambda.cmp(b_lambda).then(b_id.cmp(a_id)))
        .map(|(id, _)| id)
}

/// Clears `table` and repopulates it from `graph`'s current topology, viewed from `root_id`
/// (the local node). Ties between equally-short paths are broken by preferring the next hop
/// with the higher advertised λ, the same energy-aware tie-break the original control plane uses.
pub fn recompute_forwarding_table(graph: &ZonedNetworkGraph, root_id: u64, table: &mut ForwardingTable) -> Result<(), TableError> {
    table.clear();

    let (distance_from_root, next_hops_for_destination) = distances_and_next_hops(graph, root_id)?;

    let mut current_distance_to_locator: HashMap<u64, u32> = HashMap::new();
    for (&destination_id, next_hops) in &next_hops_for_destination {
        let Some(next_hop) = best_next_hop(graph, next_hops) else {
            continue;
        };
        table.add_internal_entry(destination_id, next_hop);

        let Some(destination) = graph.get_node(destination_id) else {
            continue;
        };
        if destination.is_border_node() {
            let distance = distance_from_root[&destination_id];
            for locator in destination.linked_locators() {
                let is_better = current_distance_to_locator.get(&locator).is_none_or(|&best| best > distance);
                if is_better {
                    current_distance_to_locator.insert(locator, distance);
                    table.add_external_entry(locator, next_hop);
                }
            }
        }
    }

    let root = graph.get_node(root_id).ok_or(TableError::UnknownNode(root_id))?;
    if root.is_border_node() {
        log::info!("adding this node's own external links to the forwarding table");
        for locator in root.linked_locators() {
            let link = root.links_to_locator(locator).ok_or(TableError::UnknownLocatorLink(root_id, locator))?;
            if let Some((bridge_id, _)) = link.best_bridge_node() {
                table.add_external_entry(locator, bridge_id);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_simple_chain() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 20);
        graph.add_internal_link(2, 20, 3, 5);

        let mut table = ForwardingTable::new();
        recompute_forwarding_table(&graph, 1, &mut table).unwrap();

        assert_eq!(table.next_hop_for_local_node(2), Some(2));
        assert_eq!(table.next_hop_for_local_node(3), Some(2));
    }

    #[test]
    fn prefers_higher_lambda_next_hop_on_tie() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 5);
        graph.add_internal_link(1, 10, 3, 50);
        graph.add_internal_link(2, 5, 4, 1);
        graph.add_internal_link(3, 50, 4, 1);

        let mut table = ForwardingTable::new();
        recompute_forwarding_table(&graph, 1, &mut table).unwrap();

        assert_eq!(table.next_hop_for_local_node(4), Some(3));
    }

    #[test]
    fn adds_own_border_links_using_best_bridge() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_external_link(1, 99, 200, 3).unwrap();
        graph.add_external_link(1, 99, 201, 9).unwrap();

        let mut table = ForwardingTable::new();
        recompute_forwarding_table(&graph, 1, &mut table).unwrap();

        assert_eq!(table.next_hop_for_locator(99), Some(201));
    }

    #[test]
    fn propagates_locator_reachability_through_remote_border_node() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 20);
        graph.add_external_link(2, 99, 300, 4).unwrap();

        let mut table = ForwardingTable::new();
        recompute_forwarding_table(&graph, 1, &mut table).unwrap();

        assert_eq!(table.next_hop_for_locator(99), Some(2));
    }
}
