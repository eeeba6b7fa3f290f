//! The weighted link-state graph of a single zone: full intra-zone topology plus the
//! inter-zone links advertised by this zone's border nodes.
//!
//! Grounded on `forwardingtable.py`'s `ZonedNetworkGraph`/`InternalNode`/`LocatorLink`. Nodes are
//! addressed by id through the graph's arena (`HashMap<u64, InternalNode>`) rather than via
//! neighbour back-pointers, since Rust has no natural analogue for the Python version's direct
//! object references inside a `set`.

use crate::TableError;
use ilnp_proto::control::{
    ExternalLink,
    InternalLink,
    LsdbMessage,
};
use std::collections::{
    HashMap,
    HashSet,
};

/// A link to another locator: the set of this node's neighbours in that locator (bridge nodes)
/// and the λ each advertised when the link was recorded.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct LocatorLink {
    pub locator: u64,
    bridge_node_lambdas: HashMap<u64, u32>,
}

impl LocatorLink {
    fn new(locator: u64) -> Self {
        Self {
            locator,
            bridge_node_lambdas: HashMap::new(),
        }
    }

    pub fn bridge_node_lambdas(&self) -> &HashMap<u64, u32> {
        &self.bridge_node_lambdas
    }

    fn add_bridge_node(&mut self, node_id: u64, lambda: u32) {
        self.bridge_node_lambdas.insert(node_id, lambda);
    }

    fn remove_bridge_node(&mut self, node_id: u64) {
        self.bridge_node_lambdas.remove(&node_id);
    }

    /// The bridge node with the highest λ, ties broken by lowest id for determinism (mirrors
    /// `recompute::best_next_hop`'s tie-break).
    pub fn best_bridge_node(&self) -> Option<(u64, u32)> {
        self.bridge_node_lambdas
            .iter()
            .map(|(id, lambda)| (*id, *lambda))
            .max_by(|(a_id, a_lambda), (b_id, b_lambda)| a_lambda.cmp(b_lambda).then(b_id.cmp(a_id)))
    }
}

/// A node somewhere in this zone: its own id and advertised λ, its intra-zone neighbours, and
/// any inter-zone links it bridges to as a border node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InternalNode {
    pub id: u64,
    pub lambda: u32,
    linked_node_ids: HashSet<u64>,
    locator_links: HashMap<u64, LocatorLink>,
}

impl InternalNode {
    fn new(id: u64, lambda: u32) -> Self {
        Self {
            id,
            lambda,
            linked_node_ids: HashSet::new(),
            locator_links: HashMap::new(),
        }
    }

    pub fn internal_neighbour_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.linked_node_ids.iter().copied()
    }

    pub fn linked_locators(&self) -> impl Iterator<Item = u64> + '_ {
        self.locator_links.keys().copied()
    }

    pub fn links_to_locator(&self, locator: u64) -> Option<&LocatorLink> {
        self.locator_links.get(&locator)
    }

    pub fn is_border_node(&self) -> bool {
        !self.locator_links.is_empty()
    }

    fn locator_of_bridge_node(&self, bridge_node_id: u64) -> Option<u64> {
        self.locator_links.values().find(|link| link.bridge_node_lambdas.contains_key(&bridge_node_id)).map(|link| link.locator)
    }
}

/// Full intra-zone topology plus the links this zone's border nodes advertise to neighbouring
/// locators. Always contains at least the local node.
#[derive(Debug, Clone)]
pub struct ZonedNetworkGraph {
    nodes: HashMap<u64, InternalNode>,
    locator_to_border_node_ids: HashMap<u64, Vec<u64>>,
}

impl ZonedNetworkGraph {
    pub fn new(my_id: u64, my_lambda: u32) -> Self {
        let mut graph = Self {
            nodes: HashMap::new(),
            locator_to_border_node_ids: HashMap::new(),
        };
        graph.add_node(my_id, my_lambda);
        graph
    }

    pub fn nodes(&self) -> impl Iterator<Item = &InternalNode> {
        self.nodes.values()
    }

    pub fn get_node(&self, node_id: u64) -> Option<&InternalNode> {
        self.nodes.get(&node_id)
    }

    pub fn border_node_ids(&self) -> HashSet<u64> {
        self.locator_to_border_node_ids.values().flatten().copied().collect()
    }

    pub fn add_node(&mut self, node_id: u64, node_lambda: u32) {
        log::info!("adding node {node_id} to network graph");
        self.nodes.insert(node_id, InternalNode::new(node_id, node_lambda));
    }

    pub fn add_internal_link(&mut self, from_id: u64, from_lambda: u32, to_id: u64, to_lambda: u32) {
        if !self.nodes.contains_key(&from_id) {
            self.add_node(from_id, from_lambda);
        }
        if !self.nodes.contains_key(&to_id) {
            self.add_node(to_id, to_lambda);
        }

        log::info!("adding internal link between {from_id} and {to_id}");
        self.nodes.get_mut(&from_id).unwrap().linked_node_ids.insert(to_id);
        self.nodes.get_mut(&to_id).unwrap().linked_node_ids.insert(from_id);
    }

    pub fn add_external_link(&mut self, border_node_id: u64, locator: u64, bridge_node_id: u64, lambda: u32) -> Result<(), TableError> {
        let node = self.nodes.get_mut(&border_node_id).ok_or(TableError::UnknownNode(border_node_id))?;
        node.locator_links.entry(locator).or_insert_with(|| LocatorLink::new(locator)).add_bridge_node(bridge_node_id, lambda);

        self.locator_to_border_node_ids.entry(locator).or_default().push(border_node_id);
        Ok(())
    }

    pub fn remove_external_link(&mut self, border_node_id: u64, locator: u64, bridge_node_id: u64) -> Result<(), TableError> {
        let node = self.nodes.get_mut(&border_node_id).ok_or(TableError::UnknownNode(border_node_id))?;
        let still_linked = {
            let link = node.locator_links.get_mut(&locator).ok_or(TableError::UnknownLocatorLink(border_node_id, locator))?;
            link.remove_bridge_node(bridge_node_id);
            !link.bridge_node_lambdas.is_empty()
        };
        if !still_linked {
            node.locator_links.remove(&locator);
            self.remove_node_as_locator_link(locator, border_node_id);
        }
        Ok(())
    }

    fn remove_node_as_locator_link(&mut self, locator: u64, border_node_id: u64) {
        if let Some(bridges) = self.locator_to_border_node_ids.get_mut(&locator) {
            bridges.retain(|id| *id != border_node_id);
            if bridges.is_empty() {
                self.locator_to_border_node_ids.remove(&locator);
            }
        }
    }

    pub fn remove_internal_node(&mut self, node_id: u64) {
        let Some(node) = self.nodes.remove(&node_id) else {
            return;
        };

        for neighbour_id in node.linked_node_ids {
            if let Some(neighbour) = self.nodes.get_mut(&neighbour_id) {
                neighbour.linked_node_ids.remove(&node_id);
            }
        }

        for locator in node.locator_links.keys().copied().collect::<Vec<_>>() {
            self.remove_node_as_locator_link(locator, node_id);
        }
    }

    pub fn remove_internal_link(&mut self, node_a_id: u64, node_b_id: u64) {
        if let Some(node_a) = self.nodes.get_mut(&node_a_id) {
            node_a.linked_node_ids.remove(&node_b_id);
        }
        if let Some(node_b) = self.nodes.get_mut(&node_b_id) {
            node_b.linked_node_ids.remove(&node_a_id);
        }
    }

    /// Removes the link between `node_a_id` (assumed local to this zone) and `node_b_id`, which
    /// may be either another local node or a bridge node reachable via an external link. Returns
    /// true if a link actually existed and was removed.
    pub fn remove_link(&mut self, node_a_id: u64, node_b_id: u64) -> bool {
        if self.nodes.contains_key(&node_b_id) {
            let linked = self.nodes.get(&node_a_id).is_some_and(|node| node.linked_node_ids.contains(&node_b_id));
            if linked {
                self.remove_internal_link(node_a_id, node_b_id);
                return true;
            }
            return false;
        }

        let Some(locator) = self.nodes.get(&node_a_id).and_then(|node| node.locator_of_bridge_node(node_b_id)) else {
            return false;
        };
        self.remove_external_link(node_a_id, locator, node_b_id).is_ok()
    }

    pub fn contains_internal_link(&self, link: &InternalLink) -> bool {
        let Some(node_a) = self.nodes.get(&link.a) else {
            return false;
        };
        self.nodes.contains_key(&link.b) && node_a.linked_node_ids.contains(&link.b)
    }

    pub fn contains_external_link(&self, link: &ExternalLink) -> bool {
        let Some(border_node) = self.nodes.get(&link.border_id) else {
            return false;
        };
        border_node.locator_links.get(&link.locator).is_some_and(|locator_link| locator_link.bridge_node_lambdas.contains_key(&link.bridge_id))
    }

    /// Merges in every link carried by `message` that is not already recorded. Returns true if
    /// anything new was learned, so callers know whether a recompute is warranted.
    pub fn add_all(&mut self, message: &LsdbMessage) -> bool {
        let mut changed = false;

        for link in &message.internal_links {
            if !self.contains_internal_link(link) {
                self.add_internal_link(link.a, link.a_lambda, link.b, link.b_lambda);
                changed = true;
            }
        }

        for link in &message.external_links {
            if !self.contains_external_link(link) {
                if self.add_external_link(link.border_id, link.locator, link.bridge_id, link.bridge_lambda).is_ok() {
                    changed = true;
                }
            }
        }

        changed
    }

    /// Flattens the graph back into a wire-format [`LsdbMessage`] for broadcast.
    pub fn to_lsdb_message(&self, sequence: u16) -> LsdbMessage {
        let mut seen_internal: HashMap<(u64, u64), (u32, u32)> = HashMap::new();
        for node in self.nodes.values() {
            for &neighbour_id in &node.linked_node_ids {
                let Some(neighbour) = self.nodes.get(&neighbour_id) else {
                    continue;
                };
                let (min_id, min_lambda, max_id, max_lambda) = if neighbour_id < node.id {
                    (neighbour_id, neighbour.lambda, node.id, node.lambda)
                } else {
                    (node.id, node.lambda, neighbour_id, neighbour.lambda)
                };
                seen_internal.insert((min_id, max_id), (min_lambda, max_lambda));
            }
        }

        let internal_links = seen_internal
            .into_iter()
            .map(|((a, b), (a_lambda, b_lambda))| InternalLink {
                a,
                a_lambda,
                b,
                b_lambda,
            })
            .collect();

        let mut external_links = Vec::new();
        for border_node_id in self.border_node_ids() {
            let Some(border_node) = self.nodes.get(&border_node_id) else {
                continue;
            };
            for locator_link in border_node.locator_links.values() {
                for (&bridge_id, &bridge_lambda) in &locator_link.bridge_node_lambdas {
                    external_links.push(ExternalLink {
                        border_id: border_node_id,
                        locator: locator_link.locator,
                        bridge_id,
                        bridge_lambda,
                    });
                }
            }
        }

        LsdbMessage::new(sequence, internal_links, external_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_link_is_idempotent_to_add() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 20);

        let link = InternalLink {
            a: 1,
            a_lambda: 10,
            b: 2,
            b_lambda: 20,
        };
        assert!(graph.contains_internal_link(&link));

        let changed = graph.add_all(&LsdbMessage::new(0, vec![link], Vec::new()));
        assert!(!changed);
    }

    #[test]
    fn external_link_round_trips_through_lsdb_message() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_external_link(1, 99, 42, 55).unwrap();

        let lsdb = graph.to_lsdb_message(3);
        assert_eq!(lsdb.external_links.len(), 1);
        assert_eq!(lsdb.external_links[0].locator, 99);
        assert_eq!(lsdb.external_links[0].bridge_id, 42);
    }

    #[test]
    fn removing_internal_node_clears_neighbours_and_border_links() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 20);
        graph.add_external_link(2, 7, 8, 9).unwrap();

        graph.remove_internal_node(2);

        assert!(graph.get_node(2).is_none());
        assert!(graph.get_node(1).unwrap().internal_neighbour_ids().next().is_none());
        assert!(graph.border_node_ids().is_empty());
    }

    #[test]
    fn remove_link_dispatches_to_internal_or_external() {
        let mut graph = ZonedNetworkGraph::new(1, 10);
        graph.add_internal_link(1, 10, 2, 20);
        graph.add_external_link(1, 7, 99, 5).unwrap();

        assert!(graph.remove_link(1, 2));
        assert!(graph.remove_link(1, 99));
        assert!(!graph.remove_link(1, 2));
    }
}
