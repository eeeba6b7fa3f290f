//! Reactive inter-zone route discovery: RREQ dispatch, RREP handling, retry maintenance, and the
//! path cache that lets later requests for the same locator short-circuit with a cached reply.
//!
//! Grounded on `submission/.../interzone.py::ExternalRequestHandler`. Every handler here computes
//! its outgoing packets against a locked [`ControlPlaneState`] synchronously and returns them as
//! [`Outbound`] values, so the lock is never held across an `await`.

use super::plane::ControlPlane;
use super::state::{
    ControlPlaneState,
    Outbound,
};
use super::DEFAULT_HOP_LIMIT;
use crate::net::LinkInterface;
use ilnp_common::Address;
use ilnp_proto::control::{
    ControlBody,
    ControlMessage,
    LocatorHopList,
    LocatorRrep,
    LocatorRreq,
};
use ilnp_proto::header::{
    IlnpHeader,
    NextHeader,
};
use ilnp_proto::transport::{
    PayloadKind,
    TransportMessage,
};
use ilnp_proto::IlnpPacket;
use ilnp_table::requests::{
    AGE_UNTIL_RETRY,
    MAX_RETRIES,
};
use log::{
    debug,
    info,
    warn,
};

fn control_packet(src: Address, dst: Address, body: ControlBody, hop_limit: u8) -> IlnpPacket {
    let message = TransportMessage::control(PayloadKind::ControlExternal, ControlMessage::new(body));
    IlnpPacket::new(src, dst, NextHeader::Control, hop_limit, message.pack())
}

fn build_rreq(my_address: Address, request_id: u16, dest_id: u64, first_hop_locator: u64) -> IlnpPacket {
    let hop_list = LocatorHopList::new(vec![first_hop_locator]);
    let rreq = LocatorRreq::new(request_id, true, hop_list);
    control_packet(my_address, Address::with_unknown_locator(dest_id), ControlBody::LocatorRreq(rreq), DEFAULT_HOP_LIMIT)
}

/// Initiates a route request to every neighbouring locator. Returns `None` (and sends nothing)
/// when this node has no neighbouring locators to ask. Grounded on
/// `interzone.py::__initiate_destination_request`.
fn initiate_destination_request(state: &mut ControlPlaneState, my_address: Address, dest_id: u64) -> Option<Vec<Outbound>> {
    let locators: Vec<(u64, u64)> = state.table.known_locators().collect();
    if locators.is_empty() {
        return None;
    }

    let request_id = state.request_id_generator.next();
    let outbound = locators
        .into_iter()
        .map(|(locator, next_hop)| Outbound::Unicast {
            bytes: build_rreq(my_address, request_id, dest_id, locator).pack(),
            next_hop,
        })
        .collect();

    state.pending_requests.add_new_request(dest_id, request_id);
    Some(outbound)
}

/// Entry point for data packets whose destination locator is unknown. Grounded on
/// `interzone.py::find_route`.
pub async fn find_route<L: LinkInterface>(plane: &ControlPlane<L>, packet: IlnpPacket) {
    let dest_id = packet.header.dst.id;

    let already_pending = {
        let state = plane.state.lock().await;
        state.pending_requests.contains(dest_id)
    };

    if already_pending {
        let mut state = plane.state.lock().await;
        state.pending_requests.buffer_packet(dest_id, packet);
        return;
    }

    let outbound = {
        let mut state = plane.state.lock().await;
        initiate_destination_request(&mut state, plane.my_address, dest_id)
    };

    match outbound {
        Some(outbound) => {
            plane.dispatch(outbound, true, false).await;
            let mut state = plane.state.lock().await;
            state.pending_requests.buffer_packet(dest_id, packet);
        }
        None => info!("no neighbour locators to send destination request to, discarding packet for {dest_id}"),
    }
}

fn reply_to_locator_route_request(state: &ControlPlaneState, my_address: Address, header: &IlnpHeader, request: &LocatorRreq) -> Option<Outbound> {
    let path = &request.hop_list.locators;
    let reply = LocatorRrep::new(my_address.id, LocatorHopList::new(path.clone()));
    let packet = control_packet(my_address, header.src, ControlBody::LocatorRrep(reply), DEFAULT_HOP_LIMIT);

    let next_hop_locator = if path.len() > 1 { path[path.len() - 2] } else { header.src.loc };
    match state.table.next_hop_for_locator(next_hop_locator) {
        Some(next_hop) => Some(Outbound::Unicast { bytes: packet.pack(), next_hop }),
        None => {
            warn!("no next hop to locator {next_hop_locator}, cannot reply to route request");
            None
        }
    }
}

fn try_build_cached_reply(state: &ControlPlaneState, my_address: Address, header: &IlnpHeader, request: &LocatorRreq) -> Option<Outbound> {
    let node_locator = state.table.locator_for_id(header.dst.id)?;
    if !state.path_cache.contains(node_locator) {
        return None;
    }
    let cached_path = state.path_cache.main_path(node_locator)?.to_vec();

    let current_path = &request.hop_list.locators;
    let reply_path = match current_path.iter().position(|&locator| locator == my_address.loc) {
        Some(index) => {
            let mut prefix = current_path[..=index].to_vec();
            prefix.extend(cached_path);
            prefix
        }
        None => cached_path,
    };

    let reply = LocatorRrep::new(header.dst.id, LocatorHopList::new(reply_path.clone()));
    let packet = control_packet(my_address, header.src, ControlBody::LocatorRrep(reply), DEFAULT_HOP_LIMIT);

    let next_hop = if header.src.loc == my_address.loc {
        state.table.next_hop_for_local_node(header.src.id)
    } else {
        let next_hop_locator = if reply_path.len() > 1 { reply_path[reply_path.len() - 2] } else { header.src.loc };
        state.table.next_hop_for_locator(next_hop_locator)
    };

    next_hop.map(|next_hop| Outbound::Unicast { bytes: packet.pack(), next_hop })
}

/// Forwards a route request to every neighbouring locator not already in its path. Grounded on
/// `interzone.py::__forward_locator_route_request`/`extend_route_request`.
fn forward_locator_route_request(state: &ControlPlaneState, my_address: Address, header: &IlnpHeader, mut request: LocatorRreq) -> Vec<Outbound> {
    let hop_limit = header.hop_limit.saturating_sub(1);
    if state.table.known_locators().next().is_none() || hop_limit == 0 {
        return Vec::new();
    }

    let Some(&frontier_locator) = request.hop_list.locators.last() else {
        return Vec::new();
    };

    // `frontier_locator` names the locator this request is currently travelling towards. If it
    // isn't this node's own locator yet, just relay it unchanged towards that locator.
    if frontier_locator != my_address.loc {
        return match state.table.next_hop_for_locator(frontier_locator) {
            Some(next_hop) => {
                let packet = control_packet(header.src, header.dst, ControlBody::LocatorRreq(request), hop_limit);
                vec![Outbound::Unicast { bytes: packet.pack(), next_hop }]
            }
            None => Vec::new(),
        };
    }

    let visited: Vec<u64> = request.hop_list.locators.clone();
    let unvisited: Vec<u64> = state.table.known_locators().map(|(locator, _)| locator).filter(|locator| !visited.contains(locator) && *locator != header.src.loc).collect();
    if unvisited.is_empty() {
        return Vec::new();
    }

    request.hop_list.locators.push(0);
    let last_index = request.hop_list.locators.len() - 1;

    let mut outbound = Vec::new();
    for locator in unvisited {
        request.hop_list.locators[last_index] = locator;
        if let Some(next_hop) = state.table.next_hop_for_locator(locator) {
            let packet = control_packet(header.src, header.dst, ControlBody::LocatorRreq(request.clone()), hop_limit);
            outbound.push(Outbound::Unicast { bytes: packet.pack(), next_hop });
        }
    }
    outbound
}

/// Processes an inbound `LOCATOR_RREQ`. Grounded on
/// `interzone.py::handle_locator_route_request`.
pub async fn handle_route_request<L: LinkInterface>(plane: &ControlPlane<L>, header: &IlnpHeader, request: LocatorRreq) {
    if header.dst.id == plane.my_address.id {
        info!("route request is for me, replying");
        let outbound = {
            let state = plane.state.lock().await;
            reply_to_locator_route_request(&state, plane.my_address, header, &request).into_iter().collect::<Vec<_>>()
        };
        plane.dispatch(outbound, true, false).await;
        return;
    }

    let already_seen = {
        let state = plane.state.lock().await;
        state.recent_requests.contains(header.src.id, request.request_id as u64)
    };
    if already_seen {
        debug!("seen request {} from {} too recently, discarding", request.request_id, header.src.id);
        return;
    }

    let in_my_locator = {
        let state = plane.state.lock().await;
        state.table.next_hop_for_local_node(header.dst.id).is_some()
    };

    let outbound = if in_my_locator {
        info!("request is for an id in my locator, replying");
        let state = plane.state.lock().await;
        reply_to_locator_route_request(&state, plane.my_address, header, &request).into_iter().collect::<Vec<_>>()
    } else if request.allow_cached_replies {
        let state = plane.state.lock().await;
        match try_build_cached_reply(&state, plane.my_address, header, &request) {
            Some(outbound) => vec![outbound],
            None => {
                debug!("no cached path, forwarding request");
                forward_locator_route_request(&state, plane.my_address, header, request.clone())
            }
        }
    } else {
        let state = plane.state.lock().await;
        forward_locator_route_request(&state, plane.my_address, header, request.clone())
    };

    plane.dispatch(outbound, true, true).await;

    let mut state = plane.state.lock().await;
    state.recent_requests.record(header.src.id, request.request_id as u64);
}

async fn handle_route_reply_for_me<L: LinkInterface>(plane: &ControlPlane<L>, rrep: LocatorRrep) {
    let hop_list = rrep.route_list.locators.clone();
    let Some(&destination_locator) = hop_list.last() else {
        return;
    };

    let outbound = {
        let mut state = plane.state.lock().await;
        state.path_cache.record_path(destination_locator, hop_list.clone());

        if state.pending_requests.contains(rrep.original_dest_id) {
            state.table.record_locator_for_id(rrep.original_dest_id, destination_locator);
            match state.table.next_hop_for_locator(hop_list[0]) {
                Some(next_hop_id) => {
                    state.table.add_external_entry(destination_locator, next_hop_id);
                    let record = state.pending_requests.remove(rrep.original_dest_id);
                    let mut outbound = Vec::new();
                    if let Some(record) = record {
                        for mut waiting_packet in record.waiting_packets {
                            waiting_packet.header.dst.loc = destination_locator;
                            outbound.push(Outbound::Unicast {
                                bytes: waiting_packet.pack(),
                                next_hop: next_hop_id,
                            });
                        }
                    }
                    outbound
                }
                None => {
                    warn!("no next hop known for locator {}", hop_list[0]);
                    Vec::new()
                }
            }
        } else {
            debug!("reply too late or already handled, checking if path is better");
            if let Some(new_main_path) = state.path_cache.main_path(destination_locator).map(|path| path.to_vec()) {
                if let Some(next_hop_id) = state.table.next_hop_for_locator(new_main_path[0]) {
                    state.table.add_external_entry(destination_locator, next_hop_id);
                }
            }
            Vec::new()
        }
    };

    plane.dispatch(outbound, false, false).await;
}

async fn handle_route_reply_for_my_locator<L: LinkInterface>(plane: &ControlPlane<L>, header: &IlnpHeader, rrep: LocatorRrep) {
    let next_hop = {
        let state = plane.state.lock().await;
        state.table.next_hop_for_local_node(header.dst.id)
    };
    match next_hop {
        Some(next_hop) => {
            let packet = control_packet(header.src, header.dst, ControlBody::LocatorRrep(rrep), header.hop_limit);
            plane.dispatch(vec![Outbound::Unicast { bytes: packet.pack(), next_hop }], true, true).await;
        }
        None => debug!("node {} does not exist in this locator", header.dst.id),
    }
}

async fn handle_route_reply_for_other_locator<L: LinkInterface>(plane: &ControlPlane<L>, header: &IlnpHeader, rrep: LocatorRrep) {
    let Some(index_of_my_locator) = rrep.route_list.locators.iter().position(|&locator| locator == plane.my_address.loc) else {
        debug!("my locator not in reply path, discarding");
        return;
    };

    let predecessor_locator = if index_of_my_locator == 0 { header.dst.loc } else { rrep.route_list.locators[index_of_my_locator - 1] };

    let next_hop = {
        let state = plane.state.lock().await;
        state.table.next_hop_for_locator(predecessor_locator)
    };
    match next_hop {
        Some(next_hop) => {
            let packet = control_packet(header.src, header.dst, ControlBody::LocatorRrep(rrep), header.hop_limit);
            plane.dispatch(vec![Outbound::Unicast { bytes: packet.pack(), next_hop }], true, true).await;
        }
        None => debug!("no next hop known to locator {predecessor_locator}"),
    }
}

/// Processes an inbound `LOCATOR_RREP`. Grounded on `interzone.py::handle_locator_route_reply`.
pub async fn handle_route_reply<L: LinkInterface>(plane: &ControlPlane<L>, header: &IlnpHeader, rrep: LocatorRrep) {
    if header.dst.id == plane.my_address.id {
        handle_route_reply_for_me(plane, rrep).await;
    } else if header.dst.loc == plane.my_address.loc {
        handle_route_reply_for_my_locator(plane, header, rrep).await;
    } else {
        handle_route_reply_for_other_locator(plane, header, rrep).await;
    }
}

/// Ages outstanding requests, retries any older than [`AGE_UNTIL_RETRY`] ticks, and gives up on
/// any that have exhausted [`MAX_RETRIES`]. Grounded on `interzone.py::maintenance`.
pub async fn run_maintenance<L: LinkInterface>(plane: &ControlPlane<L>) {
    let (retry_outbound, given_up) = {
        let mut state = plane.state.lock().await;
        state.pending_requests.age_records();

        let due_for_retry = state.pending_requests.destinations_older_than(AGE_UNTIL_RETRY);
        let mut retry_outbound = Vec::new();
        let mut given_up = Vec::new();

        for destination in due_for_retry {
            let Some(record) = state.pending_requests.get(destination) else {
                continue;
            };
            if record.num_attempts >= MAX_RETRIES {
                given_up.push(destination);
                continue;
            }

            let locators: Vec<(u64, u64)> = state.table.known_locators().collect();
            if locators.is_empty() {
                continue;
            }

            let request_id = state.request_id_generator.next();
            for (locator, next_hop) in locators {
                let packet = build_rreq(plane.my_address, request_id, destination, locator);
                retry_outbound.push(Outbound::Unicast { bytes: packet.pack(), next_hop });
            }
            state.pending_requests.record_retried_request(destination, request_id);
        }

        for destination in &given_up {
            state.pending_requests.remove(*destination);
        }

        state.pending_requests.age_records();

        (retry_outbound, given_up)
    };

    if !given_up.is_empty() {
        info!("giving up on route discovery for destinations: {given_up:?}");
    }
    plane.dispatch(retry_outbound, true, false).await;
}

/// Re-adds a forwarding entry for every destination locator known via the path cache, run after
/// every forwarding-table recompute (which otherwise only knows about link-state-learned
/// locators). Grounded on `interzone.py::add_external_paths_to_forwarding_table`.
pub fn add_external_paths_to_forwarding_table(state: &mut ControlPlaneState) {
    let paths: Vec<(u64, Vec<u64>)> = state.path_cache.paths().map(|(locator, main_path)| (locator, main_path.clone())).collect();
    for (destination_locator, main_path) in paths {
        let Some(&first_locator) = main_path.first() else {
            continue;
        };
        if let Some(next_hop_id) = state.table.next_hop_for_locator(first_locator) {
            state.table.add_external_entry(destination_locator, next_hop_id);
        }
    }
}
