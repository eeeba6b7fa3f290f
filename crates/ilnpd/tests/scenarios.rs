//! End-to-end scenarios driving full node stacks (listener + router + control-plane tasks) wired
//! through one shared [`MemoryNetwork`].
//!
//! Scenarios that hinge on the `KEEPALIVE_INTERVAL`/`2x` expiry timers (1 and 5) run under a
//! paused tokio clock: virtual time is advanced by `tokio::time::sleep`, and the runtime
//! auto-advances the clock once every task is blocked purely on a timer, so these resolve in a
//! handful of milliseconds of wall-clock time despite simulating minutes of protocol time.

use ilnp_common::Address;
use ilnpd::battery::Battery;
use ilnpd::control::{
    external,
    ControlPlane,
    KEEPALIVE_INTERVAL,
};
use ilnpd::monitor::Monitor;
use ilnpd::net::memory::{
    MemoryLinkInterface,
    MemoryNetwork,
};
use ilnpd::net::{
    listener,
    LinkInterface,
};
use ilnpd::router::{
    self,
    RouterHandle,
};
use ilnp_proto::header::{
    IlnpHeader,
    NextHeader,
};
use ilnp_proto::transport::TransportMessage;
use ilnp_proto::IlnpPacket;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;
use std::time::Duration;

/// A single node's full running stack: listener, router and control-plane tasks, plus the
/// handles a test drives it through. Dropping a `TestNode` does not stop its tasks; call
/// [`TestNode::kill`] to simulate the node failing.
struct TestNode {
    address: Address,
    handle: RouterHandle<MemoryLinkInterface>,
    plane: Arc<ControlPlane<MemoryLinkInterface>>,
    monitor: Arc<Monitor>,
    shutdown: Arc<AtomicBool>,
}

impl TestNode {
    /// Simulates this node failing outright: every task stops within its next poll, and it sends
    /// nothing further (no more HELLOs), just as a dead sensor node would.
    fn kill(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Spawns a node joined to `zones` (its own locator is `zones[0]`) with a full listener + router
/// + control-plane stack, registered under `id` on `network`.
fn spawn_node(network: &MemoryNetwork, zones: &[u64], id: u64) -> TestNode {
    let battery = Arc::new(Battery::new(10_000));
    let link = Arc::new(network.join_zones(zones, id, battery.clone()));
    let my_address = Address::new(zones[0], id);
    let monitor = Arc::new(Monitor::new(id));
    let plane = Arc::new(ControlPlane::new(my_address, battery, monitor.clone(), link.clone()));
    let (router, handle, to_route_tx, to_route_rx) = router::build(my_address, plane.clone(), link.clone());

    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(listener::run(link.clone(), to_route_tx, shutdown.clone()));
    tokio::spawn(router.run(to_route_rx, shutdown.clone()));
    tokio::spawn(plane.clone().run_keepalive(shutdown.clone()));

    TestNode {
        address: my_address,
        handle,
        plane,
        monitor,
        shutdown,
    }
}

/// Scenario 1: two nodes sharing a locator discover each other by HELLO and build a direct
/// internal forwarding entry, within two keepalive intervals.
#[tokio::test(start_paused = true)]
async fn two_nodes_in_one_locator_form_an_internal_route() {
    let network = MemoryNetwork::new();
    let a = spawn_node(&network, &[10], 1);
    let b = spawn_node(&network, &[10], 2);

    tokio::time::sleep(2 * KEEPALIVE_INTERVAL + Duration::from_secs(5)).await;

    assert!(a.plane.has_neighbour(2).await);
    assert!(b.plane.has_neighbour(1).await);
    assert_eq!(a.plane.next_hop(Address::new(10, 2), true).await, Some(2));
    assert_eq!(b.plane.next_hop(Address::new(10, 1), true).await, Some(1));

    a.kill();
    b.kill();
}

/// Scenario 2: a node delivers a host-originated packet addressed to itself straight to its own
/// receive queue, touching the network not at all. Runs only the router task (no listener, no
/// keepalive task): pulling in the keepalive task would race its own initial HELLO broadcast
/// against the packet-count assertion below, for no benefit to what this scenario is checking.
#[tokio::test]
async fn host_send_to_self_loops_back_without_network_traffic() {
    let network = MemoryNetwork::new();
    let battery = Arc::new(Battery::new(1_000));
    let link = Arc::new(network.join(10, 1, battery.clone()));
    let my_address = Address::new(10, 1);
    let monitor = Arc::new(Monitor::new(1));
    let plane = Arc::new(ControlPlane::new(my_address, battery, monitor.clone(), link.clone()));
    let (router, handle, _to_route_tx, to_route_rx) = router::build(my_address, plane, link);

    let shutdown = Arc::new(AtomicBool::new(false));
    tokio::spawn(router.run(to_route_rx, shutdown.clone()));

    handle.send(b"abc".to_vec(), 1).await.unwrap();
    let (payload, src) = handle.receive().await.unwrap();

    assert_eq!(payload, b"abc");
    assert_eq!(src, 1);
    assert_eq!(monitor.sent_packet_count(), 0);

    shutdown.store(true, Ordering::Relaxed);
}

/// Scenario 3: three nodes, two locators, B a border node bridging both. Resolving C's locator
/// still costs one round of reactive discovery (nothing gives A an a-priori id-to-locator
/// mapping), but it is a single external hop: one RREQ out, one RREP back, after which A's
/// locator cache is warm and a second send never touches the control plane again.
#[tokio::test(start_paused = true)]
async fn single_external_hop_discovery_resolves_and_then_caches_the_locator() {
    let network = MemoryNetwork::new();
    let a = spawn_node(&network, &[10], 1);
    let b = spawn_node(&network, &[10, 20], 2);
    let c = spawn_node(&network, &[20], 3);

    // Graph convergence (HELLO, then LSDB flooding) happens the instant each HELLO lands, with no
    // timer involved; but a node only folds its converged graph into NH_ext on its own next
    // keepalive tick, so the wait has to clear that, not just let messages drain.
    tokio::time::sleep(KEEPALIVE_INTERVAL + Duration::from_secs(5)).await;
    assert_eq!(a.plane.next_hop(Address::new(20, 0), false).await, Some(2));

    a.handle.send(b"x".to_vec(), 3).await.unwrap();
    let (payload, src) = c.handle.receive().await.unwrap();
    assert_eq!(payload, b"x");
    assert_eq!(src, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(a.plane.cached_locator_for(3).await, Some(20));

    let sent_before_second = a.monitor.sent_packet_count();
    a.handle.send(b"y".to_vec(), 3).await.unwrap();
    let (payload, src) = c.handle.receive().await.unwrap();
    assert_eq!(payload, b"y");
    assert_eq!(src, 1);

    // The second send resolves straight from the locator cache: no additional control traffic.
    assert_eq!(a.monitor.sent_packet_count(), sent_before_second);
    assert_eq!(a.plane.pending_request_count().await, 0);

    a.kill();
    b.kill();
    c.kill();
}

/// Scenario 4: a four-node chain A-B-C-X spanning three locators. Reaching X costs a genuine
/// multi-hop reactive discovery; the round trip leaves A with a path cache entry naming the
/// intermediate locator.
#[tokio::test(start_paused = true)]
async fn multi_hop_reactive_discovery_builds_a_path_cache_entry() {
    let network = MemoryNetwork::new();
    let a = spawn_node(&network, &[10], 1);
    let b = spawn_node(&network, &[10, 20], 2);
    let c = spawn_node(&network, &[20, 30], 3);
    let x = spawn_node(&network, &[30], 5);

    tokio::time::sleep(Duration::from_millis(300)).await;

    a.handle.send(b"p".to_vec(), 5).await.unwrap();
    let (payload, src) = x.handle.receive().await.unwrap();
    assert_eq!(payload, b"p");
    assert_eq!(src, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(a.plane.path_cache_main_path(30).await, Some(vec![20, 30]));
    assert_eq!(a.plane.cached_locator_for(5).await, Some(30));
    assert_eq!(a.plane.pending_request_count().await, 0);

    a.kill();
    b.kill();
    c.kill();
    x.kill();
}

/// Scenario 5: once a neighbour stops sending HELLOs, its link ages out within two keepalive
/// intervals of its last one, and the surviving node's internal route to it disappears.
#[tokio::test(start_paused = true)]
async fn dead_neighbour_expires_and_clears_the_internal_route() {
    let network = MemoryNetwork::new();
    let a = spawn_node(&network, &[10], 1);
    let b = spawn_node(&network, &[10], 2);

    tokio::time::sleep(2 * KEEPALIVE_INTERVAL + Duration::from_secs(5)).await;
    assert!(a.plane.has_neighbour(2).await);
    assert_eq!(a.plane.next_hop(Address::new(10, 2), true).await, Some(2));

    b.kill();

    tokio::time::sleep(2 * KEEPALIVE_INTERVAL + Duration::from_secs(10)).await;
    assert!(!a.plane.has_neighbour(2).await);
    assert_eq!(a.plane.next_hop(Address::new(10, 2), true).await, None);

    a.kill();
}

/// Scenario 6: duplicate-request suppression in a ring of border nodes. Drives the control
/// planes directly (bypassing the router/listener tasks and HELLO convergence) so the topology
/// is deterministic: four nodes, each bridging two neighbouring locators, wired A-B-C-D-A with no
/// two of them sharing a home locator. A's request for an unreachable id floods both ways around
/// the ring; every intermediate node must forward it at most once despite receiving it from both
/// directions.
#[tokio::test]
async fn duplicate_route_request_is_forwarded_at_most_once_around_a_ring() {
    const LOC_DA: u64 = 41;
    const LOC_AB: u64 = 42;
    const LOC_BC: u64 = 43;
    const LOC_CD: u64 = 44;

    let network = MemoryNetwork::new();
    let battery = || Arc::new(Battery::new(10_000));

    let link_a = Arc::new(network.join(0, 1, battery()));
    let link_b = Arc::new(network.join(0, 2, battery()));
    let link_c = Arc::new(network.join(0, 3, battery()));
    let link_d = Arc::new(network.join(0, 4, battery()));

    let addr_a = Address::new(LOC_DA, 1);
    let addr_b = Address::new(LOC_AB, 2);
    let addr_c = Address::new(LOC_BC, 3);
    let addr_d = Address::new(LOC_CD, 4);

    let monitor_a = Arc::new(Monitor::new(1));
    let monitor_b = Arc::new(Monitor::new(2));
    let monitor_c = Arc::new(Monitor::new(3));
    let monitor_d = Arc::new(Monitor::new(4));

    let plane_a = Arc::new(ControlPlane::new(addr_a, Arc::new(Battery::new(10_000)), monitor_a.clone(), link_a.clone()));
    let plane_b = Arc::new(ControlPlane::new(addr_b, Arc::new(Battery::new(10_000)), monitor_b.clone(), link_b.clone()));
    let plane_c = Arc::new(ControlPlane::new(addr_c, Arc::new(Battery::new(10_000)), monitor_c.clone(), link_c.clone()));
    let plane_d = Arc::new(ControlPlane::new(addr_d, Arc::new(Battery::new(10_000)), monitor_d.clone(), link_d.clone()));

    // Seed each node's external next-hop table as though LSDB convergence over the ring had
    // already happened: every edge is inter-locator (no two ring neighbours share a home
    // locator), so every link is a direct external next hop.
    plane_a.seed_external_route(LOC_CD, 4).await;
    plane_a.seed_external_route(LOC_AB, 2).await;
    plane_b.seed_external_route(LOC_DA, 1).await;
    plane_b.seed_external_route(LOC_BC, 3).await;
    plane_c.seed_external_route(LOC_AB, 2).await;
    plane_c.seed_external_route(LOC_CD, 4).await;
    plane_d.seed_external_route(LOC_BC, 3).await;
    plane_d.seed_external_route(LOC_DA, 1).await;

    let packet = IlnpPacket::new(addr_a, Address::with_unknown_locator(999), NextHeader::Data, 32, b"unreachable".to_vec());
    external::find_route(&plane_a, packet).await;

    async fn drain(link: &MemoryLinkInterface, plane: &ControlPlane<MemoryLinkInterface>) -> usize {
        let mut processed = 0;
        while let Some((bytes, _addr)) = link.receive(Duration::from_millis(5)).await.unwrap() {
            let packet = IlnpPacket::parse(&bytes).unwrap();
            let message = TransportMessage::parse(&packet.payload).unwrap();
            plane.handle_control(&packet.header, message).await;
            processed += 1;
        }
        processed
    }

    loop {
        let nb = drain(&link_b, &plane_b).await;
        let nc = drain(&link_c, &plane_c).await;
        let nd = drain(&link_d, &plane_d).await;
        if nb + nc + nd == 0 {
            break;
        }
    }

    // B and D each forward exactly once (their single leg of the flood); C sees the request from
    // both directions but forwards only the first, dropping the second as a recorded duplicate.
    assert_eq!(monitor_b.sent_packet_count(), 1);
    assert_eq!(monitor_c.sent_packet_count(), 1);
    assert_eq!(monitor_d.sent_packet_count(), 1);

    // No unknown id ever replies, so A's request for it is still outstanding, not resolved.
    assert_eq!(plane_a.pending_request_count().await, 1);

    let _ = (addr_a, monitor_a);
}

#[allow(dead_code)]
fn unused_header_shape_check(header: &IlnpHeader) -> NextHeader {
    header.next_header
}
