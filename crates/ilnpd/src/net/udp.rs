//! UDP/IPv6 multicast [`LinkInterface`], grounded on `netinterface.py`'s
//! `create_mcast_socket`/`NetworkInterface`, built with the same `socket2`-then-`tokio`
//! construction idiom as `ocatvius-daemon::bgp::create_tcp_server`, swapped from a TCP listener to
//! a UDP socket bound to every configured multicast group.

use crate::battery::Battery;
use crate::config::NodeConfig;
use crate::net::{
    LinkError,
    LinkInterface,
};
use log::{
    info,
    warn,
};
use socket2::{
    Domain,
    Protocol,
    Socket,
    Type,
};
use std::collections::HashMap;
use std::net::{
    Ipv6Addr,
    SocketAddr,
    SocketAddrV6,
};
use std::sync::RwLock;
use tokio::net::UdpSocket;

pub struct UdpLinkInterface {
    socket: UdpSocket,
    port: u16,
    my_group_address: Ipv6Addr,
    buffer_size: usize,
    battery: std::sync::Arc<Battery>,
    id_to_addr: RwLock<HashMap<u64, SocketAddr>>,
}

impl UdpLinkInterface {
    pub fn bind(config: &NodeConfig, battery: std::sync::Arc<Battery>) -> Result<Self, LinkError> {
        let port = config.section.port;

        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_only_v6(true)?;
        socket.set_multicast_loop_v6(config.section.loopback)?;
        socket.set_nonblocking(true)?;

        let bind_addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0).into();
        socket.bind(&bind_addr.into())?;

        for group in &config.mcast_group_addresses {
            socket.join_multicast_v6(group, 0)?;
            info!("joined multicast group {group}");
        }
        socket.join_multicast_v6(&config.my_group_address, 0)?;
        info!("joined own multicast group {}", config.my_group_address);

        let socket = UdpSocket::from_std(socket.into())?;

        Ok(Self {
            socket,
            port,
            my_group_address: config.my_group_address,
            buffer_size: config.section.packet_buffer_size_bytes,
            battery,
            id_to_addr: RwLock::new(HashMap::new()),
        })
    }

    fn check_battery(&self) -> Result<(), LinkError> {
        if self.battery.is_exhausted() {
            return Err(LinkError::EnergyExhausted);
        }
        Ok(())
    }
}

impl LinkInterface for UdpLinkInterface {
    async fn broadcast(&self, bytes: &[u8]) -> Result<(), LinkError> {
        self.check_battery()?;
        let dest: SocketAddr = SocketAddrV6::new(self.my_group_address, self.port, 0, 0).into();
        self.socket.send_to(bytes, dest).await?;
        self.battery.decrement();
        Ok(())
    }

    async fn send(&self, bytes: &[u8], next_hop: u64) -> Result<(), LinkError> {
        self.check_battery()?;
        let dest = {
            let addresses = self.id_to_addr.read().expect("link address cache poisoned");
            *addresses.get(&next_hop).ok_or(LinkError::UnknownNextHop(next_hop))?
        };
        self.socket.send_to(bytes, dest).await?;
        self.battery.decrement();
        Ok(())
    }

    async fn receive(&self, timeout: std::time::Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, LinkError> {
        let mut buffer = vec![0u8; self.buffer_size];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buffer)).await {
            Ok(Ok((n, src))) => {
                self.check_battery()?;
                self.battery.decrement();
                buffer.truncate(n);
                Ok(Some((buffer, src)))
            }
            Ok(Err(err)) => {
                warn!("link receive failed: {err}");
                Err(LinkError::Io(err))
            }
            Err(_elapsed) => Ok(None),
        }
    }

    fn register(&self, id: u64, addr: SocketAddr) {
        self.id_to_addr.write().expect("link address cache poisoned").insert(id, addr);
    }
}
