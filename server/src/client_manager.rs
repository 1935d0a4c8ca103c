//! Connection registry for the multiplayer server
//!
//! This module keeps track of every open TCP connection and the player that
//! was spawned for it:
//! - Connection id ↔ player id mapping
//! - Writer handle of the reliable channel
//! - UDP endpoint registered by the client for the best-effort channel
//! - Capacity limit
//!
//! The registry is owned by the simulation loop and never shared between
//! tasks, so it needs no locking.

use log::info;
use shared::EntityId;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::UnboundedSender;

/// Identifier of a TCP connection, assigned by the acceptor task
pub type ConnectionId = u64;

/// One connected client
#[derive(Debug)]
pub struct Connection {
    pub conn_id: ConnectionId,
    /// Player spawned for this connection
    pub player_id: EntityId,
    /// Peer address of the TCP stream
    pub addr: SocketAddr,
    /// Where best-effort datagrams are delivered, once the client registered it
    pub udp_addr: Option<SocketAddr>,
    /// Encoded packets handed to the connection's writer task
    pub sender: UnboundedSender<Vec<u8>>,
}

pub struct ClientManager {
    connections: HashMap<ConnectionId, Connection>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_clients,
        }
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_clients
    }

    /// Registers a connection, or returns `false` when the server is full
    pub fn add_connection(
        &mut self,
        conn_id: ConnectionId,
        player_id: EntityId,
        addr: SocketAddr,
        sender: UnboundedSender<Vec<u8>>,
    ) -> bool {
        // Enforce server capacity limits
        if self.is_full() {
            return false;
        }

        info!("Client {} connected from {} as player {}", conn_id, addr, player_id);
        self.connections.insert(
            conn_id,
            Connection {
                conn_id,
                player_id,
                addr,
                udp_addr: None,
                sender,
            },
        );
        true
    }

    /// Removes a connection and returns the id of its player
    pub fn remove_connection(&mut self, conn_id: ConnectionId) -> Option<EntityId> {
        let connection = self.connections.remove(&conn_id)?;
        info!("Client {} (player {}) disconnected", conn_id, connection.player_id);
        Some(connection.player_id)
    }

    pub fn player_for_conn(&self, conn_id: ConnectionId) -> Option<EntityId> {
        self.connections.get(&conn_id).map(|c| c.player_id)
    }

    pub fn player_for_udp_addr(&self, addr: SocketAddr) -> Option<EntityId> {
        self.connections
            .values()
            .find(|c| c.udp_addr == Some(addr))
            .map(|c| c.player_id)
    }

    /// Records the UDP endpoint of a connection
    ///
    /// The endpoint combines the TCP peer IP with the port the client
    /// announced, so a client cannot redirect datagrams to another host.
    pub fn register_udp(&mut self, conn_id: ConnectionId, port: u16) -> Option<SocketAddr> {
        let connection = self.connections.get_mut(&conn_id)?;
        let udp_addr = SocketAddr::new(connection.addr.ip(), port);
        connection.udp_addr = Some(udp_addr);
        info!("Player {} receives datagrams on {}", connection.player_id, udp_addr);
        Some(udp_addr)
    }

    pub fn udp_addr_for_player(&self, player_id: EntityId) -> Option<SocketAddr> {
        self.connections
            .values()
            .find(|c| c.player_id == player_id)
            .and_then(|c| c.udp_addr)
    }

    /// Every registered UDP endpoint
    pub fn udp_endpoints(&self) -> Vec<SocketAddr> {
        self.connections.values().filter_map(|c| c.udp_addr).collect()
    }

    pub fn sender_for_player(&self, player_id: EntityId) -> Option<&UnboundedSender<Vec<u8>>> {
        self.connections
            .values()
            .find(|c| c.player_id == player_id)
            .map(|c| &c.sender)
    }

    pub fn senders(&self) -> impl Iterator<Item = (EntityId, &UnboundedSender<Vec<u8>>)> {
        self.connections.values().map(|c| (c.player_id, &c.sender))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
