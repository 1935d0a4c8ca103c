//! Server network layer handling TCP/UDP communications and game loop coordination

use crate::client_manager::{ClientManager, ConnectionId};
use crate::config::{GameConfig, ServerArgs};
use crate::game::{GameLogic, Outbound, SERVER_CHAT_ID};
use log::{debug, error, info, warn};
use shared::protocol::{decode, encode, Channel, Packet};
use shared::{EntityId, World, MAX_PACKET_SIZE};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    ClientConnected {
        conn_id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    },
    PacketReceived {
        conn_id: ConnectionId,
        packet: Packet,
    },
    DatagramReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientDisconnected {
        conn_id: ConnectionId,
    },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendDatagram { data: Vec<u8>, addrs: Vec<SocketAddr> },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: Option<TcpListener>,
    socket: Arc<UdpSocket>,
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
    clients: ClientManager,
    game: GameLogic,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(args: &ServerArgs) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(args, GameConfig::default()).await
    }

    pub async fn with_config(
        args: &ServerArgs,
        config: GameConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(args.tcp_addr()).await?;
        let socket = Arc::new(UdpSocket::bind(args.udp_addr()).await?);
        let tcp_addr = listener.local_addr()?;
        let udp_addr = socket.local_addr()?;
        info!("Server listening on tcp://{} and udp://{}", tcp_addr, udp_addr);

        let world = World::generate(args.width, args.height, args.walls, args.seed);
        info!(
            "Generated {}x{} map with {} walls (seed {})",
            args.width,
            args.height,
            world.len(),
            args.seed
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            socket,
            tcp_addr,
            udp_addr,
            clients: ClientManager::new(args.max_clients),
            game: GameLogic::new(world, config),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.tcp_addr
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Handle that stops [`Server::run`] when sent [`ServerMessage::Shutdown`]
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts TCP connections
    fn spawn_tcp_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_conn_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        if !Self::spawn_connection(stream, addr, conn_id, server_tx.clone()) {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the reader and writer tasks of one TCP connection
    ///
    /// Returns `false` once the main loop is gone.
    fn spawn_connection(
        stream: TcpStream,
        addr: SocketAddr,
        conn_id: ConnectionId,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> bool {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }
        let (mut reader, mut writer) = stream.into_split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        if let Err(e) = server_tx.send(ServerMessage::ClientConnected {
            conn_id,
            addr,
            outbound,
        }) {
            error!("Failed to send connection to main loop: {}", e);
            return false;
        }

        tokio::spawn(async move {
            while let Some(data) = outbound_rx.recv().await {
                if let Err(e) = write_frame(&mut writer, &data).await {
                    debug!("Write to connection {} failed: {}", conn_id, e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        tokio::spawn(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(bytes)) => match decode(&bytes) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { conn_id, packet })
                                .is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => warn!("Dropping malformed packet from {}: {}", addr, e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Closing connection {} from {}: {}", conn_id, addr, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::ClientDisconnected { conn_id });
        });

        true
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_udp_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::DatagramReceived { packet, addr })
                            {
                                error!("Failed to send datagram to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing datagram queue
    fn spawn_udp_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendDatagram { data, addrs } => {
                        for addr in addrs {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send datagram to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Applies one message from the network tasks
    fn handle_message(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::ClientConnected {
                conn_id,
                addr,
                outbound,
            } => {
                if self.clients.is_full() {
                    warn!("Rejecting {}: server full", addr);
                    let notice = Packet::Chat {
                        message: "Server full".to_string(),
                        player_id: SERVER_CHAT_ID,
                    };
                    if let Ok(data) = encode(&notice) {
                        let _ = outbound.send(data);
                    }
                    // Dropping the sender closes the connection once the notice is written.
                    return;
                }

                match self.game.handle_connect() {
                    Ok(player_id) => {
                        self.clients.add_connection(conn_id, player_id, addr, outbound);
                    }
                    Err(e) => error!("Cannot spawn a player for {}: {}", addr, e),
                }
            }
            ServerMessage::PacketReceived { conn_id, packet } => {
                let Some(player_id) = self.clients.player_for_conn(conn_id) else {
                    debug!("Packet from unknown connection {}", conn_id);
                    return;
                };
                match packet {
                    Packet::ClientUdpPort { port, .. } => {
                        self.clients.register_udp(conn_id, port);
                    }
                    packet => self.game.handle_packet(player_id, packet, now),
                }
            }
            ServerMessage::DatagramReceived { packet, addr } => {
                match self.clients.player_for_udp_addr(addr) {
                    Some(player_id) => self.game.handle_packet(player_id, packet, now),
                    None => debug!("Datagram from unregistered endpoint {}", addr),
                }
            }
            ServerMessage::ClientDisconnected { conn_id } => {
                if let Some(player_id) = self.clients.remove_connection(conn_id) {
                    self.game.handle_disconnect(player_id);
                }
            }
            ServerMessage::Shutdown => {}
        }
    }

    /// Routes every queued outbound packet to its channel
    fn flush_outbox(&mut self) {
        for outbound in self.game.drain_outbox() {
            let (target, packet) = match outbound {
                Outbound::Broadcast(packet) => (None, packet),
                Outbound::SendTo(player_id, packet) => (Some(player_id), packet),
            };
            let data = match encode(&packet) {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", packet.kind(), e);
                    continue;
                }
            };

            match packet.channel() {
                Channel::Reliable => self.send_reliable(target, data),
                Channel::BestEffort => self.send_datagram(target, data),
            }
        }
    }

    fn send_reliable(&self, target: Option<EntityId>, data: Vec<u8>) {
        match target {
            Some(player_id) => {
                if let Some(sender) = self.clients.sender_for_player(player_id) {
                    if sender.send(data).is_err() {
                        debug!("Writer of player {} is gone", player_id);
                    }
                }
            }
            None => {
                for (player_id, sender) in self.clients.senders() {
                    if sender.send(data.clone()).is_err() {
                        debug!("Writer of player {} is gone", player_id);
                    }
                }
            }
        }
    }

    fn send_datagram(&self, target: Option<EntityId>, data: Vec<u8>) {
        let addrs: Vec<SocketAddr> = match target {
            Some(player_id) => self.clients.udp_addr_for_player(player_id).into_iter().collect(),
            None => self.clients.udp_endpoints(),
        };
        if addrs.is_empty() {
            return;
        }
        if let Err(e) = self.game_tx.send(GameMessage::SendDatagram { data, addrs }) {
            error!("Failed to queue datagram: {}", e);
        }
    }

    fn ticker(period: Duration) -> Interval {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Main server loop coordinating all operations
    ///
    /// Each tick drains the inbound queue, advances the match and flushes
    /// the outbox. The tick rate follows the match phase.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Initialize concurrent tasks
        self.spawn_tcp_acceptor();
        self.spawn_udp_receiver();
        self.spawn_udp_sender();

        let mut period = self.game.tick_interval();
        let mut ticker = Self::ticker(period);
        let mut last_tick = Instant::now();
        let max_delta = self.game.max_delta();

        info!("Server started successfully");

        loop {
            ticker.tick().await;

            let now = Instant::now();
            let mut dt = now.saturating_duration_since(last_tick);
            last_tick = now;
            if dt > max_delta {
                debug!("Large delta time detected ({:?}), capping to {:?}", dt, max_delta);
                dt = max_delta;
            }

            while let Ok(message) = self.server_rx.try_recv() {
                if matches!(message, ServerMessage::Shutdown) {
                    info!("Server shutting down");
                    return Ok(());
                }
                self.handle_message(message, now);
            }

            self.game.tick(now, dt);
            self.flush_outbox();

            let next = self.game.tick_interval();
            if next != period {
                debug!("Tick interval changed to {:?}", next);
                period = next;
                ticker = Self::ticker(period);
            }
        }
    }
}

/// Prefixes `payload` with its big-endian length
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Reads one length-prefixed frame
///
/// Returns `Ok(None)` when the stream ends cleanly between frames. Frames
/// longer than [`MAX_PACKET_SIZE`] are an `InvalidData` error.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if len > MAX_PACKET_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", len, MAX_PACKET_SIZE),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_PACKET_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {}", payload.len(), MAX_PACKET_SIZE),
        ));
    }
    writer.write_all(&frame(payload)).await?;
    writer.flush().await
}
