//! Headless bot for exercising a running server
//!
//! Logs in over TCP, registers its UDP port, sets a name, readies up and then
//! wanders around the map casting random abilities until it is stopped.

use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use server::network::{read_frame, write_frame};
use shared::protocol::{decode, encode, Packet};
use shared::{EntityId, ProjectileType, Vector};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::watch;
use tokio::time::interval;

const DIRECTIONS: [Vector; 8] = [
    Vector::new(1, 0),
    Vector::new(-1, 0),
    Vector::new(0, 1),
    Vector::new(0, -1),
    Vector::new(1, 1),
    Vector::new(1, -1),
    Vector::new(-1, 1),
    Vector::new(-1, -1),
];

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server TCP port
    #[clap(short = 't', long, default_value = "7777")]
    tcp_port: u16,
    /// Display name of the bot
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// Milliseconds between two bot actions
    #[clap(short, long, default_value = "200")]
    interval_ms: u64,
    /// Stop after this many seconds (0 runs until Ctrl+C)
    #[clap(short, long, default_value = "0")]
    duration: u64,
}

async fn send(writer: &mut OwnedWriteHalf, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
    let data = encode(packet)?;
    write_frame(writer, &data).await?;
    Ok(())
}

/// Applies a server packet to the bot's view of its own position
fn track(packet: &Packet, player_id: EntityId, position: &watch::Sender<Vector>) {
    match packet {
        Packet::Movement { vector, player_id: id } if *id == player_id => {
            let _ = position.send(*vector);
        }
        Packet::SpawnOrDestroyPlayer { player, is_spawn: true } if player.id == player_id => {
            let _ = position.send(player.position);
        }
        Packet::GameStart => info!("Round started"),
        Packet::GameOver { rankings } => {
            let place = rankings.iter().position(|p| p.id == player_id).map(|p| p + 1);
            info!("Round over, finished at place {:?} of {}", place, rankings.len());
        }
        Packet::Chat { message, player_id: from } => info!("[{}] {}", from, message),
        _ => {}
    }
}

/// Steps to a random neighbouring cell every `period`, casting every fifth step
async fn wander(
    writer: &mut OwnedWriteHalf,
    player_id: EntityId,
    position: watch::Receiver<Vector>,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = interval(period);
    let mut step: u64 = 0;

    loop {
        ticker.tick().await;
        step += 1;

        let (direction, ability) = {
            let mut rng = rand::thread_rng();
            let direction = *DIRECTIONS.choose(&mut rng).unwrap_or(&Vector::new(1, 0));
            let ability = ProjectileType::ALL[rng.gen_range(0..ProjectileType::ALL.len())];
            (direction, ability)
        };
        let target = *position.borrow() + direction;
        send(writer, &Packet::Movement { vector: target, player_id }).await?;

        if step % 5 == 0 {
            let cast = Packet::Action {
                ability_type: ability,
                player_id,
                direction,
            };
            send(writer, &cast).await?;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let server_addr: SocketAddr = format!("{}:{}", args.host, args.tcp_port).parse()?;
    let stream = TcpStream::connect(server_addr).await?;
    let udp = UdpSocket::bind("0.0.0.0:0").await?;
    let udp_port = udp.local_addr()?.port();
    info!("Connected to {}, receiving datagrams on port {}", server_addr, udp_port);

    let (mut reader, mut writer) = stream.into_split();

    // Wait for the server to assign our player
    let (player_id, spawn) = loop {
        let Some(bytes) = read_frame(&mut reader).await? else {
            return Err("server closed the connection before login".into());
        };
        match decode(&bytes)? {
            Packet::Login {
                player_id,
                spawn_location,
                ..
            } => break (player_id, spawn_location),
            other => debug!("Ignoring {:?} before login", other.kind()),
        }
    };
    info!("Logged in as player {} at {}", player_id, spawn);

    send(&mut writer, &Packet::ClientUdpPort { player_id, port: udp_port }).await?;
    send(
        &mut writer,
        &Packet::UpdatePlayerInfo {
            player_id,
            name: args.name.clone(),
            visual: "🤖".to_string(),
        },
    )
    .await?;
    send(&mut writer, &Packet::PlayerReady { player_id, is_ready: true }).await?;

    let (position_tx, position_rx) = watch::channel(spawn);
    let position_tx = Arc::new(position_tx);
    let udp_position = Arc::clone(&position_tx);

    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(Some(bytes)) => match decode(&bytes) {
                    Ok(packet) => track(&packet, player_id, &position_tx),
                    Err(e) => warn!("Bad packet from server: {}", e),
                },
                Ok(None) => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    warn!("Connection error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        let mut buffer = vec![0u8; shared::MAX_PACKET_SIZE];
        while let Ok((len, _)) = udp.recv_from(&mut buffer).await {
            if let Ok(packet) = decode(&buffer[..len]) {
                track(&packet, player_id, &udp_position);
            }
        }
    });

    let period = Duration::from_millis(args.interval_ms.max(10));
    let bot = wander(&mut writer, player_id, position_rx, period);

    let limit = async {
        if args.duration == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        }
    };

    tokio::select! {
        result = bot => result?,
        _ = limit => info!("Time is up"),
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    Ok(())
}
