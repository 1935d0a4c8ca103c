//! Packet taxonomy and wire encoding shared by the server and its clients.
//!
//! Every encoded packet starts with a one byte type tag followed by the
//! bincode payload. The tag can be inspected with [`peek_kind`] before the
//! payload is decoded, and it decides which transport carries the packet.

use crate::entity::{Color, Entity, EntityId};
use crate::error::ProtocolError;
use crate::projectile::ProjectileType;
use crate::ring::SafeZone;
use crate::vector::Vector;
use crate::world::World;
use crate::MAX_PACKET_SIZE;
use serde::{Deserialize, Serialize};

/// Transport tier a packet travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Ordered stream (TCP).
    Reliable,
    /// Datagrams that may be dropped or reordered (UDP).
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Login = 1,
    Movement = 2,
    Chat = 3,
    WorldState = 4,
    Action = 5,
    SpawnOrDestroyPlayer = 6,
    SpawnOrDestroyProjectile = 7,
    PlayerStatus = 8,
    LobbyState = 9,
    PlayerReady = 10,
    UpdatePlayerInfo = 11,
    GameStart = 12,
    GameOver = 13,
    RingState = 14,
    ClientUdpPort = 15,
}

impl PacketKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            1 => PacketKind::Login,
            2 => PacketKind::Movement,
            3 => PacketKind::Chat,
            4 => PacketKind::WorldState,
            5 => PacketKind::Action,
            6 => PacketKind::SpawnOrDestroyPlayer,
            7 => PacketKind::SpawnOrDestroyProjectile,
            8 => PacketKind::PlayerStatus,
            9 => PacketKind::LobbyState,
            10 => PacketKind::PlayerReady,
            11 => PacketKind::UpdatePlayerInfo,
            12 => PacketKind::GameStart,
            13 => PacketKind::GameOver,
            14 => PacketKind::RingState,
            15 => PacketKind::ClientUdpPort,
            _ => return None,
        };
        Some(kind)
    }

    pub fn channel(self) -> Channel {
        match self {
            PacketKind::Movement | PacketKind::PlayerStatus | PacketKind::RingState => Channel::BestEffort,
            _ => Channel::Reliable,
        }
    }

    /// Kinds only the server is allowed to send.
    pub fn is_server_only(self) -> bool {
        matches!(
            self,
            PacketKind::WorldState
                | PacketKind::SpawnOrDestroyPlayer
                | PacketKind::SpawnOrDestroyProjectile
                | PacketKind::PlayerStatus
                | PacketKind::LobbyState
                | PacketKind::GameStart
                | PacketKind::GameOver
                | PacketKind::RingState
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: EntityId,
    pub name: String,
    pub visual: String,
    pub color: Color,
    pub position: Vector,
    pub health: i32,
    pub max_health: i32,
    pub resistance: i32,
    pub can_move: bool,
    pub is_burning: bool,
    pub is_ready: bool,
    pub is_waiting: bool,
    pub is_solid: bool,
}

impl PlayerSnapshot {
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let player = entity.as_player()?;
        Some(Self {
            id: entity.id,
            name: entity.name.clone(),
            visual: entity.visual.clone(),
            color: entity.color,
            position: entity.position(),
            health: player.health,
            max_health: player.max_health,
            resistance: player.resistance,
            can_move: player.can_move,
            is_burning: player.is_burning,
            is_ready: player.is_ready,
            is_waiting: player.is_waiting,
            is_solid: entity.is_solid(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub projectile_type: ProjectileType,
    pub visual: String,
    pub color: Color,
    pub position: Vector,
    pub direction: Vector,
}

impl ProjectileSnapshot {
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let projectile = entity.as_projectile()?;
        Some(Self {
            id: entity.id,
            owner_id: projectile.owner_id,
            projectile_type: projectile.projectile_type,
            visual: entity.visual.clone(),
            color: entity.color,
            position: entity.position(),
            direction: projectile.direction,
        })
    }
}

/// Any entity that is neither a player nor a projectile, e.g. walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSnapshot {
    pub id: EntityId,
    pub name: String,
    pub visual: String,
    pub color: Color,
    pub position: Vector,
    pub is_solid: bool,
}

impl PropSnapshot {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            visual: entity.visual.clone(),
            color: entity.color,
            position: entity.position(),
            is_solid: entity.is_solid(),
        }
    }
}

/// Lobby roster line, also used for the final rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayerData {
    pub id: EntityId,
    pub name: String,
    pub visual: String,
    pub is_ready: bool,
}

impl LobbyPlayerData {
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let player = entity.as_player()?;
        Some(Self {
            id: entity.id,
            name: entity.name.clone(),
            visual: entity.visual.clone(),
            is_ready: player.is_ready,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Login {
        player_name: String,
        player_id: EntityId,
        spawn_location: Vector,
    },
    /// Player or projectile position. From a client, `vector` is the target cell.
    Movement {
        vector: Vector,
        player_id: EntityId,
    },
    Chat {
        message: String,
        player_id: EntityId,
    },
    WorldState {
        players: Vec<PlayerSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
        others: Vec<PropSnapshot>,
    },
    Action {
        ability_type: ProjectileType,
        player_id: EntityId,
        direction: Vector,
    },
    SpawnOrDestroyPlayer {
        player: PlayerSnapshot,
        is_spawn: bool,
    },
    SpawnOrDestroyProjectile {
        projectile: ProjectileSnapshot,
        is_spawn: bool,
    },
    PlayerStatus {
        player_id: EntityId,
        health: i32,
        resistance: i32,
        can_move: bool,
        is_burning: bool,
    },
    LobbyState {
        players: Vec<LobbyPlayerData>,
    },
    PlayerReady {
        player_id: EntityId,
        is_ready: bool,
    },
    UpdatePlayerInfo {
        player_id: EntityId,
        name: String,
        visual: String,
    },
    GameStart,
    GameOver {
        rankings: Vec<LobbyPlayerData>,
    },
    RingState {
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
    },
    ClientUdpPort {
        player_id: EntityId,
        port: u16,
    },
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Login { .. } => PacketKind::Login,
            Packet::Movement { .. } => PacketKind::Movement,
            Packet::Chat { .. } => PacketKind::Chat,
            Packet::WorldState { .. } => PacketKind::WorldState,
            Packet::Action { .. } => PacketKind::Action,
            Packet::SpawnOrDestroyPlayer { .. } => PacketKind::SpawnOrDestroyPlayer,
            Packet::SpawnOrDestroyProjectile { .. } => PacketKind::SpawnOrDestroyProjectile,
            Packet::PlayerStatus { .. } => PacketKind::PlayerStatus,
            Packet::LobbyState { .. } => PacketKind::LobbyState,
            Packet::PlayerReady { .. } => PacketKind::PlayerReady,
            Packet::UpdatePlayerInfo { .. } => PacketKind::UpdatePlayerInfo,
            Packet::GameStart => PacketKind::GameStart,
            Packet::GameOver { .. } => PacketKind::GameOver,
            Packet::RingState { .. } => PacketKind::RingState,
            Packet::ClientUdpPort { .. } => PacketKind::ClientUdpPort,
        }
    }

    pub fn channel(&self) -> Channel {
        self.kind().channel()
    }

    /// Full snapshot of `world`, sent to a client right after it connects.
    pub fn world_state(world: &World) -> Self {
        let mut players = Vec::new();
        let mut projectiles = Vec::new();
        let mut others = Vec::new();

        let mut entities: Vec<&Entity> = world.entities().collect();
        entities.sort_by_key(|e| e.id);
        for entity in entities {
            if let Some(player) = PlayerSnapshot::from_entity(entity) {
                players.push(player);
            } else if let Some(projectile) = ProjectileSnapshot::from_entity(entity) {
                projectiles.push(projectile);
            } else {
                others.push(PropSnapshot::from_entity(entity));
            }
        }

        Packet::WorldState {
            players,
            projectiles,
            others,
        }
    }

    /// Spawn or destroy notice for a player or projectile entity.
    ///
    /// Returns `None` for walls, which never change after generation.
    pub fn spawn_or_destroy(entity: &Entity, is_spawn: bool) -> Option<Self> {
        if let Some(player) = PlayerSnapshot::from_entity(entity) {
            return Some(Packet::SpawnOrDestroyPlayer { player, is_spawn });
        }
        ProjectileSnapshot::from_entity(entity).map(|projectile| Packet::SpawnOrDestroyProjectile { projectile, is_spawn })
    }

    pub fn player_status(entity: &Entity) -> Option<Self> {
        let player = entity.as_player()?;
        Some(Packet::PlayerStatus {
            player_id: entity.id,
            health: player.health,
            resistance: player.resistance,
            can_move: player.can_move,
            is_burning: player.is_burning,
        })
    }

    pub fn lobby_state(world: &World) -> Self {
        let players = world
            .players()
            .into_iter()
            .filter_map(LobbyPlayerData::from_entity)
            .collect();
        Packet::LobbyState { players }
    }

    pub fn ring_state(zone: SafeZone) -> Self {
        Packet::RingState {
            min_x: zone.min_x,
            max_x: zone.max_x,
            min_y: zone.min_y,
            max_y: zone.max_y,
        }
    }
}

/// Encodes a packet as its tag byte followed by the bincode payload.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let payload = bincode::serialize(packet)?;
    let size = payload.len() + 1;
    if size > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge {
            size,
            max: MAX_PACKET_SIZE,
        });
    }

    let mut bytes = Vec::with_capacity(size);
    bytes.push(packet.kind().tag());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Reads the type tag without decoding the payload.
pub fn peek_kind(bytes: &[u8]) -> Result<PacketKind, ProtocolError> {
    let tag = *bytes.first().ok_or(ProtocolError::Empty)?;
    PacketKind::from_tag(tag).ok_or(ProtocolError::UnknownTag(tag))
}

pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    if bytes.len() > MAX_PACKET_SIZE {
        return Err(ProtocolError::TooLarge {
            size: bytes.len(),
            max: MAX_PACKET_SIZE,
        });
    }
    let kind = peek_kind(bytes)?;
    let packet: Packet = bincode::deserialize(&bytes[1..])?;
    if packet.kind() != kind {
        return Err(ProtocolError::TagMismatch {
            tag: kind.tag(),
            actual: packet.kind().tag(),
        });
    }
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_stable() {
        for tag in 1..=15u8 {
            let kind = PacketKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(PacketKind::from_tag(0), None);
        assert_eq!(PacketKind::from_tag(16), None);
        assert_eq!(PacketKind::Login.tag(), 1);
        assert_eq!(PacketKind::ClientUdpPort.tag(), 15);
    }

    #[test]
    fn test_channel_routing() {
        assert_eq!(PacketKind::Movement.channel(), Channel::BestEffort);
        assert_eq!(PacketKind::PlayerStatus.channel(), Channel::BestEffort);
        assert_eq!(PacketKind::RingState.channel(), Channel::BestEffort);
        assert_eq!(PacketKind::Login.channel(), Channel::Reliable);
        assert_eq!(PacketKind::Action.channel(), Channel::Reliable);
        assert_eq!(PacketKind::GameOver.channel(), Channel::Reliable);
    }

    #[test]
    fn test_encoded_packet_starts_with_tag() {
        let packet = Packet::Chat {
            message: "hello".to_string(),
            player_id: 3,
        };
        let bytes = encode(&packet).unwrap();

        assert_eq!(bytes[0], PacketKind::Chat.tag());
        assert_eq!(peek_kind(&bytes).unwrap(), PacketKind::Chat);
        assert_eq!(decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode(&[]), Err(ProtocolError::Empty)));
        assert!(matches!(decode(&[99, 0, 0]), Err(ProtocolError::UnknownTag(99))));
        assert!(matches!(decode(&[PacketKind::Chat.tag(), 1]), Err(ProtocolError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_tag_mismatch() {
        let mut bytes = encode(&Packet::GameStart).unwrap();
        bytes[0] = PacketKind::Login.tag();

        assert!(matches!(
            decode(&bytes),
            Err(ProtocolError::TagMismatch { tag: 1, actual: 12 })
        ));
    }

    #[test]
    fn test_oversized_packet_is_rejected() {
        let packet = Packet::Chat {
            message: "x".repeat(MAX_PACKET_SIZE),
            player_id: 1,
        };
        assert!(matches!(encode(&packet), Err(ProtocolError::TooLarge { .. })));
    }

    #[test]
    fn test_world_state_splits_entity_kinds() {
        let mut world = World::new(10, 10);
        let player = world.spawn_player("alice", Vector::new(1, 1)).unwrap();
        world.spawn_wall(Vector::new(2, 2)).unwrap();
        world
            .spawn_projectile(player, Vector::new(1, 1), Vector::new(0, 1), ProjectileType::Ice)
            .unwrap();

        match Packet::world_state(&world) {
            Packet::WorldState {
                players,
                projectiles,
                others,
            } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].name, "alice");
                assert_eq!(projectiles.len(), 1);
                assert_eq!(projectiles[0].owner_id, player);
                assert_eq!(others.len(), 1);
                assert_eq!(others[0].visual, crate::WALL_VISUAL);
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_walls_have_no_spawn_notice() {
        let mut world = World::new(5, 5);
        let wall = world.spawn_wall(Vector::new(1, 1)).unwrap();
        let player = world.spawn_player("bob", Vector::new(2, 2)).unwrap();

        assert!(Packet::spawn_or_destroy(world.get(wall).unwrap(), true).is_none());
        assert!(matches!(
            Packet::spawn_or_destroy(world.get(player).unwrap(), false),
            Some(Packet::SpawnOrDestroyPlayer { is_spawn: false, .. })
        ));
    }
}
