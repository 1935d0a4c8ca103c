pub mod ability;
pub mod entity;
pub mod error;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod protocol;
pub mod ring;
pub mod status;
pub mod vector;
pub mod world;

pub use ability::AbilitySystem;
pub use entity::{Color, Entity, EntityId, EntityKind};
pub use error::{ProtocolError, WorldError};
pub use physics::PhysicsSystem;
pub use player::Player;
pub use projectile::{Projectile, ProjectileType};
pub use protocol::{Channel, LobbyPlayerData, Packet, PacketKind};
pub use ring::{RingConfig, RingSystem, SafeZone};
pub use status::StatusEffects;
pub use vector::Vector;
pub use world::World;

pub const WORLD_WIDTH: i32 = 80;
pub const WORLD_HEIGHT: i32 = 40;
pub const WALL_COUNT: usize = 200;
pub const MAP_SEED: u64 = 42;

pub const PLAYER_MAX_HEALTH: i32 = 100;
pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const DEFAULT_PLAYER_VISUAL: &str = "😀";
pub const WAITING_PLAYER_VISUAL: &str = "👻";
pub const WALL_VISUAL: &str = "#";

pub const SHOCK_RESISTANCE: i32 = -50;
pub const SHOCK_DURATION_SECS: f32 = 3.0;
pub const FREEZE_RESISTANCE: i32 = 50;
pub const FREEZE_DURATION_SECS: f32 = 2.0;
pub const BURN_TICKS: u32 = 5;
pub const BURN_INTERVAL_SECS: f32 = 1.0;

pub const RING_SHRINK_INTERVAL_MS: u64 = 5000;
pub const RING_DAMAGE_INTERVAL_MS: u64 = 1000;
pub const RING_DAMAGE: i32 = 5;
pub const RING_MIN_SIZE: i32 = 4;

/// Upper bound for one encoded packet on either transport.
pub const MAX_PACKET_SIZE: usize = 64 * 1024;
