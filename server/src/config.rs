//! Command line arguments and match timing configuration.

use clap::Parser;
use shared::{RingConfig, MAP_SEED, WALL_COUNT, WORLD_HEIGHT, WORLD_WIDTH};
use std::time::Duration;

/// Command line arguments of the `server` binary
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerArgs {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// TCP port for the reliable channel
    #[clap(short = 't', long, default_value = "7777")]
    pub tcp_port: u16,
    /// UDP port for the best-effort channel
    #[clap(short = 'u', long, default_value = "7778")]
    pub udp_port: u16,
    /// Map width in cells
    #[clap(long, default_value_t = WORLD_WIDTH)]
    pub width: i32,
    /// Map height in cells
    #[clap(long, default_value_t = WORLD_HEIGHT)]
    pub height: i32,
    /// Number of walls scattered over the map
    #[clap(long, default_value_t = WALL_COUNT)]
    pub walls: usize,
    /// Seed of the wall layout
    #[clap(long, default_value_t = MAP_SEED)]
    pub seed: u64,
    /// Maximum number of simultaneous connections
    #[clap(short, long, default_value = "16")]
    pub max_clients: usize,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            tcp_port: 7777,
            udp_port: 7778,
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            walls: WALL_COUNT,
            seed: MAP_SEED,
            max_clients: 16,
        }
    }
}

impl ServerArgs {
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.host, self.udp_port)
    }
}

/// Timing and rules of a match
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Simulation step while a round is running
    pub playing_tick: Duration,
    /// Simulation step in the lobby and on the results screen
    pub idle_tick: Duration,
    /// How long the win condition must hold before the round ends
    pub win_debounce: Duration,
    /// How long the results stay up before returning to the lobby
    pub game_over_delay: Duration,
    pub ring_broadcast_interval: Duration,
    /// Largest simulation step; longer stalls are clamped to this
    pub max_delta: Duration,
    pub min_players: usize,
    pub ring: RingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            playing_tick: Duration::from_secs_f64(1.0 / 60.0),
            idle_tick: Duration::from_millis(100),
            win_debounce: Duration::from_secs(1),
            game_over_delay: Duration::from_secs(5),
            ring_broadcast_interval: Duration::from_secs(1),
            max_delta: Duration::from_millis(50),
            min_players: 2,
            ring: RingConfig::default(),
        }
    }
}
