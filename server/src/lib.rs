//! # Arena Server Library
//!
//! This library provides the authoritative server for the grid arena game. It
//! owns the only copy of the world, applies the inputs of every connected
//! client to it, and streams the results back so all clients render the same
//! match.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Movement, projectile travel, collisions, status effects and the shrinking
//! ring are all resolved here. Clients only send intents (a target cell, an
//! ability cast) and draw whatever the server reports back.
//!
//! ### Match Lifecycle
//! Players gather in a lobby and ready up. Once at least two players are
//! ready the round starts; the last player standing wins, the rankings are
//! shown for a few seconds and everybody returns to the lobby. Players
//! joining mid-round spectate until the next lobby.
//!
//! ### State Broadcasting
//! Spawn/destroy notices, chat and lobby updates travel on the reliable
//! channel. Positions, player status and the ring bounds are sent every tick
//! on the best-effort channel, where a lost datagram is simply superseded by
//! the next one.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! One simulation loop owns the world. Network tasks never touch game state;
//! they decode packets and hand them to the loop through an unbounded
//! channel, which is drained at the start of every tick.
//!
//! ### Two Transports
//! Every client holds one TCP connection (length-prefixed frames) and
//! registers a UDP port right after logging in. The packet type decides the
//! transport.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Tracks open connections:
//! - Connection id to player id mapping
//! - Reliable writer handles and registered UDP endpoints
//! - Capacity limit
//!
//! ### Config Module (`config`)
//! Command line arguments and match timings.
//!
//! ### Game Module (`game`)
//! The match state machine:
//! - Lobby, Playing and GameOver phases
//! - Inbound packet dispatch and validation
//! - Rankings, respawns and spectators
//!
//! ### Network Module (`network`)
//! Sockets, framing and the fixed-rate loop:
//! - TCP acceptor with per-connection reader and writer tasks
//! - Shared UDP receiver and sender tasks
//! - Routing of outbound packets to their channel
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerArgs;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let args = ServerArgs::default();
//!     let server = Server::new(&args).await?;
//!
//!     // Runs the simulation loop which:
//!     // - Accepts connections and spawns a player for each
//!     // - Applies queued client packets at the start of every tick
//!     // - Advances effects, the ring and projectiles
//!     // - Routes outbound packets to TCP or UDP
//!     server.run().await.map_err(|e| e.to_string())?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
