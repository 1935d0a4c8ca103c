//! Authoritative match state machine
//!
//! `GameLogic` owns the [`World`] and every system that mutates it. The
//! network layer feeds it connection events and decoded packets, advances it
//! once per tick, and drains the packets it wants delivered.
//!
//! A match cycles through three phases:
//! - **Lobby**: players join, pick a name and ready up
//! - **Playing**: abilities, status effects and the shrinking ring are live
//! - **GameOver**: rankings are shown, then everyone returns to the lobby

use crate::config::GameConfig;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::protocol::{LobbyPlayerData, Packet};
use shared::{
    Entity, EntityId, PhysicsSystem, ProjectileType, RingSystem, Vector, World, WorldError,
    DEFAULT_PLAYER_NAME, DEFAULT_PLAYER_VISUAL, WAITING_PLAYER_VISUAL,
};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Sender id used for chat lines authored by the server itself
pub const SERVER_CHAT_ID: EntityId = 0;

const MAX_NAME_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Lobby,
    Playing,
    GameOver,
}

/// Packet produced by the game logic, waiting to be routed by the network layer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Broadcast(Packet),
    SendTo(EntityId, Packet),
}

pub struct GameLogic {
    world: World,
    physics: PhysicsSystem,
    ring: RingSystem,
    config: GameConfig,
    phase: MatchPhase,
    /// Participants captured when the round started
    roster: Vec<LobbyPlayerData>,
    /// Eliminated participants in order of elimination
    dead: Vec<LobbyPlayerData>,
    connected: HashSet<EntityId>,
    win_since: Option<Instant>,
    game_over_at: Option<Instant>,
    last_ring_broadcast: Option<Instant>,
    rankings: Vec<LobbyPlayerData>,
    /// Notices raised by inbound packets, broadcast at the start of the next tick
    events: VecDeque<Packet>,
    outbox: Vec<Outbound>,
    rng: StdRng,
}

impl GameLogic {
    pub fn new(world: World, config: GameConfig) -> Self {
        Self::with_rng(world, config, StdRng::from_entropy())
    }

    /// Creates the game logic with a fixed spawn seed, for reproducible runs
    pub fn with_seed(world: World, config: GameConfig, seed: u64) -> Self {
        Self::with_rng(world, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(world: World, config: GameConfig, rng: StdRng) -> Self {
        let ring = RingSystem::new(config.ring);
        Self {
            world,
            physics: PhysicsSystem::new(),
            ring,
            config,
            phase: MatchPhase::Lobby,
            roster: Vec::new(),
            dead: Vec::new(),
            connected: HashSet::new(),
            win_since: None,
            game_over_at: None,
            last_ring_broadcast: None,
            rankings: Vec::new(),
            events: VecDeque::new(),
            outbox: Vec::new(),
            rng,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn ring(&self) -> &RingSystem {
        &self.ring
    }

    /// Rankings of the last finished round, winner first
    pub fn rankings(&self) -> &[LobbyPlayerData] {
        &self.rankings
    }

    /// Step length the simulation loop should use in the current phase
    pub fn tick_interval(&self) -> Duration {
        match self.phase {
            MatchPhase::Playing => self.config.playing_tick,
            MatchPhase::Lobby | MatchPhase::GameOver => self.config.idle_tick,
        }
    }

    pub fn max_delta(&self) -> Duration {
        self.config.max_delta
    }

    /// Takes every packet queued for delivery since the last call
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    fn broadcast(&mut self, packet: Packet) {
        self.outbox.push(Outbound::Broadcast(packet));
    }

    fn send_to(&mut self, player_id: EntityId, packet: Packet) {
        self.outbox.push(Outbound::SendTo(player_id, packet));
    }

    /// Spawns a player for a new connection and returns its id
    ///
    /// The new player receives its Login and a full world snapshot. Players
    /// joining while a round is running (or its results are shown) become
    /// waiting spectators until the next lobby.
    pub fn handle_connect(&mut self) -> Result<EntityId, WorldError> {
        let location = self.world.random_empty_location(&mut self.rng)?;
        let id = self.world.spawn_player(DEFAULT_PLAYER_NAME, location)?;
        self.connected.insert(id);

        let spectating = self.phase != MatchPhase::Lobby;
        if spectating {
            self.make_waiting(id);
        }

        self.send_to(
            id,
            Packet::Login {
                player_name: DEFAULT_PLAYER_NAME.to_string(),
                player_id: id,
                spawn_location: location,
            },
        );
        self.send_to(id, Packet::world_state(&self.world));

        if spectating {
            info!("Player {} joined mid-round and is spectating", id);
            self.send_to(
                id,
                Packet::Chat {
                    message: "A round is in progress. You will join the next one.".to_string(),
                    player_id: SERVER_CHAT_ID,
                },
            );
        } else {
            info!("Player {} spawned at {}", id, location);
            if let Some(notice) = self.world.get(id).and_then(|e| Packet::spawn_or_destroy(e, true)) {
                self.events.push_back(notice);
            }
        }

        Ok(id)
    }

    fn make_waiting(&mut self, id: EntityId) {
        if let Some(entity) = self.world.get_mut(id) {
            entity.visual = WAITING_PLAYER_VISUAL.to_string();
            if let Some(player) = entity.as_player_mut() {
                player.is_waiting = true;
                player.is_ready = false;
            }
        }
        if let Err(e) = self.world.set_solid(id, false) {
            error!("Failed to make player {} a spectator: {}", id, e);
        }
    }

    /// Removes the player of a closed connection
    pub fn handle_disconnect(&mut self, id: EntityId) {
        self.connected.remove(&id);
        match self.world.remove(id) {
            Some(entity) => {
                info!("Player {} ({}) left the game", id, entity.name);
                if let Some(notice) = Packet::spawn_or_destroy(&entity, false) {
                    self.events.push_back(notice);
                }
            }
            None => debug!("Disconnect for player {} without an entity", id),
        }
    }

    /// Applies one inbound packet on behalf of `sender`
    ///
    /// The sender id always comes from the connection; ids carried in the
    /// packet body are ignored.
    pub fn handle_packet(&mut self, sender: EntityId, packet: Packet, now: Instant) {
        // Eliminated participants stay connected and may keep chatting.
        if let Packet::Chat { message, .. } = packet {
            if self.connected.contains(&sender) {
                self.events.push_back(Packet::Chat {
                    message,
                    player_id: sender,
                });
            }
            return;
        }
        if !self.world.contains(sender) {
            debug!("Dropping {:?} from player {} without an entity", packet.kind(), sender);
            return;
        }

        match packet {
            Packet::Login { player_name, .. } => {
                let visual = self.world.get(sender).map(|e| e.visual.clone()).unwrap_or_default();
                self.update_player_info(sender, player_name, visual);
            }
            Packet::Movement { vector, .. } => self.try_move(sender, vector),
            Packet::Action {
                ability_type,
                direction,
                ..
            } => self.try_cast(sender, ability_type, direction, now),
            Packet::PlayerReady { is_ready, .. } => {
                if self.phase != MatchPhase::Lobby {
                    return;
                }
                if let Some(player) = self.world.player_mut(sender) {
                    if !player.is_waiting {
                        player.is_ready = is_ready;
                        debug!("Player {} ready: {}", sender, is_ready);
                    }
                }
            }
            Packet::UpdatePlayerInfo { name, visual, .. } => {
                self.update_player_info(sender, name, visual);
            }
            Packet::ClientUdpPort { .. } => {
                debug!("UDP registration from player {} reached the game logic", sender);
            }
            other => {
                warn!("Unexpected {:?} packet from player {}", other.kind(), sender);
            }
        }
    }

    fn update_player_info(&mut self, sender: EntityId, name: String, visual: String) {
        let Some(entity) = self.world.get_mut(sender) else {
            return;
        };

        let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        if !name.is_empty() {
            entity.name = name;
        }
        let waiting = entity.as_player().is_some_and(|p| p.is_waiting);
        if !waiting && !visual.trim().is_empty() {
            entity.visual = visual.trim().to_string();
        }

        let notice = Packet::UpdatePlayerInfo {
            player_id: sender,
            name: entity.name.clone(),
            visual: entity.visual.clone(),
        };
        self.events.push_back(notice);
    }

    fn try_move(&mut self, sender: EntityId, target: Vector) {
        if self.phase == MatchPhase::GameOver {
            return;
        }
        let can_move = self.world.player(sender).is_some_and(|p| p.can_move && !p.is_dead());
        if !can_move || !self.world.is_walkable(target) {
            return;
        }
        if self.world.move_entity(sender, target).is_ok() {
            self.broadcast(Packet::Movement {
                vector: target,
                player_id: sender,
            });
        }
    }

    fn try_cast(&mut self, sender: EntityId, ability: ProjectileType, direction: Vector, now: Instant) {
        if self.phase != MatchPhase::Playing {
            return;
        }
        let direction = direction.signum();
        if direction.is_zero() {
            return;
        }

        let Some(entity) = self.world.get_mut(sender) else {
            return;
        };
        let position = entity.position();
        let Some(player) = entity.as_player_mut() else {
            return;
        };
        if player.is_waiting || player.is_dead() || !player.abilities.can_use(ability, now) {
            return;
        }
        player.abilities.use_ability(ability, now);

        match self.world.spawn_projectile(sender, position, direction, ability) {
            Ok(id) => {
                debug!("Player {} cast {:?} towards {} as {}", sender, ability, direction, id);
                if let Some(notice) = self.world.get(id).and_then(|e| Packet::spawn_or_destroy(e, true)) {
                    self.events.push_back(notice);
                }
            }
            Err(e) => warn!("Player {} could not cast {:?}: {}", sender, ability, e),
        }
    }

    /// Advances the match by one step of length `dt`
    pub fn tick(&mut self, now: Instant, dt: Duration) {
        while let Some(event) = self.events.pop_front() {
            self.broadcast(event);
        }

        match self.phase {
            MatchPhase::Lobby => self.tick_lobby(now),
            MatchPhase::Playing => self.tick_playing(now, dt),
            MatchPhase::GameOver => self.tick_game_over(now),
        }
    }

    fn tick_lobby(&mut self, now: Instant) {
        self.broadcast(Packet::lobby_state(&self.world));

        let players = self.world.players();
        let everyone_ready = players
            .iter()
            .filter_map(|e| e.as_player())
            .all(|p| p.is_ready);
        if players.len() >= self.config.min_players && everyone_ready {
            self.start_match(now);
        }
    }

    fn start_match(&mut self, now: Instant) {
        self.roster = self
            .world
            .players()
            .into_iter()
            .filter(|e| e.as_player().is_some_and(|p| !p.is_waiting))
            .filter_map(LobbyPlayerData::from_entity)
            .collect();

        let roster_ids: HashSet<EntityId> = self.roster.iter().map(|p| p.id).collect();
        for id in self.world.player_ids() {
            if !roster_ids.contains(&id) {
                self.make_waiting(id);
                continue;
            }
            if let Some(player) = self.world.player_mut(id) {
                player.reset_for_round();
                player.abilities.reset();
            }
        }

        self.dead.clear();
        self.rankings.clear();
        self.win_since = None;
        self.last_ring_broadcast = Some(now);
        self.ring.start(self.world.width(), self.world.height());
        self.phase = MatchPhase::Playing;

        info!("Round started with {} players", self.roster.len());
        self.broadcast(Packet::GameStart);
        self.broadcast(Packet::ring_state(self.ring.zone()));
    }

    fn tick_playing(&mut self, now: Instant, dt: Duration) {
        let dt_secs = dt.as_secs_f32();

        for entity in self.world.entities_mut() {
            entity.tick_effects(dt_secs);
        }
        self.ring.tick(&mut self.world, dt);

        // Also sweeps players killed by burns or the ring this tick.
        let destroyed = self.physics.update(&mut self.world, dt_secs);
        for entity in &destroyed {
            self.record_destroyed(entity);
        }
        self.record_vanished();

        if self.win_condition_holds() {
            let since = *self.win_since.get_or_insert(now);
            if now.saturating_duration_since(since) >= self.config.win_debounce {
                self.end_match(now);
                return;
            }
        } else {
            self.win_since = None;
        }

        self.broadcast_positions();
        let ring_due = self
            .last_ring_broadcast
            .map_or(true, |last| now.saturating_duration_since(last) >= self.config.ring_broadcast_interval);
        if ring_due {
            self.last_ring_broadcast = Some(now);
            self.broadcast(Packet::ring_state(self.ring.zone()));
        }
    }

    fn record_destroyed(&mut self, entity: &Entity) {
        if let Some(notice) = Packet::spawn_or_destroy(entity, false) {
            self.broadcast(notice);
        }

        let Some(player) = entity.as_player() else {
            return;
        };
        if player.is_waiting || !self.in_roster(entity.id) || self.is_recorded_dead(entity.id) {
            return;
        }
        info!("Player {} ({}) was eliminated", entity.id, entity.name);
        if let Some(data) = LobbyPlayerData::from_entity(entity) {
            self.dead.push(data);
        }
    }

    /// Participants that left the world without dying, e.g. by disconnecting
    fn record_vanished(&mut self) {
        let vanished: Vec<LobbyPlayerData> = self
            .roster
            .iter()
            .filter(|p| !self.world.contains(p.id) && !self.is_recorded_dead(p.id))
            .cloned()
            .collect();
        for data in vanished {
            info!("Player {} ({}) left the round", data.id, data.name);
            self.dead.push(data);
        }
    }

    fn in_roster(&self, id: EntityId) -> bool {
        self.roster.iter().any(|p| p.id == id)
    }

    fn is_recorded_dead(&self, id: EntityId) -> bool {
        self.dead.iter().any(|p| p.id == id)
    }

    fn alive_players(&self) -> Vec<&Entity> {
        self.world
            .players()
            .into_iter()
            .filter(|e| e.as_player().is_some_and(|p| !p.is_waiting && !p.is_dead()))
            .collect()
    }

    fn win_condition_holds(&self) -> bool {
        let initial = self.roster.len();
        let alive = self.alive_players().len();
        (initial > 1 && alive <= 1) || (initial == 1 && alive == 0)
    }

    fn end_match(&mut self, now: Instant) {
        self.ring.stop();

        let mut rankings: Vec<LobbyPlayerData> = self
            .alive_players()
            .into_iter()
            .filter_map(LobbyPlayerData::from_entity)
            .collect();
        rankings.extend(self.dead.iter().rev().cloned());

        match rankings.first() {
            Some(winner) if !self.alive_players().is_empty() => {
                info!("Round over, winner is player {} ({})", winner.id, winner.name)
            }
            _ => info!("Round over without a survivor"),
        }

        self.rankings = rankings.clone();
        self.phase = MatchPhase::GameOver;
        self.game_over_at = Some(now);
        self.win_since = None;
        self.broadcast(Packet::GameOver { rankings });
    }

    fn broadcast_positions(&mut self) {
        let mut packets = Vec::new();
        for entity in self.world.players() {
            if entity.as_player().is_some_and(|p| p.is_waiting) {
                continue;
            }
            packets.push(Packet::Movement {
                vector: entity.position(),
                player_id: entity.id,
            });
            if let Some(status) = Packet::player_status(entity) {
                packets.push(status);
            }
        }
        for id in self.world.projectile_ids() {
            if let Some(entity) = self.world.get(id) {
                packets.push(Packet::Movement {
                    vector: entity.position(),
                    player_id: id,
                });
            }
        }
        for packet in packets {
            self.broadcast(packet);
        }
    }

    fn tick_game_over(&mut self, now: Instant) {
        let elapsed = self
            .game_over_at
            .map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
        if elapsed >= self.config.game_over_delay {
            self.return_to_lobby();
        }
    }

    fn return_to_lobby(&mut self) {
        for entity in self.world.clear_projectiles() {
            if let Some(notice) = Packet::spawn_or_destroy(&entity, false) {
                self.broadcast(notice);
            }
        }

        for id in self.world.player_ids() {
            self.reset_player(id);
        }

        // Death records carry the name and glyph the player had when eliminated.
        let returning: Vec<LobbyPlayerData> = self
            .dead
            .iter()
            .filter(|p| self.connected.contains(&p.id) && !self.world.contains(p.id))
            .cloned()
            .collect();
        for data in returning {
            self.respawn(&data);
        }

        for entity in self.world.players() {
            if let Some(notice) = Packet::spawn_or_destroy(entity, true) {
                self.outbox.push(Outbound::Broadcast(notice));
            }
        }

        self.roster.clear();
        self.dead.clear();
        self.game_over_at = None;
        self.win_since = None;
        self.phase = MatchPhase::Lobby;
        info!("Back to the lobby with {} players", self.world.player_ids().len());
    }

    /// Moves a surviving player to a fresh cell and restores it for the next round
    fn reset_player(&mut self, id: EntityId) {
        match self.world.random_empty_location(&mut self.rng) {
            Ok(location) => {
                if let Err(e) = self.world.move_entity(id, location) {
                    error!("Failed to reposition player {}: {}", id, e);
                }
            }
            Err(e) => error!("No room to reposition player {}: {}", id, e),
        }

        let was_waiting = self.world.player(id).is_some_and(|p| p.is_waiting);
        if was_waiting {
            if let Err(e) = self.world.set_solid(id, true) {
                error!("Failed to turn spectator {} into a player: {}", id, e);
            }
        }

        if let Some(entity) = self.world.get_mut(id) {
            if was_waiting {
                entity.visual = DEFAULT_PLAYER_VISUAL.to_string();
            }
            if let Some(player) = entity.as_player_mut() {
                player.is_waiting = false;
                player.reset_for_round();
                player.abilities.reset();
            }
        }
    }

    fn respawn(&mut self, data: &LobbyPlayerData) {
        let location = match self.world.random_empty_location(&mut self.rng) {
            Ok(location) => location,
            Err(e) => {
                error!("No room to respawn player {}: {}", data.id, e);
                return;
            }
        };
        match self.world.spawn_player_with_id(data.id, &data.name, &data.visual, location) {
            Ok(()) => info!("Player {} respawned at {}", data.id, location),
            Err(e) => error!("Failed to respawn player {}: {}", data.id, e),
        }
    }
}
