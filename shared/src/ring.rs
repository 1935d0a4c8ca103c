//! Shrinking safe zone.
//!
//! The zone is a rectangle that contracts by one cell on every side at a
//! fixed interval. Players standing outside of it take flat damage at a
//! second, faster interval. Both timers are advanced by the simulation tick.

use crate::entity::EntityId;
use crate::vector::Vector;
use crate::world::World;
use crate::{RING_DAMAGE, RING_DAMAGE_INTERVAL_MS, RING_MIN_SIZE, RING_SHRINK_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive bounds of the safe rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafeZone {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl SafeZone {
    /// Zone covering the whole map.
    pub fn full(width: i32, height: i32) -> Self {
        Self {
            min_x: 0,
            max_x: width - 1,
            min_y: 0,
            max_y: height - 1,
        }
    }

    pub fn contains(&self, position: Vector) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingConfig {
    pub shrink_interval: Duration,
    pub damage_interval: Duration,
    pub damage: i32,
    /// Smallest width or height the zone may shrink to.
    pub min_size: i32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            shrink_interval: Duration::from_millis(RING_SHRINK_INTERVAL_MS),
            damage_interval: Duration::from_millis(RING_DAMAGE_INTERVAL_MS),
            damage: RING_DAMAGE,
            min_size: RING_MIN_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RingSystem {
    config: RingConfig,
    zone: SafeZone,
    active: bool,
    since_shrink: Duration,
    since_damage: Duration,
}

impl RingSystem {
    pub fn new(config: RingConfig) -> Self {
        Self {
            config,
            zone: SafeZone::default(),
            active: false,
            since_shrink: Duration::ZERO,
            since_damage: Duration::ZERO,
        }
    }

    /// Resets the zone to the full map and restarts both timers.
    pub fn start(&mut self, width: i32, height: i32) {
        self.zone = SafeZone::full(width, height);
        self.since_shrink = Duration::ZERO;
        self.since_damage = Duration::ZERO;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn zone(&self) -> SafeZone {
        self.zone
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Contracts the zone by one cell per side. Returns `false` at minimum size.
    pub fn shrink(&mut self) -> bool {
        if self.zone.width() - 2 < self.config.min_size || self.zone.height() - 2 < self.config.min_size {
            return false;
        }
        self.zone.min_x += 1;
        self.zone.max_x -= 1;
        self.zone.min_y += 1;
        self.zone.max_y -= 1;
        true
    }

    /// Deals the ring damage to every living combatant outside the zone.
    ///
    /// Resistance does not apply. Returns the ids that were damaged.
    pub fn apply_damage(&self, world: &mut World) -> Vec<EntityId> {
        let zone = self.zone;
        let mut damaged = Vec::new();
        for entity in world.entities_mut() {
            let position = entity.position();
            let exposed = entity
                .as_player()
                .is_some_and(|player| !player.is_dead() && !player.is_waiting);
            if exposed && !zone.contains(position) {
                entity.take_damage(self.config.damage);
                damaged.push(entity.id);
            }
        }
        damaged.sort_unstable();
        damaged
    }

    /// Advances both timers by `dt`, shrinking and damaging as they elapse.
    ///
    /// Does nothing while stopped. Returns the ids damaged during this step.
    pub fn tick(&mut self, world: &mut World, dt: Duration) -> Vec<EntityId> {
        if !self.active {
            return Vec::new();
        }

        self.since_shrink += dt;
        while self.since_shrink >= self.config.shrink_interval {
            self.since_shrink -= self.config.shrink_interval;
            self.shrink();
        }

        let mut damaged = Vec::new();
        self.since_damage += dt;
        while self.since_damage >= self.config.damage_interval {
            self.since_damage -= self.config.damage_interval;
            damaged.extend(self.apply_damage(world));
        }
        damaged
    }
}

impl Default for RingSystem {
    fn default() -> Self {
        Self::new(RingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PLAYER_MAX_HEALTH;

    #[test]
    fn test_start_covers_whole_map() {
        let mut ring = RingSystem::default();
        ring.start(80, 40);

        assert!(ring.is_active());
        assert_eq!(ring.zone(), SafeZone { min_x: 0, max_x: 79, min_y: 0, max_y: 39 });
        assert!(ring.zone().contains(Vector::new(79, 39)));
        assert!(!ring.zone().contains(Vector::new(80, 0)));
    }

    #[test]
    fn test_shrink_stops_at_minimum_size() {
        let mut ring = RingSystem::default();
        ring.start(10, 8);

        assert!(ring.shrink());
        assert!(ring.shrink());
        assert_eq!(ring.zone().height(), 4);
        assert!(!ring.shrink());
        assert_eq!(ring.zone(), SafeZone { min_x: 2, max_x: 7, min_y: 2, max_y: 5 });
    }

    #[test]
    fn test_zone_never_grows() {
        let mut ring = RingSystem::default();
        let mut world = World::new(20, 20);
        ring.start(20, 20);

        let mut previous = ring.zone();
        for _ in 0..200 {
            ring.tick(&mut world, Duration::from_millis(500));
            let zone = ring.zone();
            assert!(zone.min_x >= previous.min_x && zone.max_x <= previous.max_x);
            assert!(zone.min_y >= previous.min_y && zone.max_y <= previous.max_y);
            previous = zone;
        }
        assert_eq!(previous.width(), 4);
    }

    #[test]
    fn test_outside_players_take_flat_damage() {
        let mut world = World::new(10, 10);
        let inside = world.spawn_player("inside", Vector::new(5, 5)).unwrap();
        let outside = world.spawn_player("outside", Vector::new(0, 0)).unwrap();
        if let Some(player) = world.player_mut(outside) {
            player.resistance = 50;
        }

        let mut ring = RingSystem::default();
        ring.start(10, 10);
        ring.shrink();

        let damaged = ring.tick(&mut world, Duration::from_secs(1));
        assert_eq!(damaged, vec![outside]);
        assert_eq!(world.player(outside).map(|p| p.health), Some(PLAYER_MAX_HEALTH - RING_DAMAGE));
        assert_eq!(world.player(inside).map(|p| p.health), Some(PLAYER_MAX_HEALTH));

        ring.tick(&mut world, Duration::from_millis(999));
        assert_eq!(world.player(outside).map(|p| p.health), Some(PLAYER_MAX_HEALTH - RING_DAMAGE));
    }

    #[test]
    fn test_waiting_players_are_spared() {
        let mut world = World::new(10, 10);
        let ghost = world.spawn_player("ghost", Vector::new(0, 0)).unwrap();
        if let Some(player) = world.player_mut(ghost) {
            player.is_waiting = true;
        }

        let mut ring = RingSystem::default();
        ring.start(10, 10);
        ring.shrink();

        assert!(ring.tick(&mut world, Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_stop_is_immediate() {
        let mut world = World::new(10, 10);
        let outside = world.spawn_player("outside", Vector::new(0, 0)).unwrap();
        let mut ring = RingSystem::default();
        ring.start(10, 10);
        ring.shrink();

        ring.stop();
        assert!(ring.tick(&mut world, Duration::from_secs(10)).is_empty());
        assert_eq!(world.player(outside).map(|p| p.health), Some(PLAYER_MAX_HEALTH));
    }

    #[test]
    fn test_shrink_timer_fires_every_interval() {
        let mut world = World::new(40, 40);
        let mut ring = RingSystem::default();
        ring.start(40, 40);

        ring.tick(&mut world, Duration::from_millis(4999));
        assert_eq!(ring.zone().min_x, 0);
        ring.tick(&mut world, Duration::from_millis(1));
        assert_eq!(ring.zone().min_x, 1);
    }
}
