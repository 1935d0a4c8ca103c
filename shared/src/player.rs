use crate::ability::AbilitySystem;
use crate::projectile::{Projectile, ProjectileType};
use crate::status::StatusEffects;
use crate::{BURN_TICKS, PLAYER_MAX_HEALTH};

#[derive(Debug, Clone)]
pub struct Player {
    pub health: i32,
    pub max_health: i32,
    /// Damage modifier in percent. Negative values amplify incoming damage.
    pub resistance: i32,
    pub can_move: bool,
    pub is_burning: bool,
    pub is_ready: bool,
    /// Joined while a round was running; excluded from combat until the next lobby.
    pub is_waiting: bool,
    /// Only meaningful on a client; the server never sets it.
    pub is_local_player: bool,
    pub abilities: AbilitySystem,
    pub effects: StatusEffects,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            resistance: 0,
            can_move: true,
            is_burning: false,
            is_ready: false,
            is_waiting: false,
            is_local_player: false,
            abilities: AbilitySystem::new(),
            effects: StatusEffects::new(),
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Applies `amount` damage without any resistance scaling.
    pub fn take_damage(&mut self, amount: i32) {
        if self.is_dead() {
            return;
        }
        self.health = (self.health - amount).clamp(0, self.max_health);
    }

    /// Applies `amount` damage scaled by the current resistance.
    ///
    /// A resistance of 100 or more fully absorbs the hit.
    pub fn take_hit(&mut self, amount: i32) {
        let multiplier = (100 - self.resistance).max(0);
        self.take_damage(amount * multiplier / 100);
    }

    /// Reacts to a projectile hit according to its type.
    pub fn on_projectile_hit(&mut self, projectile: &Projectile) {
        let damage = projectile.damage;
        match projectile.projectile_type {
            ProjectileType::Physical => self.take_hit(damage),
            ProjectileType::Electric => {
                self.take_hit(damage);
                self.effects.shock();
            }
            ProjectileType::Fire => {
                let immediate = damage / 2;
                self.take_hit(immediate);
                self.effects.ignite((damage - immediate).max(BURN_TICKS as i32));
            }
            ProjectileType::Ice => {
                self.take_hit(damage);
                self.effects.freeze();
            }
        }
        self.sync_effects();
    }

    /// Advances status effects by `dt` seconds and applies burn damage.
    pub fn tick_effects(&mut self, dt: f32) {
        for damage in self.effects.tick(dt) {
            if self.is_dead() {
                break;
            }
            self.take_hit(damage);
        }
        if self.is_dead() {
            self.effects.extinguish();
        }
        self.sync_effects();
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
        self.sync_effects();
    }

    /// Restores full health and clears every round-scoped modifier.
    pub fn reset_for_round(&mut self) {
        self.health = self.max_health;
        self.is_ready = false;
        self.clear_effects();
    }

    fn sync_effects(&mut self) {
        self.resistance = self.effects.resistance();
        self.can_move = self.effects.can_move();
        self.is_burning = self.effects.is_burning();
    }
}
