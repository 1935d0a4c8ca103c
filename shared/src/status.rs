//! Timed combat modifiers applied by elemental hits.
//!
//! Every effect is a countdown advanced by the simulation tick, so the effect
//! state lives next to the stats it modifies and is only written by the
//! simulation loop.

use crate::{
    BURN_INTERVAL_SECS, BURN_TICKS, FREEZE_DURATION_SECS, FREEZE_RESISTANCE, SHOCK_DURATION_SECS,
    SHOCK_RESISTANCE,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Burn {
    ticks_left: u32,
    damage_per_tick: i32,
    until_next: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timed {
    remaining: f32,
}

/// Active burn/shock/freeze state for one player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEffects {
    burn: Option<Burn>,
    shock: Option<Timed>,
    freeze: Option<Timed>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a burn dealing `total_damage` over the burn ticks.
    pub fn ignite(&mut self, total_damage: i32) {
        let damage_per_tick = (total_damage / BURN_TICKS as i32).max(1);
        self.burn = Some(Burn {
            ticks_left: BURN_TICKS,
            damage_per_tick,
            until_next: BURN_INTERVAL_SECS,
        });
    }

    pub fn shock(&mut self) {
        self.shock = Some(Timed {
            remaining: SHOCK_DURATION_SECS,
        });
    }

    pub fn freeze(&mut self) {
        self.freeze = Some(Timed {
            remaining: FREEZE_DURATION_SECS,
        });
    }

    /// Advances all countdowns by `dt` seconds.
    ///
    /// Returns the burn damage values that came due during this step, in
    /// order. The caller applies them and calls [`StatusEffects::extinguish`]
    /// if the player dies part way through.
    pub fn tick(&mut self, dt: f32) -> Vec<i32> {
        let mut due = Vec::new();

        if let Some(burn) = self.burn.as_mut() {
            burn.until_next -= dt;
            while burn.until_next <= 0.0 && burn.ticks_left > 0 {
                due.push(burn.damage_per_tick);
                burn.ticks_left -= 1;
                burn.until_next += BURN_INTERVAL_SECS;
            }
            if burn.ticks_left == 0 {
                self.burn = None;
            }
        }

        Self::count_down(&mut self.shock, dt);
        Self::count_down(&mut self.freeze, dt);

        due
    }

    fn count_down(effect: &mut Option<Timed>, dt: f32) {
        if let Some(timed) = effect.as_mut() {
            timed.remaining -= dt;
            if timed.remaining <= 0.0 {
                *effect = None;
            }
        }
    }

    pub fn extinguish(&mut self) {
        self.burn = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_burning(&self) -> bool {
        self.burn.is_some()
    }

    pub fn is_shocked(&self) -> bool {
        self.shock.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_some()
    }

    pub fn can_move(&self) -> bool {
        self.freeze.is_none()
    }

    /// Resistance imposed by the active modifier that expires last.
    ///
    /// An effect running out never overrides one that is still active.
    pub fn resistance(&self) -> i32 {
        match (self.shock, self.freeze) {
            (Some(shock), Some(freeze)) if shock.remaining > freeze.remaining => SHOCK_RESISTANCE,
            (_, Some(_)) => FREEZE_RESISTANCE,
            (Some(_), None) => SHOCK_RESISTANCE,
            (None, None) => 0,
        }
    }
}
