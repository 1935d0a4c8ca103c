use crate::projectile::ProjectileType;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-player ledger of when each ability type was last used.
///
/// The ledger does not enforce anything by itself: callers check
/// [`AbilitySystem::can_use`] before recording a use.
#[derive(Debug, Clone, Default)]
pub struct AbilitySystem {
    last_used: HashMap<ProjectileType, Instant>,
}

impl AbilitySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_use(&self, ability: ProjectileType, now: Instant) -> bool {
        match self.last_used.get(&ability) {
            None => true,
            Some(last) => now.saturating_duration_since(*last) >= ability.cooldown(),
        }
    }

    pub fn use_ability(&mut self, ability: ProjectileType, now: Instant) {
        self.last_used.insert(ability, now);
    }

    /// Time left until `ability` may be used again; zero when ready.
    pub fn remaining_cooldown(&self, ability: ProjectileType, now: Instant) -> Duration {
        match self.last_used.get(&ability) {
            None => Duration::ZERO,
            Some(last) => ability
                .cooldown()
                .saturating_sub(now.saturating_duration_since(*last)),
        }
    }

    pub fn reset(&mut self) {
        self.last_used.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_ability_is_ready() {
        let abilities = AbilitySystem::new();
        let now = Instant::now();

        for ability in ProjectileType::ALL {
            assert!(abilities.can_use(ability, now));
            assert_eq!(abilities.remaining_cooldown(ability, now), Duration::ZERO);
        }
    }

    #[test]
    fn test_cooldown_blocks_until_elapsed() {
        let mut abilities = AbilitySystem::new();
        let start = Instant::now();
        let cooldown = ProjectileType::Fire.cooldown();

        abilities.use_ability(ProjectileType::Fire, start);
        assert!(!abilities.can_use(ProjectileType::Fire, start));
        assert!(!abilities.can_use(ProjectileType::Fire, start + cooldown - Duration::from_millis(1)));
        assert!(abilities.can_use(ProjectileType::Fire, start + cooldown));
    }

    #[test]
    fn test_cooldowns_are_tracked_per_type() {
        let mut abilities = AbilitySystem::new();
        let start = Instant::now();

        abilities.use_ability(ProjectileType::Ice, start);
        assert!(!abilities.can_use(ProjectileType::Ice, start));
        assert!(abilities.can_use(ProjectileType::Physical, start));
    }

    #[test]
    fn test_remaining_cooldown_counts_down() {
        let mut abilities = AbilitySystem::new();
        let start = Instant::now();

        abilities.use_ability(ProjectileType::Electric, start);
        assert_eq!(
            abilities.remaining_cooldown(ProjectileType::Electric, start + Duration::from_millis(400)),
            Duration::from_millis(600)
        );
        assert_eq!(
            abilities.remaining_cooldown(ProjectileType::Electric, start + Duration::from_secs(5)),
            Duration::ZERO
        );
    }
}
