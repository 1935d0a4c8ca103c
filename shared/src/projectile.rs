use crate::entity::EntityId;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tolerance applied when an accumulator is compared against one full cell.
///
/// Repeated `f32` additions of values such as `0.1` land on `0.99999994`
/// instead of `1.0`; without the tolerance the step would slip a tick.
const STEP_EPSILON: f32 = 1e-4;

/// Ability/projectile family. The discriminants are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProjectileType {
    Physical = 1,
    Electric = 2,
    Fire = 3,
    Ice = 4,
}

impl ProjectileType {
    pub const ALL: [ProjectileType; 4] = [
        ProjectileType::Physical,
        ProjectileType::Electric,
        ProjectileType::Fire,
        ProjectileType::Ice,
    ];

    /// Travel speed in cells per second.
    pub fn default_speed(self) -> f32 {
        match self {
            ProjectileType::Physical => 20.0,
            ProjectileType::Electric => 25.0,
            ProjectileType::Fire => 15.0,
            ProjectileType::Ice => 10.0,
        }
    }

    pub fn default_damage(self) -> i32 {
        match self {
            ProjectileType::Physical => 15,
            ProjectileType::Electric => 10,
            ProjectileType::Fire => 20,
            ProjectileType::Ice => 10,
        }
    }

    pub fn cooldown(self) -> Duration {
        match self {
            ProjectileType::Physical => Duration::from_millis(500),
            ProjectileType::Electric => Duration::from_millis(1000),
            ProjectileType::Fire => Duration::from_millis(2000),
            ProjectileType::Ice => Duration::from_millis(3000),
        }
    }

    pub fn visual(self) -> &'static str {
        match self {
            ProjectileType::Physical => "💥",
            ProjectileType::Electric => "⚡",
            ProjectileType::Fire => "🔥",
            ProjectileType::Ice => "❄️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub owner_id: EntityId,
    pub direction: Vector,
    pub speed: f32,
    pub damage: i32,
    pub projectile_type: ProjectileType,
    pub delta_x: f32,
    pub delta_y: f32,
}

impl Projectile {
    /// Creates a projectile with the type's default speed and damage.
    pub fn new(owner_id: EntityId, direction: Vector, projectile_type: ProjectileType) -> Self {
        Self::with_stats(
            owner_id,
            direction,
            projectile_type.default_speed(),
            projectile_type.default_damage(),
            projectile_type,
        )
    }

    pub fn with_stats(
        owner_id: EntityId,
        direction: Vector,
        speed: f32,
        damage: i32,
        projectile_type: ProjectileType,
    ) -> Self {
        Self {
            owner_id,
            direction,
            speed,
            damage,
            projectile_type,
            delta_x: 0.0,
            delta_y: 0.0,
        }
    }

    /// Adds `direction * speed * dt` to the sub-tile accumulators.
    pub fn accumulate(&mut self, dt: f32) {
        self.delta_x += self.direction.x as f32 * self.speed * dt;
        self.delta_y += self.direction.y as f32 * self.speed * dt;
    }

    /// Consumes whole cells from the accumulators, one unit per axis.
    ///
    /// Returns `None` once neither axis holds a full cell. Axes that both
    /// hold a cell are combined into one diagonal step.
    pub fn next_step(&mut self) -> Option<Vector> {
        let step_x = Self::take_unit(&mut self.delta_x);
        let step_y = Self::take_unit(&mut self.delta_y);

        let step = Vector::new(step_x, step_y);
        if step.is_zero() {
            None
        } else {
            Some(step)
        }
    }

    fn take_unit(delta: &mut f32) -> i32 {
        if *delta >= 1.0 - STEP_EPSILON {
            *delta -= 1.0;
            1
        } else if *delta <= -1.0 + STEP_EPSILON {
            *delta += 1.0;
            -1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_defaults_follow_type() {
        let projectile = Projectile::new(7, Vector::new(1, 0), ProjectileType::Ice);
        assert_eq!(projectile.owner_id, 7);
        assert_eq!(projectile.speed, ProjectileType::Ice.default_speed());
        assert_eq!(projectile.damage, ProjectileType::Ice.default_damage());
        assert_eq!(projectile.delta_x, 0.0);
    }

    #[test]
    fn test_cooldowns_increase_with_power() {
        let cooldowns: Vec<Duration> = ProjectileType::ALL.iter().map(|t| t.cooldown()).collect();
        assert!(cooldowns.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_slow_projectile_waits_for_full_cell() {
        let mut projectile = Projectile::with_stats(1, Vector::new(1, 0), 5.0, 1, ProjectileType::Physical);

        for _ in 0..9 {
            projectile.accumulate(0.02);
            assert_eq!(projectile.next_step(), None);
        }

        projectile.accumulate(0.02);
        assert_eq!(projectile.next_step(), Some(Vector::new(1, 0)));
        assert_approx_eq!(projectile.delta_x, 0.0, 0.001);
    }

    #[test]
    fn test_diagonal_step_consumes_both_axes() {
        let mut projectile = Projectile::with_stats(1, Vector::new(-1, 1), 10.0, 1, ProjectileType::Fire);
        projectile.accumulate(0.25);

        assert_eq!(projectile.next_step(), Some(Vector::new(-1, 1)));
        assert_eq!(projectile.next_step(), Some(Vector::new(-1, 1)));
        assert_eq!(projectile.next_step(), None);
        assert_approx_eq!(projectile.delta_x, -0.5, 0.001);
        assert_approx_eq!(projectile.delta_y, 0.5, 0.001);
    }

    #[test]
    fn test_uneven_axes_split_into_straight_steps() {
        let mut projectile = Projectile::with_stats(1, Vector::new(1, 0), 2.0, 1, ProjectileType::Physical);
        projectile.delta_y = 1.0;
        projectile.accumulate(1.0);

        assert_eq!(projectile.next_step(), Some(Vector::new(1, 1)));
        assert_eq!(projectile.next_step(), Some(Vector::new(1, 0)));
        assert_eq!(projectile.next_step(), None);
    }
}
