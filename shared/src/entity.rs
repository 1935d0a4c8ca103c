use crate::player::Player;
use crate::projectile::Projectile;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

pub type EntityId = u32;

/// Console palette used by the front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    White,
    Gray,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
}

/// Kind-specific state of an entity.
#[derive(Debug, Clone)]
pub enum EntityKind {
    Player(Player),
    Projectile(Projectile),
    /// Static map obstacle.
    Wall,
}

/// Anything that occupies a cell of the world.
///
/// `position` and `is_solid` decide which grid cells hold the entity's id, so
/// they are only changed through [`crate::World`].
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub visual: String,
    pub color: Color,
    pub should_destroy: bool,
    pub kind: EntityKind,
    pub(crate) position: Vector,
    pub(crate) is_solid: bool,
}

impl Entity {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        visual: impl Into<String>,
        position: Vector,
        is_solid: bool,
        kind: EntityKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            visual: visual.into(),
            color: Color::default(),
            should_destroy: false,
            kind,
            position,
            is_solid,
        }
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn is_solid(&self) -> bool {
        self.is_solid
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            EntityKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            EntityKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.kind {
            EntityKind::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    pub fn as_projectile_mut(&mut self) -> Option<&mut Projectile> {
        match &mut self.kind {
            EntityKind::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, EntityKind::Projectile(_))
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.kind, EntityKind::Wall)
    }

    /// Lets this entity react to being struck by `projectile`.
    ///
    /// Only players react; damage and the destroy flag are updated together.
    pub fn on_projectile_hit(&mut self, projectile: &Projectile) {
        if let EntityKind::Player(player) = &mut self.kind {
            player.on_projectile_hit(projectile);
            self.should_destroy |= player.is_dead();
        }
    }

    /// Applies unscaled damage to a player entity.
    pub fn take_damage(&mut self, amount: i32) {
        if let EntityKind::Player(player) = &mut self.kind {
            player.take_damage(amount);
            self.should_destroy |= player.is_dead();
        }
    }

    /// Advances a player's status effects by `dt` seconds.
    pub fn tick_effects(&mut self, dt: f32) {
        if let EntityKind::Player(player) = &mut self.kind {
            player.tick_effects(dt);
            self.should_destroy |= player.is_dead();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projectile::ProjectileType;

    fn player_entity() -> Entity {
        Entity::new(1, "alice", "😀", Vector::new(2, 3), true, EntityKind::Player(Player::new()))
    }

    #[test]
    fn test_entity_creation() {
        let entity = player_entity();
        assert_eq!(entity.id, 1);
        assert_eq!(entity.name, "alice");
        assert_eq!(entity.position(), Vector::new(2, 3));
        assert!(entity.is_solid());
        assert!(entity.is_player());
        assert!(!entity.should_destroy);
        assert_eq!(entity.color, Color::White);
    }

    #[test]
    fn test_lethal_damage_flags_destroy() {
        let mut entity = player_entity();
        entity.take_damage(40);
        assert!(!entity.should_destroy);

        entity.take_damage(60);
        assert!(entity.should_destroy);
        assert!(entity.as_player().is_some_and(Player::is_dead));
    }

    #[test]
    fn test_walls_ignore_hits() {
        let mut wall = Entity::new(5, "wall", "#", Vector::new(0, 0), true, EntityKind::Wall);
        let projectile = Projectile::new(1, Vector::new(1, 0), ProjectileType::Physical);

        wall.on_projectile_hit(&projectile);
        assert!(!wall.should_destroy);
    }

    #[test]
    fn test_projectile_hit_damages_player() {
        let mut entity = player_entity();
        let projectile = Projectile::new(9, Vector::new(1, 0), ProjectileType::Physical);

        entity.on_projectile_hit(&projectile);
        let health = entity.as_player().map(|p| p.health);
        assert_eq!(health, Some(100 - ProjectileType::Physical.default_damage()));
    }
}
