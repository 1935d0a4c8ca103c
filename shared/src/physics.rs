//! Projectile advancement and collision resolution on the grid.

use crate::entity::{Entity, EntityId};
use crate::vector::Vector;
use crate::world::World;

/// What happens to a projectile stepping onto a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Advance,
    Blocked,
    Hit(EntityId),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicsSystem;

impl PhysicsSystem {
    pub fn new() -> Self {
        Self
    }

    /// Advances every projectile by `dt` seconds and resolves collisions.
    ///
    /// Projectiles are processed in id order. Each whole-cell step either
    /// moves the projectile, destroys it on a wall or the map edge, or hits
    /// the solid entity in its way. Everything flagged for destruction during
    /// the update (projectiles and killed players) is removed from the world
    /// and returned.
    pub fn update(&mut self, world: &mut World, dt: f32) -> Vec<Entity> {
        for id in world.projectile_ids() {
            Self::advance_projectile(world, id, dt);
        }
        world.remove_destroyed()
    }

    fn advance_projectile(world: &mut World, id: EntityId, dt: f32) {
        let Some(entity) = world.get_mut(id) else {
            return;
        };
        if entity.should_destroy {
            return;
        }
        let position = entity.position();
        let Some(projectile) = entity.as_projectile_mut() else {
            return;
        };
        projectile.accumulate(dt);
        let snapshot = *projectile;

        let mut steps = Vec::new();
        let mut working = snapshot;
        while let Some(step) = working.next_step() {
            steps.push(step);
        }
        if let Some(projectile) = world.get_mut(id).and_then(Entity::as_projectile_mut) {
            projectile.delta_x = working.delta_x;
            projectile.delta_y = working.delta_y;
        }

        let mut current = position;
        for step in steps {
            let target = current + step;
            match Self::classify(world, id, snapshot.owner_id, target) {
                StepOutcome::Advance => {
                    if world.move_entity(id, target).is_err() {
                        Self::destroy(world, id);
                        return;
                    }
                    current = target;
                }
                StepOutcome::Blocked => {
                    Self::destroy(world, id);
                    return;
                }
                StepOutcome::Hit(target_id) => {
                    if let Some(target) = world.get_mut(target_id) {
                        target.on_projectile_hit(&snapshot);
                    }
                    Self::destroy(world, id);
                    return;
                }
            }
        }
    }

    fn classify(world: &World, id: EntityId, owner_id: EntityId, target: Vector) -> StepOutcome {
        if !world.in_bounds(target) {
            return StepOutcome::Blocked;
        }
        match world.solid_at(target) {
            None => StepOutcome::Advance,
            Some(occupant) if occupant == owner_id || occupant == id => StepOutcome::Advance,
            Some(occupant) => match world.get(occupant) {
                Some(entity) if !entity.is_wall() => StepOutcome::Hit(occupant),
                _ => StepOutcome::Blocked,
            },
        }
    }

    fn destroy(world: &mut World, id: EntityId) {
        if let Some(entity) = world.get_mut(id) {
            entity.should_destroy = true;
        }
    }
}
