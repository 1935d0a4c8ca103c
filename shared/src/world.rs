//! Grid world: entity storage plus the collision and render grids.
//!
//! The two grids are derived data. Every mutation of an entity's position or
//! solidity goes through this module, which clears the previous cells before
//! writing the new ones so that no stale id survives a move or removal.

use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::WorldError;
use crate::player::Player;
use crate::projectile::{Projectile, ProjectileType};
use crate::vector::Vector;
use crate::{DEFAULT_PLAYER_VISUAL, WALL_VISUAL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const FIRST_ENTITY_ID: EntityId = 1;
const RANDOM_PLACEMENT_ATTEMPTS: usize = 256;

#[derive(Debug, Clone)]
pub struct World {
    width: i32,
    height: i32,
    collision_grid: Vec<Option<EntityId>>,
    render_grid: Vec<Option<EntityId>>,
    /// Number of entities standing on each cell.
    occupants: Vec<u32>,
    entities: HashMap<EntityId, Entity>,
    next_entity_id: EntityId,
}

impl World {
    /// Creates an empty map.
    pub fn new(width: i32, height: i32) -> Self {
        let cells = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            collision_grid: vec![None; cells],
            render_grid: vec![None; cells],
            occupants: vec![0; cells],
            entities: HashMap::new(),
            next_entity_id: FIRST_ENTITY_ID,
        }
    }

    /// Creates a map with `wall_count` walls scattered over the interior.
    ///
    /// The layout only depends on `seed`, so every process started with the
    /// same seed builds the same arena. Duplicate picks are skipped.
    pub fn generate(width: i32, height: i32, wall_count: usize, seed: u64) -> Self {
        let mut world = Self::new(width, height);
        if width < 3 || height < 3 {
            return world;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..wall_count {
            let position = Vector::new(rng.gen_range(1..width - 1), rng.gen_range(1..height - 1));
            if world.is_walkable(position) {
                // Cell was just checked, placement cannot fail.
                let _ = world.spawn_wall(position);
            }
        }
        world
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Vector) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    fn index(&self, position: Vector) -> Option<usize> {
        if self.in_bounds(position) {
            Some((position.y * self.width + position.x) as usize)
        } else {
            None
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Inserts `entity` under `id`, or replaces the entity already stored there.
    ///
    /// The previous render/collision cells of an existing entity are cleared
    /// before the new ones are written. A solid entity cannot be placed on a
    /// cell held by another solid entity.
    pub fn add_or_update(&mut self, id: EntityId, mut entity: Entity) -> Result<(), WorldError> {
        entity.id = id;
        let position = entity.position;
        if !self.in_bounds(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        if entity.is_solid {
            if let Some(occupant) = self.solid_at(position) {
                if occupant != id {
                    return Err(WorldError::Occupied(position));
                }
            }
        }

        if let Some(previous) = self.entities.get(&id) {
            let (old_position, was_solid) = (previous.position, previous.is_solid);
            self.clear_cells(id, old_position, was_solid);
        }
        self.write_cells(id, position, entity.is_solid);
        self.entities.insert(id, entity);

        if id >= self.next_entity_id {
            self.next_entity_id = id + 1;
        }
        Ok(())
    }

    /// Removes an entity and its grid registrations. No-op for unknown ids.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.clear_cells(id, entity.position, entity.is_solid);
        Some(entity)
    }

    /// Moves an entity to `to`, keeping both grids in step.
    pub fn move_entity(&mut self, id: EntityId, to: Vector) -> Result<(), WorldError> {
        let (from, solid) = match self.entities.get(&id) {
            Some(entity) => (entity.position, entity.is_solid),
            None => return Err(WorldError::UnknownEntity(id)),
        };
        if !self.in_bounds(to) {
            return Err(WorldError::OutOfBounds(to));
        }
        if solid && self.solid_at(to).is_some_and(|occupant| occupant != id) {
            return Err(WorldError::Occupied(to));
        }

        self.clear_cells(id, from, solid);
        self.write_cells(id, to, solid);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = to;
        }
        Ok(())
    }

    /// Changes whether an entity blocks its cell.
    pub fn set_solid(&mut self, id: EntityId, solid: bool) -> Result<(), WorldError> {
        let (position, was_solid) = match self.entities.get(&id) {
            Some(entity) => (entity.position, entity.is_solid),
            None => return Err(WorldError::UnknownEntity(id)),
        };
        if solid && self.solid_at(position).is_some_and(|occupant| occupant != id) {
            return Err(WorldError::Occupied(position));
        }

        self.clear_cells(id, position, was_solid);
        self.write_cells(id, position, solid);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.is_solid = solid;
        }
        Ok(())
    }

    fn clear_cells(&mut self, id: EntityId, position: Vector, solid: bool) {
        let Some(index) = self.index(position) else {
            return;
        };
        if solid && self.collision_grid[index] == Some(id) {
            self.collision_grid[index] = None;
        }
        self.occupants[index] = self.occupants[index].saturating_sub(1);
        if self.render_grid[index] == Some(id) {
            // Solid occupant first, then anything else still standing here.
            let fallback = match self.collision_grid[index] {
                Some(occupant) => Some(occupant),
                None if self.occupants[index] > 0 => self.co_located(id, position),
                None => None,
            };
            self.render_grid[index] = fallback;
        }
    }

    /// Lowest id, other than `id`, of an entity standing on `position`.
    fn co_located(&self, id: EntityId, position: Vector) -> Option<EntityId> {
        self.entities
            .values()
            .filter(|e| e.id != id && e.position == position)
            .map(|e| e.id)
            .min()
    }

    fn write_cells(&mut self, id: EntityId, position: Vector, solid: bool) {
        let Some(index) = self.index(position) else {
            return;
        };
        self.render_grid[index] = Some(id);
        self.occupants[index] += 1;
        if solid {
            self.collision_grid[index] = Some(id);
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.entities.get(&id).and_then(Entity::as_player)
    }

    pub fn player_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.entities.get_mut(&id).and_then(Entity::as_player_mut)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Player entities ordered by id.
    pub fn players(&self) -> Vec<&Entity> {
        let mut players: Vec<&Entity> = self.entities.values().filter(|e| e.is_player()).collect();
        players.sort_by_key(|e| e.id);
        players
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.ids_where(Entity::is_player)
    }

    pub fn projectile_ids(&self) -> Vec<EntityId> {
        self.ids_where(Entity::is_projectile)
    }

    fn ids_where(&self, predicate: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| predicate(e))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Topmost entity drawn at `position`.
    pub fn entity_at(&self, position: Vector) -> Option<&Entity> {
        let id = self.render_at(position)?;
        self.entities.get(&id)
    }

    pub fn render_at(&self, position: Vector) -> Option<EntityId> {
        self.index(position).and_then(|i| self.render_grid[i])
    }

    /// Solid entity blocking `position`.
    pub fn solid_at(&self, position: Vector) -> Option<EntityId> {
        self.index(position).and_then(|i| self.collision_grid[i])
    }

    pub fn is_walkable(&self, position: Vector) -> bool {
        self.in_bounds(position) && self.solid_at(position).is_none()
    }

    pub fn spawn_player(&mut self, name: &str, position: Vector) -> Result<EntityId, WorldError> {
        let id = self.next_entity_id;
        self.spawn_player_with_id(id, name, DEFAULT_PLAYER_VISUAL, position)?;
        Ok(id)
    }

    /// Places a fresh player under a known id, used when a participant returns.
    pub fn spawn_player_with_id(
        &mut self,
        id: EntityId,
        name: &str,
        visual: &str,
        position: Vector,
    ) -> Result<(), WorldError> {
        let entity = Entity::new(id, name, visual, position, true, EntityKind::Player(Player::new()));
        self.add_or_update(id, entity)
    }

    /// Spawns a projectile on `position`; projectiles never block a cell.
    pub fn spawn_projectile(
        &mut self,
        owner_id: EntityId,
        position: Vector,
        direction: Vector,
        projectile_type: ProjectileType,
    ) -> Result<EntityId, WorldError> {
        let projectile = Projectile::new(owner_id, direction, projectile_type);
        self.insert_projectile(position, projectile)
    }

    pub fn insert_projectile(
        &mut self,
        position: Vector,
        projectile: Projectile,
    ) -> Result<EntityId, WorldError> {
        if !self.in_bounds(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        let id = self.allocate_id();
        let visual = projectile.projectile_type.visual();
        let entity = Entity::new(id, "Projectile", visual, position, false, EntityKind::Projectile(projectile));
        self.add_or_update(id, entity)?;
        Ok(id)
    }

    pub fn spawn_wall(&mut self, position: Vector) -> Result<EntityId, WorldError> {
        if !self.is_walkable(position) {
            return Err(if self.in_bounds(position) {
                WorldError::Occupied(position)
            } else {
                WorldError::OutOfBounds(position)
            });
        }
        let id = self.allocate_id();
        let entity = Entity::new(id, "Wall", WALL_VISUAL, position, true, EntityKind::Wall);
        self.add_or_update(id, entity)?;
        Ok(id)
    }

    /// Picks a uniformly random interior cell whose collision slot is empty.
    ///
    /// Falls back to a scan after a bounded number of misses, so a crowded
    /// map still terminates. A full map is reported as an error.
    pub fn random_empty_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vector, WorldError> {
        let no_cell = WorldError::NoEmptyCell {
            width: self.width,
            height: self.height,
        };
        if self.width <= 0 || self.height <= 0 {
            return Err(no_cell);
        }

        let (x_range, y_range) = if self.width > 2 && self.height > 2 {
            (1..self.width - 1, 1..self.height - 1)
        } else {
            (0..self.width, 0..self.height)
        };

        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let candidate = Vector::new(rng.gen_range(x_range.clone()), rng.gen_range(y_range.clone()));
            if self.is_walkable(candidate) {
                return Ok(candidate);
            }
        }

        y_range
            .flat_map(|y| x_range.clone().map(move |x| Vector::new(x, y)))
            .find(|candidate| self.is_walkable(*candidate))
            .ok_or(no_cell)
    }

    /// Removes every entity flagged for destruction, in id order.
    pub fn remove_destroyed(&mut self) -> Vec<Entity> {
        let ids = self.ids_where(|e| e.should_destroy);
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    pub fn clear_projectiles(&mut self) -> Vec<Entity> {
        let ids = self.projectile_ids();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Checks that both grids agree with the entity map.
    ///
    /// Every id stored in a grid must belong to a live entity standing on
    /// that cell, collision ids must be solid, every solid entity must be
    /// registered in the collision grid, and every cell holding an entity
    /// must show one of the entities standing there. The per-cell occupant
    /// counts must match the entity map.
    pub fn grids_consistent(&self) -> bool {
        for y in 0..self.height {
            for x in 0..self.width {
                let position = Vector::new(x, y);
                if let Some(id) = self.render_at(position) {
                    match self.entities.get(&id) {
                        Some(entity) if entity.position == position => {}
                        _ => return false,
                    }
                }
                if let Some(id) = self.solid_at(position) {
                    match self.entities.get(&id) {
                        Some(entity) if entity.position == position && entity.is_solid => {}
                        _ => return false,
                    }
                }
            }
        }

        let mut occupants = vec![0u32; self.occupants.len()];
        for entity in self.entities.values() {
            match self.index(entity.position) {
                Some(index) => occupants[index] += 1,
                None => return false,
            }
        }
        if occupants != self.occupants {
            return false;
        }

        self.entities.values().all(|entity| {
            let registered = !entity.is_solid || self.solid_at(entity.position) == Some(entity.id);
            registered && self.render_at(entity.position).is_some()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_player_registers_both_grids() {
        let mut world = World::new(10, 10);
        let id = world.spawn_player("alice", Vector::new(3, 4)).unwrap();

        assert_eq!(world.solid_at(Vector::new(3, 4)), Some(id));
        assert_eq!(world.render_at(Vector::new(3, 4)), Some(id));
        assert!(!world.is_walkable(Vector::new(3, 4)));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut world = World::new(10, 10);
        let a = world.spawn_player("a", Vector::new(1, 1)).unwrap();
        let b = world.spawn_wall(Vector::new(2, 2)).unwrap();
        world.remove(b);
        let c = world.spawn_projectile(a, Vector::new(1, 1), Vector::new(1, 0), ProjectileType::Fire).unwrap();

        assert!(a < b && b < c);
    }

    #[test]
    fn test_move_clears_previous_cell() {
        let mut world = World::new(10, 10);
        let id = world.spawn_player("alice", Vector::new(3, 4)).unwrap();

        world.move_entity(id, Vector::new(4, 4)).unwrap();

        assert_eq!(world.solid_at(Vector::new(3, 4)), None);
        assert_eq!(world.render_at(Vector::new(3, 4)), None);
        assert_eq!(world.solid_at(Vector::new(4, 4)), Some(id));
        assert_eq!(world.get(id).map(Entity::position), Some(Vector::new(4, 4)));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_add_or_update_replaces_previous_registration() {
        let mut world = World::new(10, 10);
        let id = world.spawn_player("alice", Vector::new(1, 1)).unwrap();

        let mut moved = world.get(id).cloned().unwrap();
        moved.position = Vector::new(5, 5);
        world.add_or_update(id, moved).unwrap();

        assert_eq!(world.render_at(Vector::new(1, 1)), None);
        assert_eq!(world.solid_at(Vector::new(5, 5)), Some(id));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_solid_cannot_overlap_solid() {
        let mut world = World::new(10, 10);
        let a = world.spawn_player("a", Vector::new(1, 1)).unwrap();
        world.spawn_player("b", Vector::new(2, 1)).unwrap();

        assert_eq!(world.move_entity(a, Vector::new(2, 1)), Err(WorldError::Occupied(Vector::new(2, 1))));
        assert_eq!(world.spawn_wall(Vector::new(1, 1)), Err(WorldError::Occupied(Vector::new(1, 1))));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_projectile_over_owner_restores_owner_render() {
        let mut world = World::new(10, 10);
        let owner = world.spawn_player("owner", Vector::new(2, 2)).unwrap();
        let projectile = world
            .spawn_projectile(owner, Vector::new(2, 2), Vector::new(1, 0), ProjectileType::Physical)
            .unwrap();

        assert_eq!(world.render_at(Vector::new(2, 2)), Some(projectile));
        assert_eq!(world.solid_at(Vector::new(2, 2)), Some(owner));

        world.move_entity(projectile, Vector::new(3, 2)).unwrap();
        assert_eq!(world.render_at(Vector::new(2, 2)), Some(owner));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_leaving_projectile_uncovers_projectile_below() {
        let mut world = World::new(10, 5);
        let below = world
            .spawn_projectile(99, Vector::new(2, 1), Vector::new(1, 0), ProjectileType::Ice)
            .unwrap();
        let passing = world
            .spawn_projectile(99, Vector::new(1, 1), Vector::new(1, 0), ProjectileType::Physical)
            .unwrap();

        world.move_entity(passing, Vector::new(2, 1)).unwrap();
        assert_eq!(world.render_at(Vector::new(2, 1)), Some(passing));

        world.move_entity(passing, Vector::new(3, 1)).unwrap();
        assert_eq!(world.render_at(Vector::new(2, 1)), Some(below));
        assert_eq!(world.entity_at(Vector::new(2, 1)).map(|e| e.id), Some(below));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_removed_projectile_uncovers_spectator() {
        let mut world = World::new(10, 5);
        let ghost = world.spawn_player("ghost", Vector::new(2, 2)).unwrap();
        world.set_solid(ghost, false).unwrap();
        let projectile = world
            .spawn_projectile(99, Vector::new(2, 2), Vector::new(0, 1), ProjectileType::Fire)
            .unwrap();
        assert_eq!(world.render_at(Vector::new(2, 2)), Some(projectile));

        world.remove(projectile);
        assert_eq!(world.render_at(Vector::new(2, 2)), Some(ghost));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_remove_is_noop_for_unknown_id() {
        let mut world = World::new(5, 5);
        assert!(world.remove(42).is_none());
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_set_solid_toggles_collision() {
        let mut world = World::new(5, 5);
        let id = world.spawn_player("ghost", Vector::new(1, 1)).unwrap();

        world.set_solid(id, false).unwrap();
        assert_eq!(world.solid_at(Vector::new(1, 1)), None);
        assert_eq!(world.render_at(Vector::new(1, 1)), Some(id));

        world.set_solid(id, true).unwrap();
        assert_eq!(world.solid_at(Vector::new(1, 1)), Some(id));
        assert!(world.grids_consistent());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = World::generate(30, 20, 50, 7);
        let b = World::generate(30, 20, 50, 7);

        let walls = |world: &World| {
            let mut cells: Vec<(i32, i32)> = world
                .entities()
                .filter(|e| e.is_wall())
                .map(|e| (e.position().x, e.position().y))
                .collect();
            cells.sort_unstable();
            cells
        };
        assert_eq!(walls(&a), walls(&b));
        assert!(!walls(&a).is_empty());
        assert!(a.grids_consistent());
    }

    #[test]
    fn test_random_empty_location_skips_walls() {
        let world = World::generate(12, 12, 60, 3);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let position = world.random_empty_location(&mut rng).unwrap();
            assert!(world.is_walkable(position));
            assert!(position.x >= 1 && position.x <= 10);
        }
    }

    #[test]
    fn test_random_empty_location_reports_full_map() {
        let mut world = World::new(3, 3);
        world.spawn_wall(Vector::new(1, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            world.random_empty_location(&mut rng),
            Err(WorldError::NoEmptyCell { width: 3, height: 3 })
        );
    }

    #[test]
    fn test_remove_destroyed_returns_flagged_entities() {
        let mut world = World::new(5, 5);
        let a = world.spawn_player("a", Vector::new(1, 1)).unwrap();
        let b = world.spawn_player("b", Vector::new(2, 2)).unwrap();
        if let Some(entity) = world.get_mut(b) {
            entity.should_destroy = true;
        }

        let removed = world.remove_destroyed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, b);
        assert!(world.contains(a));
        assert_eq!(world.render_at(Vector::new(2, 2)), None);
        assert!(world.grids_consistent());
    }
}
