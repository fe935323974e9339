use crate::collision::{self, Hit};
use crate::entity::{Entity, EntityId};
use crate::grid::SpatialGrid;
use snowfight_shared::vec2::Vec2;
use std::collections::HashMap;

/// Registry of the entities of one shard.
///
/// The store owns every entity by value. The grid passed to each operation
/// is the shard's index; the store keeps the two consistent: a registered,
/// live, in-bounds entity is in the grid, anything else is not.
#[derive(Default)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entity and index it. An id that is already registered
    /// is updated in place instead (see `upsert`).
    pub fn spawn(&mut self, entity: Entity, grid: &mut SpatialGrid) {
        if self.entities.contains_key(&entity.id) {
            self.upsert(entity, grid);
            return;
        }
        let mut entity = entity;
        if entity.is_alive() {
            grid.insert(&mut entity);
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    /// Overwrite the motion, size, time fields and kind payload of a
    /// registered entity with those of `update`, re-indexing it. A dead entity
    /// stays dead and is not touched. Returns false if nothing was updated.
    pub fn upsert(&mut self, update: Entity, grid: &mut SpatialGrid) -> bool {
        let Some(existing) = self.entities.get_mut(&update.id) else {
            self.spawn(update, grid);
            return true;
        };
        if !existing.is_alive() {
            return false;
        }
        existing.set_position(update.position());
        existing.velocity = update.velocity;
        existing.size = update.size;
        existing.last_update_ms = update.last_update_ms;
        existing.life_length_ms = update.life_length_ms;
        existing.kind = update.kind;
        grid.update(existing);
        true
    }

    /// Move an entity, keeping its grid cell in step. `None` velocity keeps
    /// the current one.
    pub fn relocate(
        &mut self,
        id: &EntityId,
        position: Vec2,
        velocity: Option<Vec2>,
        now_ms: i64,
        grid: &mut SpatialGrid,
    ) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if !entity.is_alive() {
            return false;
        }
        entity.set_position(position);
        if let Some(velocity) = velocity {
            entity.velocity = velocity;
        }
        entity.last_update_ms = now_ms;
        grid.update(entity);
        true
    }

    /// Unregister an entity and drop it from the grid.
    pub fn remove(&mut self, id: &EntityId, grid: &mut SpatialGrid) -> Option<Entity> {
        let mut entity = self.entities.remove(id)?;
        grid.remove(&mut entity);
        Some(entity)
    }

    /// Mark an entity dead and drop it from the grid. It stays registered
    /// until the next sweep. Returns false if it was missing or already dead.
    pub fn kill(&mut self, id: &EntityId, grid: &mut SpatialGrid) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let was_alive = entity.kill();
        grid.remove(entity);
        was_alive
    }

    /// Let a snowball hit a player. On a hit the snowball leaves the grid at
    /// once, and so does the player if the hit was lethal.
    pub fn apply_hit(
        &mut self,
        projectile_id: &EntityId,
        player_id: &EntityId,
        now_ms: i64,
        grid: &mut SpatialGrid,
    ) -> Option<Hit> {
        if projectile_id == player_id {
            return None;
        }
        let mut projectile = self.entities.remove(projectile_id)?;
        let hit = self
            .entities
            .get_mut(player_id)
            .and_then(|player| collision::try_hit(&mut projectile, player, now_ms));
        if hit.is_some() {
            grid.remove(&mut projectile);
        }
        self.entities.insert(projectile_id.clone(), projectile);

        if let Some(Hit { killed: true, .. }) = hit {
            if let Some(player) = self.entities.get_mut(player_id) {
                grid.remove(player);
            }
        }
        hit
    }

    /// Drop every entity that is dead or has outlived its life length.
    ///
    /// Ids are collected in a read-only pass first, then removed.
    pub fn expire_sweep(&mut self, now_ms: i64, grid: &mut SpatialGrid) -> Vec<EntityId> {
        let expired: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| !e.is_alive() || e.is_expired(now_ms))
            .map(|e| e.id.clone())
            .collect();

        for id in &expired {
            self.remove(id, grid);
        }
        expired
    }

    /// Live snowballs thrown by `owner`.
    pub fn projectiles_owned_by(&self, owner: &EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.is_alive() && e.is_owned_by(owner))
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowfight_shared::vec2::vec2;

    fn setup() -> (EntityStore, SpatialGrid) {
        (EntityStore::new(), SpatialGrid::new(1000.0, 1000.0, 100.0))
    }

    fn snowball(id: &str, x: f64, y: f64, now_ms: i64, life: Option<u64>) -> Entity {
        Entity::projectile(id, Some("thrower".into()), vec2(x, y), Vec2::ZERO, 5.0, now_ms)
            .with_life_length(life)
    }

    fn in_grid(grid: &SpatialGrid, id: &EntityId) -> bool {
        grid.query_rect(vec2(0.0, 0.0), vec2(999.0, 999.0)).contains(id)
    }

    #[test]
    fn spawn_registers_and_indexes() {
        let (mut store, mut grid) = setup();
        store.spawn(Entity::player("p1", vec2(150.0, 150.0), 20.0, 0), &mut grid);
        let id = EntityId::from("p1");
        assert!(store.contains(&id));
        assert!(in_grid(&grid, &id));
    }

    #[test]
    fn spawn_with_known_id_updates_in_place() {
        let (mut store, mut grid) = setup();
        store.spawn(snowball("s1", 150.0, 150.0, 0, None), &mut grid);
        store.spawn(snowball("s1", 550.0, 150.0, 100, Some(500)), &mut grid);

        assert_eq!(store.len(), 1);
        assert_eq!(grid.len(), 1);
        let s = store.get(&"s1".into()).unwrap();
        assert_eq!(s.position(), vec2(550.0, 150.0));
        assert_eq!(s.last_update_ms, 100);
        assert_eq!(s.life_length_ms, Some(500));
        assert_eq!(grid.query_rect(vec2(500.0, 100.0), vec2(599.0, 199.0)), vec![s.id.clone()]);
    }

    #[test]
    fn upsert_does_not_revive_dead_entities() {
        let (mut store, mut grid) = setup();
        store.spawn(snowball("s1", 150.0, 150.0, 0, None), &mut grid);
        let id = EntityId::from("s1");
        assert!(store.kill(&id, &mut grid));
        assert!(!store.upsert(snowball("s1", 250.0, 150.0, 10, None), &mut grid));
        assert!(!store.get(&id).unwrap().is_alive());
        assert!(grid.is_empty());
    }

    #[test]
    fn relocate_moves_between_cells() {
        let (mut store, mut grid) = setup();
        store.spawn(Entity::player("p1", vec2(150.0, 150.0), 20.0, 0), &mut grid);
        let id = EntityId::from("p1");

        assert!(store.relocate(&id, vec2(850.0, 850.0), None, 50, &mut grid));
        assert!(grid.query_rect(vec2(100.0, 100.0), vec2(199.0, 199.0)).is_empty());
        assert_eq!(grid.query_rect(vec2(800.0, 800.0), vec2(899.0, 899.0)), vec![id.clone()]);
        assert_eq!(store.get(&id).unwrap().last_update_ms, 50);
    }

    #[test]
    fn remove_unregisters_and_unindexes() {
        let (mut store, mut grid) = setup();
        store.spawn(Entity::player("p1", vec2(150.0, 150.0), 20.0, 0), &mut grid);
        let id = EntityId::from("p1");
        assert!(store.remove(&id, &mut grid).is_some());
        assert!(!store.contains(&id));
        assert!(grid.is_empty());
        assert!(store.remove(&id, &mut grid).is_none());
    }

    #[test]
    fn kill_unindexes_but_keeps_registered() {
        let (mut store, mut grid) = setup();
        store.spawn(Entity::player("p1", vec2(150.0, 150.0), 20.0, 0), &mut grid);
        let id = EntityId::from("p1");
        assert!(store.kill(&id, &mut grid));
        assert!(store.contains(&id));
        assert!(grid.is_empty());
        assert!(!store.kill(&id, &mut grid));
    }

    #[test]
    fn ttl_expiry_boundaries() {
        let (mut store, mut grid) = setup();
        let t0 = 10_000;
        let life = 1000;
        store.spawn(snowball("s1", 150.0, 150.0, t0, Some(life)), &mut grid);
        let id = EntityId::from("s1");

        assert!(store.expire_sweep(t0 + life as i64 - 1, &mut grid).is_empty());
        assert!(store.contains(&id));
        assert!(in_grid(&grid, &id));

        assert_eq!(store.expire_sweep(t0 + life as i64 + 1, &mut grid), vec![id.clone()]);
        assert!(!store.contains(&id));
        assert!(!in_grid(&grid, &id));
    }

    #[test]
    fn sweep_removes_dead_and_keeps_players() {
        let (mut store, mut grid) = setup();
        store.spawn(Entity::player("p1", vec2(150.0, 150.0), 20.0, 0), &mut grid);
        store.spawn(Entity::player("p2", vec2(250.0, 150.0), 20.0, 0), &mut grid);
        store.spawn(snowball("s1", 350.0, 150.0, 0, None), &mut grid);
        store.kill(&"p2".into(), &mut grid);

        let mut removed = store.expire_sweep(i64::MAX / 4, &mut grid);
        removed.sort();
        assert_eq!(removed, vec![EntityId::from("p2")]);
        assert!(store.contains(&"p1".into()));
        assert!(store.contains(&"s1".into()));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn apply_hit_spends_snowball() {
        let (mut store, mut grid) = setup();
        store.spawn(
            Entity::player("p1", vec2(100.0, 100.0), 20.0, 0).with_health(10),
            &mut grid,
        );
        store.spawn(snowball("s1", 105.0, 100.0, 0, None), &mut grid);
        let p1 = EntityId::from("p1");
        let s1 = EntityId::from("s1");

        let hit = store.apply_hit(&s1, &p1, 10, &mut grid).unwrap();
        assert_eq!(hit.new_health, 5);
        assert!(!hit.killed);
        assert!(!in_grid(&grid, &s1));
        assert!(store.contains(&s1), "spent snowball waits for the sweep");

        assert_eq!(store.apply_hit(&s1, &p1, 10, &mut grid), None);
        assert_eq!(store.get(&p1).unwrap().health(), Some(5));
    }

    #[test]
    fn lethal_hit_unindexes_player() {
        let (mut store, mut grid) = setup();
        store.spawn(
            Entity::player("p1", vec2(100.0, 100.0), 20.0, 0).with_health(5),
            &mut grid,
        );
        store.spawn(snowball("s1", 100.0, 100.0, 0, None), &mut grid);
        let p1 = EntityId::from("p1");

        let hit = store.apply_hit(&"s1".into(), &p1, 0, &mut grid).unwrap();
        assert!(hit.killed);
        assert!(grid.is_empty());
        assert!(!store.get(&p1).unwrap().is_alive());
    }

    #[test]
    fn apply_hit_with_unknown_ids_is_none() {
        let (mut store, mut grid) = setup();
        store.spawn(snowball("s1", 100.0, 100.0, 0, None), &mut grid);
        assert_eq!(store.apply_hit(&"s1".into(), &"ghost".into(), 0, &mut grid), None);
        assert_eq!(store.apply_hit(&"ghost".into(), &"s1".into(), 0, &mut grid), None);
        assert!(store.get(&"s1".into()).unwrap().is_alive());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn projectiles_owned_by_filters_by_thrower() {
        let (mut store, mut grid) = setup();
        store.spawn(snowball("s1", 100.0, 100.0, 0, None), &mut grid);
        store.spawn(
            Entity::projectile("s2", Some("other".into()), vec2(1.0, 1.0), Vec2::ZERO, 1.0, 0),
            &mut grid,
        );
        assert_eq!(
            store.projectiles_owned_by(&"thrower".into()),
            vec![EntityId::from("s1")]
        );
    }
}
