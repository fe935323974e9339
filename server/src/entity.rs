use snowfight_shared::protocol::{EntityWire, ObjectType, DEFAULT_HEALTH};
use snowfight_shared::vec2::Vec2;
use std::borrow::Borrow;
use std::fmt;

/// Identifier of an entity, unique within its shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Bucket coordinates in the spatial grid. `row` follows y, `col` follows x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub health: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileState {
    /// Player that threw the snowball; it can never hit this player
    pub owner: Option<EntityId>,
    pub damage: i32,
    pub charging: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player(PlayerState),
    Projectile(ProjectileState),
}

/// A player or a snowball.
///
/// Position and the recorded grid cell are private: they may only change
/// together, through `EntityStore`, so the cell always matches the position
/// of the last successful grid insert/update.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    position: Vec2,
    pub velocity: Vec2,
    pub size: f64,
    /// Unix ms at which position/velocity were last set
    pub last_update_ms: i64,
    /// `None` never expires
    pub life_length_ms: Option<u64>,
    alive: bool,
    cell: Option<CellCoord>,
}

impl Entity {
    pub fn player(id: impl Into<EntityId>, position: Vec2, size: f64, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            kind: EntityKind::Player(PlayerState {
                health: DEFAULT_HEALTH,
            }),
            position,
            velocity: Vec2::ZERO,
            size,
            last_update_ms: now_ms,
            life_length_ms: None,
            alive: true,
            cell: None,
        }
    }

    pub fn projectile(
        id: impl Into<EntityId>,
        owner: Option<EntityId>,
        position: Vec2,
        velocity: Vec2,
        size: f64,
        now_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: EntityKind::Projectile(ProjectileState {
                owner,
                damage: snowfight_shared::protocol::DEFAULT_PROJECTILE_DAMAGE,
                charging: false,
            }),
            position,
            velocity,
            size,
            last_update_ms: now_ms,
            life_length_ms: None,
            alive: true,
            cell: None,
        }
    }

    pub fn with_health(mut self, health: i32) -> Self {
        if let EntityKind::Player(p) = &mut self.kind {
            p.health = health;
        }
        self
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        if let EntityKind::Projectile(p) = &mut self.kind {
            p.damage = damage;
        }
        self
    }

    pub fn with_life_length(mut self, life_length_ms: Option<u64>) -> Self {
        self.life_length_ms = life_length_ms;
        self
    }

    pub fn with_charging(mut self, charging: bool) -> Self {
        if let EntityKind::Projectile(p) = &mut self.kind {
            p.charging = charging;
        }
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn cell(&self) -> Option<CellCoord> {
        self.cell
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, EntityKind::Projectile(_))
    }

    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            EntityKind::Player(_) => ObjectType::Player,
            EntityKind::Projectile(_) => ObjectType::Snowball,
        }
    }

    pub fn health(&self) -> Option<i32> {
        match &self.kind {
            EntityKind::Player(p) => Some(p.health),
            EntityKind::Projectile(_) => None,
        }
    }

    pub fn damage(&self) -> Option<i32> {
        match &self.kind {
            EntityKind::Projectile(p) => Some(p.damage),
            EntityKind::Player(_) => None,
        }
    }

    pub fn owner(&self) -> Option<&EntityId> {
        match &self.kind {
            EntityKind::Projectile(p) => p.owner.as_ref(),
            EntityKind::Player(_) => None,
        }
    }

    /// True for a snowball thrown by `player`.
    pub fn is_owned_by(&self, player: &EntityId) -> bool {
        self.owner() == Some(player)
    }

    /// Mark the entity dead. Returns false if it already was.
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    /// Subtract damage from a player's health, clamped at zero. A player
    /// reaching zero dies. Returns the new health, or `None` for snowballs.
    pub fn take_damage(&mut self, damage: i32) -> Option<i32> {
        let EntityKind::Player(p) = &mut self.kind else {
            return None;
        };
        p.health = p.health.saturating_sub(damage.max(0)).max(0);
        let health = p.health;
        if health == 0 {
            self.kill();
        }
        Some(health)
    }

    /// Life length in the signed ms domain of timestamps. Lengths past
    /// `i64::MAX` saturate.
    fn life_length_i64(&self) -> Option<i64> {
        self.life_length_ms
            .map(|life| i64::try_from(life).unwrap_or(i64::MAX))
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.life_length_i64() {
            Some(life) => now_ms.saturating_sub(self.last_update_ms) > life,
            None => false,
        }
    }

    /// Unix ms at which the entity expires, if it ever does.
    pub fn death_date(&self) -> Option<i64> {
        self.life_length_i64()
            .map(|life| self.last_update_ms.saturating_add(life))
    }

    /// Wire snapshot with the position extrapolated to `now_ms`.
    pub fn to_wire(&self, now_ms: i64) -> EntityWire {
        let position = crate::collision::extrapolated_position(self, now_ms);
        let (new_health, charging, death_date) = match &self.kind {
            EntityKind::Player(p) => (Some(p.health), None, None),
            EntityKind::Projectile(p) => (None, Some(p.charging), self.death_date()),
        };
        EntityWire {
            id: self.id.to_string(),
            object_type: self.object_type(),
            position,
            velocity: self.velocity,
            size: self.size,
            new_health,
            charging,
            death_date,
        }
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_cell(&mut self, cell: Option<CellCoord>) {
        self.cell = cell;
    }
}
