//! Dead-reckoning positions and circle overlap tests.

use crate::entity::{Entity, EntityKind};
use snowfight_shared::vec2::{self, Vec2};

/// Result of a snowball hitting a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub damage: i32,
    pub new_health: i32,
    /// The hit brought the player to zero health
    pub killed: bool,
}

/// Position of `entity` at `now_ms`.
///
/// Snowballs move with constant velocity (units per second) from where they
/// were last reported. Players report their position on every movement
/// message and are not extrapolated.
pub fn extrapolated_position(entity: &Entity, now_ms: i64) -> Vec2 {
    match entity.kind {
        EntityKind::Player(_) => entity.position(),
        EntityKind::Projectile(_) => {
            let elapsed_secs = now_ms.saturating_sub(entity.last_update_ms) as f64 / 1000.0;
            vec2::add(entity.position(), vec2::scale(entity.velocity, elapsed_secs))
        }
    }
}

/// Circle overlap at `now_ms`. Dead entities never overlap anything.
pub fn overlaps(a: &Entity, b: &Entity, now_ms: i64) -> bool {
    if !a.is_alive() || !b.is_alive() {
        return false;
    }
    let distance_sq = vec2::distance_sq(
        extrapolated_position(a, now_ms),
        extrapolated_position(b, now_ms),
    );
    let reach = a.size + b.size;
    distance_sq < reach * reach
}

/// Resolve a possible hit of `projectile` on `player`.
///
/// A hit needs a live snowball, a live player that did not throw it, and an
/// overlap. The snowball is spent by the hit, so evaluating the same pair
/// again yields `None`.
pub fn try_hit(projectile: &mut Entity, player: &mut Entity, now_ms: i64) -> Option<Hit> {
    let damage = projectile.damage()?;
    if !player.is_player() || projectile.is_owned_by(&player.id) {
        return None;
    }
    if !overlaps(projectile, player, now_ms) {
        return None;
    }
    projectile.kill();
    let new_health = player.take_damage(damage)?;
    Some(Hit {
        damage,
        new_health,
        killed: !player.is_alive(),
    })
}
