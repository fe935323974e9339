//! Interpretation of decoded client messages against a shard.

use crate::entity::{Entity, EntityId};
use crate::error::DecodeError;
use crate::shard::{ConnectionId, Outbound, SessionState, Shard};
use snowfight_shared::protocol::{
    ClientMsg, JoinMsg, MovementMsg, ObjectType, PongMsg, RespawnedMsg, ServerMsg,
    DEFAULT_HEALTH, DEFAULT_PROJECTILE_DAMAGE, DEFAULT_PROJECTILE_SIZE,
};
use snowfight_shared::vec2::Vec2;

/// Parse one text frame. Callers drop anything that fails.
pub fn decode_client_msg(text: &str, max_len: usize) -> Result<ClientMsg, DecodeError> {
    if text.len() > max_len {
        return Err(DecodeError::TooLarge {
            len: text.len(),
            max: max_len,
        });
    }
    Ok(serde_json::from_str(text)?)
}

impl Shard {
    /// Apply one inbound message from `conn`. Messages that do not fit the
    /// connection's state are dropped without side effects.
    pub fn handle_message(&mut self, conn: ConnectionId, msg: ClientMsg, now_ms: i64) -> Vec<Outbound> {
        let Some(session) = self.sessions.get(&conn) else {
            return Vec::new();
        };
        let state = session.state.clone();

        match (msg, state) {
            (ClientMsg::Ping(ping), _) => vec![Outbound {
                conn,
                msg: ServerMsg::Pong(PongMsg {
                    server_time: now_ms,
                    client_time: ping.client_time,
                }),
            }],
            (ClientMsg::Join(join), SessionState::Connecting) => {
                self.join(conn, join, now_ms);
                Vec::new()
            }
            (ClientMsg::Movement(movement), SessionState::Active { player_id }) => {
                self.movement(&player_id, movement, now_ms);
                Vec::new()
            }
            (
                ClientMsg::Respawn(_),
                SessionState::Closed {
                    player_id,
                    last_position,
                },
            ) => self.respawn(conn, player_id, last_position, now_ms),
            (msg, state) => {
                tracing::debug!(shard = self.id, conn, ?msg, ?state, "Dropped out-of-state message");
                Vec::new()
            }
        }
    }

    fn join(&mut self, conn: ConnectionId, join: JoinMsg, now_ms: i64) {
        let player_id = EntityId::new(join.id);
        if self.is_id_taken(&player_id) {
            tracing::debug!(shard = self.id, conn, player = %player_id, "Join with taken id dropped");
            return;
        }
        let health = join.health.unwrap_or(DEFAULT_HEALTH);
        if health <= 0 {
            tracing::debug!(shard = self.id, conn, player = %player_id, health, "Join without health dropped");
            return;
        }
        let player = Entity::player(
            player_id.clone(),
            join.position.unwrap_or(Vec2::ZERO),
            self.config.player_size,
            now_ms,
        )
        .with_health(health);
        self.store.spawn(player, &mut self.grid);

        if let Some(session) = self.sessions.get_mut(&conn) {
            session.state = SessionState::Active {
                player_id: player_id.clone(),
            };
        }
        tracing::info!(shard = self.id, conn, player = %player_id, "Player joined");
    }

    fn movement(&mut self, player_id: &EntityId, movement: MovementMsg, now_ms: i64) {
        match movement.object_type {
            Some(ObjectType::Player) => self.move_player(player_id, movement, now_ms),
            Some(ObjectType::Snowball) => self.move_snowball(player_id, movement, now_ms),
            None => {}
        }
    }

    fn move_player(&mut self, player_id: &EntityId, movement: MovementMsg, now_ms: i64) {
        let Some(player) = self.store.get(player_id) else {
            return;
        };
        let position = movement.position.unwrap_or(player.position());
        self.store
            .relocate(player_id, position, movement.velocity, now_ms, &mut self.grid);
    }

    /// Declare a new snowball or update one of the sender's own snowballs.
    fn move_snowball(&mut self, owner: &EntityId, movement: MovementMsg, now_ms: i64) {
        let Some(id) = movement.id.map(EntityId::new) else {
            return;
        };
        if let Some(existing) = self.store.get(&id) {
            if !existing.is_projectile() || !existing.is_owned_by(owner) || !existing.is_alive() {
                tracing::debug!(shard = self.id, snowball = %id, "Foreign or spent snowball update dropped");
                return;
            }
        }

        let emitted_at = match movement.time_emission {
            Some(t) if t != 0 => t,
            _ => now_ms,
        };
        let snowball = Entity::projectile(
            id,
            Some(owner.clone()),
            movement.position.unwrap_or(Vec2::ZERO),
            movement.velocity.unwrap_or(Vec2::ZERO),
            movement.size.unwrap_or(DEFAULT_PROJECTILE_SIZE),
            emitted_at,
        )
        .with_damage(movement.damage.unwrap_or(DEFAULT_PROJECTILE_DAMAGE).max(0))
        .with_life_length(movement.life_length)
        .with_charging(movement.charging.unwrap_or(false));
        self.store.spawn(snowball, &mut self.grid);
    }

    fn respawn(
        &mut self,
        conn: ConnectionId,
        player_id: EntityId,
        position: Vec2,
        now_ms: i64,
    ) -> Vec<Outbound> {
        // The corpse may still be waiting for the sweep
        self.store.remove(&player_id, &mut self.grid);
        let player = Entity::player(player_id.clone(), position, self.config.player_size, now_ms);
        self.store.spawn(player, &mut self.grid);

        if let Some(session) = self.sessions.get_mut(&conn) {
            session.state = SessionState::Active {
                player_id: player_id.clone(),
            };
        }
        tracing::info!(shard = self.id, conn, player = %player_id, "Player respawned");

        vec![Outbound {
            conn,
            msg: ServerMsg::Respawn(RespawnedMsg {
                player_id: player_id.to_string(),
                position,
            }),
        }]
    }
}
