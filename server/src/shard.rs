use crate::entity::{Entity, EntityId};
use crate::grid::SpatialGrid;
use crate::store::EntityStore;
use snowfight_shared::config::WorldConfig;
use snowfight_shared::protocol::{DeathMsg, HitMsg, ServerMsg};
use snowfight_shared::vec2::{self, Vec2};
use std::collections::HashMap;

/// Transport connection handle, unique across all shards.
pub type ConnectionId = u64;

/// Lifecycle of one connection's player.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Transport is open, no join yet
    Connecting,
    /// Joined; the player is registered and indexed
    Active { player_id: EntityId },
    /// The player died; the transport may still be open
    Closed {
        player_id: EntityId,
        last_position: Vec2,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub state: SessionState,
}

impl Session {
    pub fn player_id(&self) -> Option<&EntityId> {
        match &self.state {
            SessionState::Active { player_id } => Some(player_id),
            _ => None,
        }
    }

    /// The player id this connection holds, alive or dead.
    pub fn claimed_id(&self) -> Option<&EntityId> {
        match &self.state {
            SessionState::Connecting => None,
            SessionState::Active { player_id } | SessionState::Closed { player_id, .. } => {
                Some(player_id)
            }
        }
    }
}

/// A message addressed to one connection.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub conn: ConnectionId,
    pub msg: ServerMsg,
}

/// One isolated simulation unit: its own grid, entities and connections.
///
/// A shard is owned by a single task and is never shared; every handler and
/// tick takes `&mut self` and runs to completion.
pub struct Shard {
    pub id: usize,
    pub config: WorldConfig,
    pub grid: SpatialGrid,
    pub store: EntityStore,
    pub sessions: HashMap<ConnectionId, Session>,
}

impl Shard {
    pub fn new(id: usize, config: WorldConfig) -> Self {
        Self {
            id,
            grid: SpatialGrid::from_config(&config),
            config,
            store: EntityStore::new(),
            sessions: HashMap::new(),
        }
    }

    /// Register a freshly accepted connection.
    pub fn connect(&mut self, conn: ConnectionId) {
        self.sessions.insert(
            conn,
            Session {
                state: SessionState::Connecting,
            },
        );
    }

    /// Forget a connection and remove its player. Snowballs it threw without
    /// a finite life are killed so the next sweep collects them.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<EntityId> {
        let session = self.sessions.remove(&conn)?;
        let player_id = match session.state {
            SessionState::Connecting => return None,
            SessionState::Active { player_id } => player_id,
            SessionState::Closed { player_id, .. } => player_id,
        };
        self.store.remove(&player_id, &mut self.grid);

        for id in self.store.projectiles_owned_by(&player_id) {
            let immortal = self
                .store
                .get(&id)
                .is_some_and(|e| e.life_length_ms.is_none());
            if immortal {
                self.store.kill(&id, &mut self.grid);
            }
        }
        tracing::info!(shard = self.id, conn, player = %player_id, "Player left");
        Some(player_id)
    }

    pub fn session(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    /// A player id stays taken while an entity or a session holds it, so a
    /// dead player's id is not handed out before that connection is gone.
    pub fn is_id_taken(&self, id: &EntityId) -> bool {
        self.store.contains(id) || self.sessions.values().any(|s| s.claimed_id() == Some(id))
    }

    /// Sessions with a live player, as (connection, player) pairs.
    fn active_players(&self) -> Vec<(ConnectionId, EntityId)> {
        self.sessions
            .iter()
            .filter_map(|(conn, s)| s.player_id().map(|p| (*conn, p.clone())))
            .collect()
    }

    /// View sync and collision pass.
    ///
    /// For each active player, every entity in the grid cells under its view
    /// rectangle is either a snowball hitting the player (`hit`) or reported
    /// as-is (`movement`).
    pub fn fast_tick(&mut self, now_ms: i64) -> Vec<Outbound> {
        let mut out = Vec::new();

        for (conn, player_id) in self.active_players() {
            let Some(player) = self.store.get(&player_id) else {
                continue;
            };
            if !player.is_alive() {
                continue;
            }
            let center = player.position();
            let half = Vec2::new(self.config.view_half_width, self.config.view_half_height);
            let nearby = self
                .grid
                .query_rect(vec2::sub(center, half), vec2::add(center, half));

            for other_id in nearby {
                if other_id == player_id {
                    continue;
                }
                let Some(other) = self.store.get(&other_id) else {
                    continue;
                };
                if !other.is_alive() {
                    continue;
                }
                let wire = other.to_wire(now_ms);

                let hit = if other.is_projectile() && !other.is_owned_by(&player_id) {
                    self.store
                        .apply_hit(&other_id, &player_id, now_ms, &mut self.grid)
                } else {
                    None
                };

                match hit {
                    Some(hit) => {
                        out.push(Outbound {
                            conn,
                            msg: ServerMsg::Hit(HitMsg {
                                projectile: wire,
                                target_id: player_id.to_string(),
                                new_health: hit.new_health,
                            }),
                        });
                        if hit.killed {
                            self.on_player_death(conn, &player_id, &mut out);
                            break;
                        }
                    }
                    None => out.push(Outbound {
                        conn,
                        msg: ServerMsg::Movement(wire),
                    }),
                }
            }
        }
        out
    }

    fn on_player_death(&mut self, conn: ConnectionId, player_id: &EntityId, out: &mut Vec<Outbound>) {
        let last_position = self
            .store
            .get(player_id)
            .map(Entity::position)
            .unwrap_or_default();
        if let Some(session) = self.sessions.get_mut(&conn) {
            session.state = SessionState::Closed {
                player_id: player_id.clone(),
                last_position,
            };
        }
        tracing::info!(shard = self.id, conn, player = %player_id, "Player died");

        let death = DeathMsg {
            player_id: player_id.to_string(),
        };
        for other in self.sessions.keys() {
            out.push(Outbound {
                conn: *other,
                msg: ServerMsg::Death(death.clone()),
            });
        }
    }

    /// Expiry pass: drops dead and timed-out entities.
    pub fn slow_tick(&mut self, now_ms: i64) -> Vec<EntityId> {
        let removed = self.store.expire_sweep(now_ms, &mut self.grid);
        if !removed.is_empty() {
            tracing::debug!(shard = self.id, count = removed.len(), "Swept expired entities");
        }
        removed
    }
}
