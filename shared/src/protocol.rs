use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::vec2::Vec2;

/// Health of a freshly joined or respawned player when the join omits it.
pub const DEFAULT_HEALTH: i32 = 100;
/// Collision radius of a snowball whose movement message omits `size`.
pub const DEFAULT_PROJECTILE_SIZE: f64 = 1.0;
/// Damage of a snowball whose movement message omits `damage`.
pub const DEFAULT_PROJECTILE_DAMAGE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Player,
    Snowball,
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "movement")]
    Movement(EntityWire),
    #[serde(rename = "hit")]
    Hit(HitMsg),
    #[serde(rename = "pong")]
    Pong(PongMsg),
    #[serde(rename = "death")]
    Death(DeathMsg),
    #[serde(rename = "respawn")]
    Respawn(RespawnedMsg),
}

/// Snapshot of one entity as seen by a client at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityWire {
    pub id: String,
    pub object_type: ObjectType,
    /// Extrapolated to the moment the message was produced
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f64,
    /// Players only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub new_health: Option<i32>,
    /// Snowballs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub charging: Option<bool>,
    /// Snowballs with a finite life only (unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub death_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct HitMsg {
    /// The snowball that scored the hit
    #[serde(flatten)]
    pub projectile: EntityWire,
    pub target_id: String,
    pub new_health: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PongMsg {
    #[ts(type = "number")]
    pub server_time: i64,
    #[ts(type = "number")]
    pub client_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct DeathMsg {
    pub player_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct RespawnedMsg {
    pub player_id: String,
    pub position: Vec2,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "join")]
    Join(JoinMsg),
    #[serde(rename = "movement")]
    Movement(MovementMsg),
    #[serde(rename = "ping")]
    Ping(PingMsg),
    #[serde(rename = "respawn")]
    Respawn(RespawnMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
pub struct JoinMsg {
    pub id: String,
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub health: Option<i32>,
}

/// Movement report for the sender's player or for one of its snowballs.
/// Absent fields keep their current value (player) or take the documented
/// default (new snowball).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MovementMsg {
    pub object_type: Option<ObjectType>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub velocity: Option<Vec2>,
    #[serde(default)]
    pub size: Option<f64>,
    /// Unix ms at which position/velocity were sampled; 0 or absent means now
    #[serde(default)]
    #[ts(type = "number | null")]
    pub time_emission: Option<i64>,
    /// Milliseconds; absent means the snowball never expires on its own
    #[serde(default)]
    #[ts(type = "number | null")]
    pub life_length: Option<u64>,
    #[serde(default)]
    pub damage: Option<i32>,
    #[serde(default)]
    pub charging: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PingMsg {
    #[ts(type = "number")]
    pub client_time: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/js/generated/")]
pub struct RespawnMsg {
    #[serde(default)]
    pub id: Option<String>,
}
