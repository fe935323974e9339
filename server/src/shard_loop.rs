use crate::config::ServerConfig;
use crate::shard::{ConnectionId, Outbound, Shard};
use snowfight_shared::protocol::{ClientMsg, ServerMsg};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;

/// Commands from client connections to their shard
#[derive(Debug)]
pub enum ShardCommand {
    Connect {
        conn: ConnectionId,
        outbox: mpsc::Sender<ServerMsg>,
    },
    Message {
        conn: ConnectionId,
        msg: ClientMsg,
    },
    Disconnect {
        conn: ConnectionId,
    },
}

/// Wall clock in unix milliseconds, the time base of every entity timestamp.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Run one shard. Owns the shard state and every connection's outbox;
/// returns when all command senders are gone.
pub async fn run_shard(
    shard_id: usize,
    mut cmd_rx: mpsc::Receiver<ShardCommand>,
    config: ServerConfig,
) {
    let mut shard = Shard::new(shard_id, config.world);
    let mut outboxes: HashMap<ConnectionId, mpsc::Sender<ServerMsg>> = HashMap::new();

    let mut fast = tokio::time::interval(Duration::from_millis(config.fast_tick_ms));
    fast.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut slow = tokio::time::interval(Duration::from_millis(config.slow_tick_ms));
    slow.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(shard = shard_id, "Shard started");

    loop {
        tokio::select! {
            _ = fast.tick() => {
                let out = shard.fast_tick(now_ms());
                dispatch(&outboxes, out);
            }

            _ = slow.tick() => {
                shard.slow_tick(now_ms());
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    ShardCommand::Connect { conn, outbox } => {
                        shard.connect(conn);
                        outboxes.insert(conn, outbox);
                    }
                    ShardCommand::Message { conn, msg } => {
                        let out = shard.handle_message(conn, msg, now_ms());
                        dispatch(&outboxes, out);
                    }
                    ShardCommand::Disconnect { conn } => {
                        shard.disconnect(conn);
                        outboxes.remove(&conn);
                    }
                }
            }
        }
    }

    tracing::info!(shard = shard_id, "Shard ended");
}

/// Hand messages to their connections without ever waiting on a slow one.
fn dispatch(outboxes: &HashMap<ConnectionId, mpsc::Sender<ServerMsg>>, out: Vec<Outbound>) {
    for Outbound { conn, msg } in out {
        let Some(outbox) = outboxes.get(&conn) else {
            continue;
        };
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn, "Outbox full, dropping message");
            }
            // Disconnect command is on its way
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Assigns connections to shards and hands out their command senders.
#[derive(Clone)]
pub struct ShardRouter {
    shards: Arc<Vec<mpsc::Sender<ShardCommand>>>,
    next_conn: Arc<AtomicU64>,
}

impl ShardRouter {
    pub fn new(shards: Vec<mpsc::Sender<ShardCommand>>) -> Self {
        Self {
            shards: Arc::new(shards),
            next_conn: Arc::new(AtomicU64::new(1)),
        }
    }

    /// New connection id and the shard it belongs to for its lifetime.
    pub fn assign(&self) -> (ConnectionId, usize, mpsc::Sender<ShardCommand>) {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let index = (conn % self.shards.len() as u64) as usize;
        (conn, index, self.shards[index].clone())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

/// Spawn one task per shard and return the router in front of them.
pub fn spawn_shards(config: &ServerConfig) -> ShardRouter {
    let senders = (0..config.shard_count)
        .map(|shard_id| {
            let (tx, rx) = mpsc::channel(config.command_capacity);
            let shard_config = config.clone();
            tokio::spawn(async move {
                run_shard(shard_id, rx, shard_config).await;
            });
            tx
        })
        .collect();
    ShardRouter::new(senders)
}
