//! Integration tests for the snowfight server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use snowfight_server::config::ServerConfig;
use snowfight_server::shard_loop::spawn_shards;
use snowfight_server::ws::{ws_handler, AppState};
use snowfight_shared::protocol::{
    ClientMsg, JoinMsg, MovementMsg, ObjectType, PingMsg, RespawnMsg, ServerMsg,
};
use snowfight_shared::vec2::{vec2, Vec2};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(2);

/// Single shard so every client shares one world.
fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        shard_count: 1,
        max_connections: 100,
        ..Default::default()
    }
}

/// Start a test server on a random available port and return the WebSocket URL.
async fn start_test_server(config: ServerConfig) -> String {
    let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app_state = AppState {
        router: spawn_shards(&config),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
        max_message_size: config.max_message_size,
        outbox_capacity: config.outbox_capacity,
    };
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Skip messages until one matches, or give up after `timeout`.
async fn recv_until<F>(ws: &mut Ws, timeout: Duration, mut pred: F) -> Option<ServerMsg>
where
    F: FnMut(&ServerMsg) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            let msg = recv_msg(ws).await;
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .ok()
}

/// Round trip a ping so everything sent before it has been applied.
async fn sync(ws: &mut Ws, client_time: i64) {
    send(ws, &ClientMsg::Ping(PingMsg { client_time })).await;
    let pong = recv_until(ws, WAIT, |m| {
        matches!(m, ServerMsg::Pong(p) if p.client_time == client_time)
    })
    .await;
    assert!(pong.is_some(), "No pong for {}", client_time);
}

async fn join(ws: &mut Ws, id: &str, position: Vec2, health: Option<i32>) {
    send(
        ws,
        &ClientMsg::Join(JoinMsg {
            id: id.to_string(),
            position: Some(position),
            health,
        }),
    )
    .await;
    sync(ws, 1).await;
}

fn throw_at(id: &str, position: Vec2) -> ClientMsg {
    ClientMsg::Movement(MovementMsg {
        object_type: Some(ObjectType::Snowball),
        id: Some(id.to_string()),
        position: Some(position),
        velocity: Some(Vec2::ZERO),
        ..Default::default()
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_ping_gets_pong() {
    let url = start_test_server(test_config()).await;
    let mut ws = connect(&url).await;

    send(&mut ws, &ClientMsg::Ping(PingMsg { client_time: 42 })).await;
    match recv_msg(&mut ws).await {
        ServerMsg::Pong(pong) => {
            assert_eq!(pong.client_time, 42);
            assert!(pong.server_time > 0);
        }
        other => panic!("Expected Pong, got {:?}", other),
    }
}

#[tokio::test]
async fn test_nearby_players_see_each_other() {
    let url = start_test_server(test_config()).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    join(&mut alice, "alice", vec2(1000.0, 1000.0), None).await;
    join(&mut bob, "bob", vec2(1100.0, 1000.0), None).await;

    let seen = recv_until(&mut alice, WAIT, |m| {
        matches!(m, ServerMsg::Movement(e) if e.id == "bob")
    })
    .await;
    match seen {
        Some(ServerMsg::Movement(e)) => {
            assert_eq!(e.object_type, ObjectType::Player);
            assert_eq!(e.position, vec2(1100.0, 1000.0));
            assert_eq!(e.new_health, Some(100));
        }
        other => panic!("Expected bob's movement, got {:?}", other),
    }

    let seen = recv_until(&mut bob, WAIT, |m| {
        matches!(m, ServerMsg::Movement(e) if e.id == "alice")
    })
    .await;
    assert!(seen.is_some(), "Bob should see alice");
}

#[tokio::test]
async fn test_distant_players_are_not_reported() {
    let url = start_test_server(test_config()).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    join(&mut alice, "alice", vec2(100.0, 100.0), None).await;
    join(&mut bob, "bob", vec2(3900.0, 3900.0), None).await;

    let seen = recv_until(&mut alice, Duration::from_millis(300), |m| {
        matches!(m, ServerMsg::Movement(_))
    })
    .await;
    assert!(seen.is_none(), "Bob is out of view, got {:?}", seen);
}

#[tokio::test]
async fn test_snowball_hits_other_player() {
    let url = start_test_server(test_config()).await;
    let mut thrower = connect(&url).await;
    let mut target = connect(&url).await;

    join(&mut target, "target", vec2(2000.0, 2000.0), None).await;
    join(&mut thrower, "thrower", vec2(1900.0, 2000.0), None).await;

    send(&mut thrower, &throw_at("s1", vec2(2000.0, 2000.0))).await;

    let hit = recv_until(&mut target, WAIT, |m| matches!(m, ServerMsg::Hit(_))).await;
    match hit {
        Some(ServerMsg::Hit(hit)) => {
            assert_eq!(hit.projectile.id, "s1");
            assert_eq!(hit.projectile.object_type, ObjectType::Snowball);
            assert_eq!(hit.target_id, "target");
            assert_eq!(hit.new_health, 95);
        }
        other => panic!("Expected Hit, got {:?}", other),
    }

    // Spent: the same snowball never hits twice
    let again = recv_until(&mut target, Duration::from_millis(300), |m| {
        matches!(m, ServerMsg::Hit(_))
    })
    .await;
    assert!(again.is_none(), "Snowball hit twice: {:?}", again);
}

#[tokio::test]
async fn test_lethal_hit_then_respawn() {
    let url = start_test_server(test_config()).await;
    let mut thrower = connect(&url).await;
    let mut target = connect(&url).await;

    join(&mut target, "target", vec2(2000.0, 2000.0), Some(5)).await;
    join(&mut thrower, "thrower", vec2(1900.0, 2000.0), None).await;

    send(&mut thrower, &throw_at("s1", vec2(2000.0, 2000.0))).await;

    let death = recv_until(&mut target, WAIT, |m| matches!(m, ServerMsg::Death(_))).await;
    match death {
        Some(ServerMsg::Death(d)) => assert_eq!(d.player_id, "target"),
        other => panic!("Expected Death, got {:?}", other),
    }
    let death = recv_until(&mut thrower, WAIT, |m| matches!(m, ServerMsg::Death(_))).await;
    assert!(death.is_some(), "Death is announced to everyone");

    send(&mut target, &ClientMsg::Respawn(RespawnMsg::default())).await;
    let respawned = recv_until(&mut target, WAIT, |m| matches!(m, ServerMsg::Respawn(_))).await;
    match respawned {
        Some(ServerMsg::Respawn(r)) => {
            assert_eq!(r.player_id, "target");
            assert_eq!(r.position, vec2(2000.0, 2000.0));
        }
        other => panic!("Expected Respawn, got {:?}", other),
    }

    let seen = recv_until(&mut thrower, WAIT, |m| {
        matches!(m, ServerMsg::Movement(e) if e.id == "target" && e.new_health == Some(100))
    })
    .await;
    assert!(seen.is_some(), "Respawned player is back at full health");
}

#[tokio::test]
async fn test_malformed_messages_do_not_disconnect() {
    let url = start_test_server(test_config()).await;
    let mut ws = connect(&url).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"type":"teleport"}"#.into()))
        .await
        .unwrap();
    ws.send(Message::Text(r#"{"type":"join"}"#.into()))
        .await
        .unwrap();
    ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();

    sync(&mut ws, 7).await;
}

#[tokio::test]
async fn test_movement_before_join_is_ignored() {
    let url = start_test_server(test_config()).await;
    let mut observer = connect(&url).await;
    let mut early = connect(&url).await;

    join(&mut observer, "observer", vec2(500.0, 500.0), None).await;
    send(&mut early, &throw_at("ghost", vec2(510.0, 500.0))).await;
    sync(&mut early, 3).await;

    let seen = recv_until(&mut observer, Duration::from_millis(300), |m| {
        matches!(m, ServerMsg::Movement(_) | ServerMsg::Hit(_))
    })
    .await;
    assert!(seen.is_none(), "Unjoined connection spawned {:?}", seen);
}

#[tokio::test]
async fn test_disconnect_removes_player() {
    let url = start_test_server(test_config()).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    join(&mut alice, "alice", vec2(1000.0, 1000.0), None).await;
    join(&mut bob, "bob", vec2(1050.0, 1000.0), None).await;

    let seen = recv_until(&mut alice, WAIT, |m| {
        matches!(m, ServerMsg::Movement(e) if e.id == "bob")
    })
    .await;
    assert!(seen.is_some());

    bob.close(None).await.unwrap();
    drop(bob);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Drain whatever was queued before the disconnect landed
    while recv_until(&mut alice, Duration::from_millis(50), |_| true)
        .await
        .is_some()
    {}

    let seen = recv_until(&mut alice, Duration::from_millis(300), |m| {
        matches!(m, ServerMsg::Movement(e) if e.id == "bob")
    })
    .await;
    assert!(seen.is_none(), "Bob should be gone");
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let config = ServerConfig {
        max_connections: 1,
        ..test_config()
    };
    let url = start_test_server(config).await;

    let mut first = connect(&url).await;
    sync(&mut first, 1).await;

    assert!(
        connect_async(&url).await.is_err(),
        "Second client should be rejected"
    );
}
