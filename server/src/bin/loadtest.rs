//! Load test for the snowfight server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Join with a unique player id at a random spot
//! - Wander around and throw snowballs
//! - Ping periodically and measure round trip time
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --throw-rate R   Snowballs per second per client (default: 1.0)
//!   --url URL        Server URL (default: ws://127.0.0.1:12345/ws)

use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use snowfight_shared::config::WorldConfig;
use snowfight_shared::protocol::{
    ClientMsg, JoinMsg, MovementMsg, ObjectType, PingMsg, RespawnMsg, ServerMsg,
};
use snowfight_shared::vec2::{vec2, Vec2};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const MOVE_INTERVAL: Duration = Duration::from_millis(100);
const PING_INTERVAL: Duration = Duration::from_secs(1);
const WALK_SPEED: f64 = 150.0;
const SNOWBALL_SPEED: f64 = 400.0;
const SNOWBALL_LIFE_MS: u64 = 2000;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    movements_received: AtomicU64,
    hits_received: AtomicU64,
    deaths_received: AtomicU64,
    snowballs_thrown: AtomicU64,
    errors: AtomicU64,
    rtt_sum_ms: AtomicU64,
    rtt_count: AtomicU64,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn encode(msg: &ClientMsg) -> Message {
    Message::Text(serde_json::to_string(msg).unwrap_or_default().into())
}

fn random_direction(rng: &mut ChaCha8Rng) -> Vec2 {
    let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    vec2(angle.cos(), angle.sin())
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    throw_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let world = WorldConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64);
    let player_id = format!("load-{}", client_id);
    let mut position = vec2(
        rng.gen_range(0.0..world.width),
        rng.gen_range(0.0..world.height),
    );
    let mut heading = random_direction(&mut rng);
    let mut snowball_seq: u64 = 0;

    let join = ClientMsg::Join(JoinMsg {
        id: player_id.clone(),
        position: Some(position),
        health: None,
    });
    if ws.send(encode(&join)).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let throw_interval = if throw_rate > 0.0 {
        Duration::from_secs_f64(1.0 / throw_rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut move_timer = tokio::time::interval(MOVE_INTERVAL);
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut throw_timer = tokio::time::interval(throw_interval);
    throw_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
    ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        let outgoing = tokio::select! {
            _ = move_timer.tick() => {
                if rng.gen_bool(0.05) {
                    heading = random_direction(&mut rng);
                }
                let step = WALK_SPEED * MOVE_INTERVAL.as_secs_f64();
                position.x = (position.x + heading.x * step).clamp(0.0, world.width - 1.0);
                position.y = (position.y + heading.y * step).clamp(0.0, world.height - 1.0);
                Some(ClientMsg::Movement(MovementMsg {
                    object_type: Some(ObjectType::Player),
                    position: Some(position),
                    velocity: Some(vec2(heading.x * WALK_SPEED, heading.y * WALK_SPEED)),
                    ..Default::default()
                }))
            }

            _ = throw_timer.tick() => {
                snowball_seq += 1;
                let dir = random_direction(&mut rng);
                metrics.snowballs_thrown.fetch_add(1, Ordering::Relaxed);
                Some(ClientMsg::Movement(MovementMsg {
                    object_type: Some(ObjectType::Snowball),
                    id: Some(format!("{}-s{}", player_id, snowball_seq)),
                    position: Some(position),
                    velocity: Some(vec2(dir.x * SNOWBALL_SPEED, dir.y * SNOWBALL_SPEED)),
                    time_emission: Some(now_ms()),
                    life_length: Some(SNOWBALL_LIFE_MS),
                    ..Default::default()
                }))
            }

            _ = ping_timer.tick() => {
                Some(ClientMsg::Ping(PingMsg { client_time: now_ms() }))
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(text.as_str()) {
                            Ok(ServerMsg::Movement(_)) => {
                                metrics.movements_received.fetch_add(1, Ordering::Relaxed);
                                None
                            }
                            Ok(ServerMsg::Hit(_)) => {
                                metrics.hits_received.fetch_add(1, Ordering::Relaxed);
                                None
                            }
                            Ok(ServerMsg::Pong(pong)) => {
                                let rtt = (now_ms() - pong.client_time).max(0) as u64;
                                metrics.rtt_sum_ms.fetch_add(rtt, Ordering::Relaxed);
                                metrics.rtt_count.fetch_add(1, Ordering::Relaxed);
                                None
                            }
                            Ok(ServerMsg::Death(death)) if death.player_id == player_id => {
                                metrics.deaths_received.fetch_add(1, Ordering::Relaxed);
                                Some(ClientMsg::Respawn(RespawnMsg::default()))
                            }
                            Ok(ServerMsg::Respawn(respawned)) if respawned.player_id == player_id => {
                                position = respawned.position;
                                None
                            }
                            Ok(_) => None,
                            Err(_) => {
                                metrics.errors.fetch_add(1, Ordering::Relaxed);
                                None
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => None,
                }
            }
        };

        if let Some(msg) = outgoing {
            if ws.send(encode(&msg)).await.is_err() {
                metrics.errors.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut throw_rate: f64 = 1.0;
    let mut url = "ws://127.0.0.1:12345/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--throw-rate" => {
                i += 1;
                throw_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(1.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Snowfight Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Throw rate: {}/s per client", throw_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, throw_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, movements={}, hits={}, deaths={}, thrown={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.movements_received.load(Ordering::Relaxed),
                metrics_clone.hits_received.load(Ordering::Relaxed),
                metrics_clone.deaths_received.load(Ordering::Relaxed),
                metrics_clone.snowballs_thrown.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let movements = metrics.movements_received.load(Ordering::Relaxed);
    let rtt_sum = metrics.rtt_sum_ms.load(Ordering::Relaxed);
    let rtt_count = metrics.rtt_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total movement messages: {}", movements);
    println!(
        "Total hits received: {}",
        metrics.hits_received.load(Ordering::Relaxed)
    );
    println!(
        "Total deaths: {}",
        metrics.deaths_received.load(Ordering::Relaxed)
    );
    println!(
        "Total snowballs thrown: {}",
        metrics.snowballs_thrown.load(Ordering::Relaxed)
    );
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));

    if rtt_count > 0 {
        println!("Average ping RTT: {}ms", rtt_sum / rtt_count);
    }

    println!();
    println!(
        "Messages/sec (total): {:.0}",
        msgs as f64 / duration_secs.max(1) as f64
    );
    println!(
        "Movement updates per client/sec: {:.1}",
        movements as f64 / num_clients.max(1) as f64 / duration_secs.max(1) as f64
    );
}
