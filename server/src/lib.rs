//! Snowfight server library.
//!
//! Sharded area-of-interest simulation: a spatial grid per shard, an entity
//! store with collision and expiry, and the WebSocket edge that feeds it.

pub mod collision;
pub mod config;
pub mod entity;
pub mod error;
pub mod grid;
pub mod session;
pub mod shard;
pub mod shard_loop;
pub mod store;
pub mod ws;
