//! Types shared between the snowfight server and its clients.
//!
//! Everything here is plain data: the wire protocol, world geometry and the
//! 2D vector used for positions and velocities.

pub mod config;
pub mod protocol;
pub mod vec2;
