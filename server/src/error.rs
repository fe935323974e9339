use snowfight_shared::config::WorldConfigError;
use thiserror::Error;

/// Invalid server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid world config: {0}")]
    World(#[from] WorldConfigError),
    #[error("{field} must be > 0")]
    Zero { field: &'static str },
    #[error("slow_tick_ms ({slow}) must not be shorter than fast_tick_ms ({fast})")]
    TickOrder { fast: u64, slow: u64 },
    #[error("environment variable {var} has invalid value {value:?}")]
    Env { var: &'static str, value: String },
}

/// Inbound frame that could not be turned into a client message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}
