use crate::error::ConfigError;
use snowfight_shared::config::WorldConfig;
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Number of independent simulation shards
    pub shard_count: usize,
    /// View sync and collision cadence
    pub fast_tick_ms: u64,
    /// Expiry sweep cadence
    pub slow_tick_ms: u64,
    pub max_connections: usize,
    /// Outbound messages buffered per connection before new ones are dropped
    pub outbox_capacity: usize,
    /// Pending inbound commands per shard
    pub command_capacity: usize,
    /// Largest accepted inbound frame (bytes)
    pub max_message_size: usize,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:12345".to_string(),
            shard_count: 4,
            fast_tick_ms: 10,
            slow_tick_ms: 250,
            max_connections: 1000,
            outbox_capacity: 512,
            command_capacity: 1024,
            max_message_size: 4096,
            world: WorldConfig::default(),
        }
    }
}

/// Parse `var` from the environment if set.
fn env_override<T: FromStr>(var: &'static str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}

impl ServerConfig {
    /// Defaults overridden by `SNOWFIGHT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env_override("SNOWFIGHT_LISTEN_ADDR", &mut config.listen_addr)?;
        env_override("SNOWFIGHT_SHARDS", &mut config.shard_count)?;
        env_override("SNOWFIGHT_FAST_TICK_MS", &mut config.fast_tick_ms)?;
        env_override("SNOWFIGHT_SLOW_TICK_MS", &mut config.slow_tick_ms)?;
        env_override("SNOWFIGHT_MAX_CONNECTIONS", &mut config.max_connections)?;
        env_override("SNOWFIGHT_WORLD_WIDTH", &mut config.world.width)?;
        env_override("SNOWFIGHT_WORLD_HEIGHT", &mut config.world.height)?;
        env_override("SNOWFIGHT_CELL_SIZE", &mut config.world.cell_size)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        let counts = [
            ("shard_count", self.shard_count),
            ("max_connections", self.max_connections),
            ("outbox_capacity", self.outbox_capacity),
            ("command_capacity", self.command_capacity),
            ("max_message_size", self.max_message_size),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.fast_tick_ms == 0 {
            return Err(ConfigError::Zero {
                field: "fast_tick_ms",
            });
        }
        if self.slow_tick_ms < self.fast_tick_ms {
            return Err(ConfigError::TickOrder {
                fast: self.fast_tick_ms,
                slow: self.slow_tick_ms,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowfight_shared::config::WorldConfigError;

    #[test]
    fn default_server_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_shards_invalid() {
        let config = ServerConfig {
            shard_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "shard_count"
            })
        ));
    }

    #[test]
    fn slow_tick_faster_than_fast_tick_invalid() {
        let config = ServerConfig {
            fast_tick_ms: 20,
            slow_tick_ms: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TickOrder { fast: 20, slow: 10 })
        ));
    }

    #[test]
    fn invalid_world_is_reported() {
        let mut config = ServerConfig::default();
        config.world.cell_size = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::World(WorldConfigError::NotPositive {
                field: "cell_size"
            }))
        ));
    }

    #[test]
    fn env_override_parses_and_rejects() {
        // Variable names unique to this test so parallel tests don't race
        std::env::set_var("SNOWFIGHT_TEST_OVERRIDE_OK", " 7 ");
        let mut value: usize = 1;
        env_override("SNOWFIGHT_TEST_OVERRIDE_OK", &mut value).unwrap();
        assert_eq!(value, 7);

        std::env::set_var("SNOWFIGHT_TEST_OVERRIDE_BAD", "seven");
        let err = env_override("SNOWFIGHT_TEST_OVERRIDE_BAD", &mut value).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
        assert_eq!(value, 7);

        env_override("SNOWFIGHT_TEST_OVERRIDE_UNSET", &mut value).unwrap();
        assert_eq!(value, 7);
    }
}
