//! Configuration types for Shardring
//!
//! This module defines configuration structures shared by the ring and the
//! binaries. Every section has defaults so a partial file is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration for Shardring
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ring shape configuration
    pub ring: RingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section
    ///
    /// # Errors
    /// Returns `Error::Configuration` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.ring.validate()
    }
}

/// Ring shape configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Number of addressable positions on the ring (N)
    pub domain_size: u64,
    /// Micro-shards placed for each machine (k)
    pub shards_per_machine: u64,
    /// Seed for shard placement; random when unset
    pub seed: Option<u64>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            domain_size: 100,
            shards_per_machine: 3,
            seed: None,
        }
    }
}

impl RingConfig {
    /// Check that `0 < shards_per_machine <= domain_size`
    ///
    /// # Errors
    /// Returns `Error::Configuration` describing the violated bound.
    pub fn validate(&self) -> Result<()> {
        if self.domain_size == 0 {
            return Err(Error::configuration("domain_size must be positive"));
        }
        if self.shards_per_machine == 0 {
            return Err(Error::configuration("shards_per_machine must be positive"));
        }
        if self.shards_per_machine > self.domain_size {
            return Err(Error::configuration(format!(
                "shards_per_machine ({}) exceeds domain_size ({})",
                self.shards_per_machine, self.domain_size
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ring.domain_size, 100);
        assert_eq!(config.ring.shards_per_machine, 3);
        assert_eq!(config.ring.seed, None);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ring]
            domain_size = 1000
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.ring.domain_size, 1000);
        assert_eq!(config.ring.shards_per_machine, 3);
        assert_eq!(config.ring.seed, Some(42));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let zero_domain = RingConfig {
            domain_size: 0,
            ..RingConfig::default()
        };
        assert!(matches!(
            zero_domain.validate(),
            Err(Error::Configuration(_))
        ));

        let zero_shards = RingConfig {
            shards_per_machine: 0,
            ..RingConfig::default()
        };
        assert!(zero_shards.validate().is_err());

        let too_many = RingConfig {
            domain_size: 4,
            shards_per_machine: 5,
            seed: None,
        };
        assert!(too_many.validate().is_err());

        let exact = RingConfig {
            domain_size: 5,
            shards_per_machine: 5,
            seed: None,
        };
        assert!(exact.validate().is_ok());
    }
}
