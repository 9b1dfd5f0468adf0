//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Max inbound WebSocket messages per second per connection
    pub input_rate_limit: u32,
    /// Tunables handed to the combat authority
    pub combat: CombatConfig,
}

/// Combat tunables consumed by the authority and the simulated caster
#[derive(Clone, Debug)]
pub struct CombatConfig {
    /// Max allowed |server_now - client_time| in seconds
    pub clock_desync_tolerance: f64,
    /// Fixed delay between shots inside one burst (seconds)
    pub burst_interval: f64,
    /// Run origin-distance and unit-direction checks on fire requests
    pub enforce_aim_checks: bool,
    /// Max distance between the reported muzzle origin and the character
    pub max_origin_offset: f32,
    /// Downward acceleration applied to projectiles
    pub gravity: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            clock_desync_tolerance: 2.0,
            burst_interval: 0.08,
            enforce_aim_checks: false,
            max_origin_offset: 10.0,
            gravity: 9.81,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let defaults = CombatConfig::default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            input_rate_limit: parse_or("INPUT_RATE_LIMIT", 30)?,

            combat: CombatConfig {
                clock_desync_tolerance: parse_or(
                    "CLOCK_DESYNC_TOLERANCE_SECS",
                    defaults.clock_desync_tolerance,
                )?,
                burst_interval: parse_or("BURST_INTERVAL_SECS", defaults.burst_interval)?,
                enforce_aim_checks: parse_or("ENFORCE_AIM_CHECKS", defaults.enforce_aim_checks)?,
                max_origin_offset: parse_or("MAX_ORIGIN_OFFSET", defaults.max_origin_offset)?,
                gravity: parse_or("GRAVITY", defaults.gravity)?,
            },
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combat_defaults_match_documented_values() {
        let combat = CombatConfig::default();
        assert_eq!(combat.clock_desync_tolerance, 2.0);
        assert!(!combat.enforce_aim_checks);
        assert!(combat.burst_interval > 0.0);
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: f64 = parse_or("WEAPON_AUTHORITY_TEST_UNSET_KEY", 1.5).unwrap();
        assert_eq!(value, 1.5);
    }
}
