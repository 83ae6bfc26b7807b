//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::rules;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS ("*" or comma-separated list)
    pub cors_origin: String,
    /// Max inbound socket messages per second per connection
    pub input_rate_limit: u32,
    /// Gameplay timing shared by every room
    pub room: RoomSettings,
}

/// Per-room timing and layout settings
#[derive(Clone, Debug)]
pub struct RoomSettings {
    /// Value the 1 Hz countdown starts from
    pub countdown_secs: i32,
    /// Pause between the end of a round and the next countdown
    pub round_pause: Duration,
    /// Round wins needed to take the match
    pub rounds_to_win: u32,
    /// Obstacles generated per room
    pub obstacle_count: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            countdown_secs: rules::COUNTDOWN_START,
            round_pause: Duration::from_secs(3),
            rounds_to_win: rules::ROUNDS_TO_WIN,
            obstacle_count: rules::OBSTACLE_COUNT,
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
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3004".to_string())
        };

        let defaults = RoomSettings::default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            input_rate_limit: parse_var("INPUT_RATE_LIMIT", 120)?,

            room: RoomSettings {
                countdown_secs: parse_var("COUNTDOWN_SECS", defaults.countdown_secs)?,
                round_pause: Duration::from_secs(parse_var(
                    "ROUND_PAUSE_SECS",
                    defaults.round_pause.as_secs(),
                )?),
                rounds_to_win: parse_var("ROUNDS_TO_WIN", defaults.rounds_to_win)?,
                obstacle_count: parse_bounded(
                    "OBSTACLE_COUNT",
                    defaults.obstacle_count,
                    rules::MAX_OBSTACLE_COUNT,
                )?,
            },
        })
    }
}

/// Read an optional numeric variable, keeping the default when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Like `parse_var`, but values above `max` are rejected
fn parse_bounded<T: FromStr + PartialOrd>(
    name: &'static str,
    default: T,
    max: T,
) -> Result<T, ConfigError> {
    let value = parse_var(name, default)?;
    if value > max {
        return Err(ConfigError::Invalid(name));
    }
    Ok(value)
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
    fn unset_variable_keeps_default() {
        let value: u32 = parse_var("STICKMAN_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn malformed_variable_is_rejected() {
        env::set_var("STICKMAN_TEST_BAD_NUMBER", "three");
        let result: Result<u32, _> = parse_var("STICKMAN_TEST_BAD_NUMBER", 3);
        assert!(matches!(result, Err(ConfigError::Invalid("STICKMAN_TEST_BAD_NUMBER"))));
    }

    #[test]
    fn oversized_obstacle_count_is_rejected() {
        env::set_var("STICKMAN_TEST_OBSTACLES_HUGE", "18446744073709551615");
        let result = parse_bounded("STICKMAN_TEST_OBSTACLES_HUGE", 8usize, rules::MAX_OBSTACLE_COUNT);
        assert!(matches!(result, Err(ConfigError::Invalid("STICKMAN_TEST_OBSTACLES_HUGE"))));

        env::set_var("STICKMAN_TEST_OBSTACLES_OK", "64");
        let value = parse_bounded("STICKMAN_TEST_OBSTACLES_OK", 8usize, rules::MAX_OBSTACLE_COUNT);
        assert_eq!(value.unwrap(), 64);
    }

    #[test]
    fn default_room_settings_follow_rules() {
        let settings = RoomSettings::default();
        assert_eq!(settings.countdown_secs, 5);
        assert_eq!(settings.rounds_to_win, 3);
    }
}
