//! Server configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strictly_wordle::{AbandonPolicy, ErrorLocation, SessionSettings};
use tracing::{debug, info, instrument, warn};

/// Environment variable overriding [`ServerConfig::db_path`].
pub const DB_PATH_ENV: &str = "STRICTLY_WORDLE_DB";

/// Environment variable overriding [`ServerConfig::port`].
pub const PORT_ENV: &str = "PORT";

/// Configuration for the game server, loaded from TOML.
///
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    db_path: String,

    /// Host to bind to.
    host: String,

    /// Port to bind to.
    port: u16,

    /// Word length for new games.
    word_length: usize,

    /// Attempts allowed per game.
    max_attempts: u32,

    /// Whether abandoning a game resets the win streak.
    abandon_resets_streak: bool,

    /// Reload-and-retry rounds after a concurrent update.
    max_conflict_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "strictly_wordle.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            word_length: 5,
            max_attempts: 6,
            abandon_resets_streak: false,
            max_conflict_retries: 3,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(db_path = %config.db_path, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `STRICTLY_WORDLE_DB` and `PORT` from the environment.
    #[instrument(skip(self))]
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            debug!(db_path = %db_path, "Database path from environment");
            self.db_path = db_path;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid {} '{}': {}", PORT_ENV, port, e)))?;
            debug!(port = self.port, "Port from environment");
        }
        Ok(self)
    }

    /// Replaces the database path.
    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Replaces the bind address.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Address to bind the HTTP listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Session settings derived from this configuration.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            word_length: self.word_length,
            max_attempts: self.max_attempts,
            max_conflict_retries: self.max_conflict_retries,
            abandon_policy: if self.abandon_resets_streak {
                AbandonPolicy::ResetStreak
            } else {
                AbandonPolicy::KeepStreak
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.word_length == 0 {
            return Err(ConfigError::new("word_length must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts must be positive".to_string()));
        }
        if self.db_path.trim().is_empty() {
            warn!("Empty db_path in config");
            return Err(ConfigError::new("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}", message, location)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Where the error was raised.
    pub location: ErrorLocation,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        Self {
            message,
            location: ErrorLocation::caller(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn test_partial_file_overrides() {
        let config = ServerConfig::from_toml(
            r#"
            port = 8080
            word_length = 6
            abandon_resets_streak = true
            "#,
        )
        .unwrap();

        assert_eq!(*config.port(), 8080);
        assert_eq!(config.db_path(), "strictly_wordle.db");
        let settings = config.session_settings();
        assert_eq!(settings.word_length, 6);
        assert_eq!(settings.abandon_policy, AbandonPolicy::ResetStreak);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::from_toml("max_attempts = 0").is_err());
        assert!(ServerConfig::from_toml("port = \"eighty\"").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let config = ServerConfig::default()
            .with_db_path("other.db")
            .with_bind(None, Some(9000));
        assert_eq!(config.db_path(), "other.db");
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }
}
