use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::srs_scheduler::SchedulerParams;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

/// Scheduler tuning and study-planner defaults
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub streak_lookback_days: u32,
    pub maximum_interval_days: i64,
    pub due_limit: usize,
    pub daily_target: usize,
    pub days_ahead: u32,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            initial_ease = self.scheduler.initial_ease,
            minimum_ease = self.scheduler.minimum_ease,
            daily_target = self.scheduler.daily_target,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.scheduler.minimum_ease <= 0.0 {
            return Err(anyhow!("SRS_MINIMUM_EASE must be positive"));
        }

        if self.scheduler.initial_ease < self.scheduler.minimum_ease {
            return Err(anyhow!(
                "SRS_INITIAL_EASE ({}) must not be below SRS_MINIMUM_EASE ({})",
                self.scheduler.initial_ease,
                self.scheduler.minimum_ease
            ));
        }

        if !(1..=36_500).contains(&self.scheduler.maximum_interval_days) {
            return Err(anyhow!("SRS_MAXIMUM_INTERVAL_DAYS must be between 1 and 36500"));
        }

        if self.scheduler.due_limit == 0 || self.scheduler.days_ahead == 0 {
            return Err(anyhow!("SRS_DUE_LIMIT and SRS_DAYS_AHEAD must be greater than 0"));
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:hifz_srs.db?mode=rwc".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,hifz_srs=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY")
            .unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

impl SchedulerConfig {
    fn from_env() -> Result<Self> {
        let defaults = SchedulerConfig::default();

        Ok(SchedulerConfig {
            initial_ease: parse_var("SRS_INITIAL_EASE", defaults.initial_ease)?,
            minimum_ease: parse_var("SRS_MINIMUM_EASE", defaults.minimum_ease)?,
            streak_lookback_days: parse_var("SRS_STREAK_LOOKBACK_DAYS", defaults.streak_lookback_days)?,
            maximum_interval_days: parse_var("SRS_MAXIMUM_INTERVAL_DAYS", defaults.maximum_interval_days)?,
            due_limit: parse_var("SRS_DUE_LIMIT", defaults.due_limit)?,
            daily_target: parse_var("SRS_DAILY_TARGET", defaults.daily_target)?,
            days_ahead: parse_var("SRS_DAYS_AHEAD", defaults.days_ahead)?,
        })
    }

    /// Scheduler parameters with the configured overrides applied
    pub fn params(&self) -> SchedulerParams {
        SchedulerParams {
            initial_ease: self.initial_ease,
            minimum_ease: self.minimum_ease,
            streak_lookback_days: self.streak_lookback_days,
            maximum_interval_days: self.maximum_interval_days,
            ..SchedulerParams::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let params = SchedulerParams::default();
        Self {
            initial_ease: params.initial_ease,
            minimum_ease: params.minimum_ease,
            streak_lookback_days: params.streak_lookback_days,
            maximum_interval_days: params.maximum_interval_days,
            due_limit: 20,
            daily_target: 20,
            days_ahead: 7,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
            scheduler: SchedulerConfig::default(),
        }
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:hifz_srs.db"), "sqli***s.db");
    }

    #[test]
    fn test_database_config_defaults() {
        unsafe { env::remove_var("DATABASE_URL"); }

        let config = DatabaseConfig::from_env().unwrap();
        assert_eq!(config.url, "sqlite:hifz_srs.db?mode=rwc");
    }

    #[test]
    fn test_server_config_defaults() {
        unsafe {
            env::remove_var("PORT");
            env::remove_var("HOST");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.address(), "0.0.0.0:3000");

        unsafe { env::set_var("PORT", "not-a-number"); }
        assert!(ServerConfig::from_env().is_err());

        unsafe { env::remove_var("PORT"); }
    }

    #[test]
    fn test_scheduler_config_parsing() {
        unsafe {
            env::set_var("SRS_DAILY_TARGET", "35");
            env::set_var("SRS_INITIAL_EASE", "2.2");
        }

        let config = SchedulerConfig::from_env().unwrap();
        assert_eq!(config.daily_target, 35);
        assert_eq!(config.initial_ease, 2.2);
        assert_eq!(config.days_ahead, 7);

        let params = config.params();
        assert_eq!(params.initial_ease, 2.2);
        assert_eq!(params.long_content_chars, 200);

        unsafe {
            env::set_var("SRS_DAILY_TARGET", "many");
        }
        assert!(SchedulerConfig::from_env().is_err());

        unsafe {
            env::remove_var("SRS_DAILY_TARGET");
            env::remove_var("SRS_INITIAL_EASE");
        }
    }

    #[test]
    fn test_config_validation() {
        let config = valid_config();
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.database.url = "postgres://localhost/srs".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.scheduler.initial_ease = 1.0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.scheduler.maximum_interval_days = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.scheduler.days_ahead = 0;
        assert!(invalid_config.validate().is_err());
    }
}
