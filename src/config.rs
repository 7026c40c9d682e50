//! Configuration management for the DDAS server

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// One gibibyte, the default per-user daily download allowance
pub const DEFAULT_DAILY_QUOTA_BYTES: i64 = 1024 * 1024 * 1024;

/// Default read size used when streaming a file through SHA-256
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub dedup: DedupConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Longest accepted retention window, one hundred years
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Duplicate resolution and quota settings
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Bytes a single user may register per calendar day
    pub daily_quota_bytes: i64,
    /// Also match names after stripping a " (N)" copy suffix
    pub smart_name_match: bool,
    /// Fingerprinter read size in bytes
    pub hash_chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub retention_days: i64,
    pub interval_secs: u64,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite:./ddas.db".to_string(),
            },
            dedup: DedupConfig::default(),
            cleanup: CleanupConfig {
                enabled: true,
                retention_days: 365,
                interval_secs: 24 * 60 * 60,
            },
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            daily_quota_bytes: DEFAULT_DAILY_QUOTA_BYTES,
            smart_name_match: false,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let hash_chunk_size = parse_var("DDAS_HASH_CHUNK_SIZE", defaults.dedup.hash_chunk_size)?;
        if hash_chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DDAS_HASH_CHUNK_SIZE",
                value: "0".to_string(),
            });
        }

        let retention_days =
            parse_var("DDAS_CLEANUP_RETENTION_DAYS", defaults.cleanup.retention_days)?;
        if !(1..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(ConfigError::Invalid {
                key: "DDAS_CLEANUP_RETENTION_DAYS",
                value: retention_days.to_string(),
            });
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            dedup: DedupConfig {
                daily_quota_bytes: parse_var(
                    "DDAS_DAILY_QUOTA_BYTES",
                    defaults.dedup.daily_quota_bytes,
                )?,
                smart_name_match: parse_var(
                    "DDAS_SMART_NAME_MATCH",
                    defaults.dedup.smart_name_match,
                )?,
                hash_chunk_size,
            },
            cleanup: CleanupConfig {
                enabled: parse_var("DDAS_CLEANUP_ENABLED", defaults.cleanup.enabled)?,
                retention_days,
                interval_secs: parse_var(
                    "DDAS_CLEANUP_INTERVAL_SECS",
                    defaults.cleanup.interval_secs,
                )?,
            },
        })
    }
}

/// Read and parse an environment variable, keeping `default` when it is unset
fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dedup.daily_quota_bytes, 1_073_741_824);
        assert!(!config.dedup.smart_name_match);
        assert_eq!(config.cleanup.retention_days, 365);
    }

    #[test]
    fn test_parse_var_unset_uses_default() {
        let value: u16 = parse_var("DDAS_TEST_UNSET_VARIABLE_XYZ", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("DDAS_TEST_GARBAGE_PORT", "not-a-port");
        let result: Result<u16, _> = parse_var("DDAS_TEST_GARBAGE_PORT", 8080);
        env::remove_var("DDAS_TEST_GARBAGE_PORT");

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "DDAS_TEST_GARBAGE_PORT", .. })
        ));
    }

    #[test]
    fn test_retention_days_must_be_in_range() {
        for value in ["0", "-5", "1000000000"] {
            env::set_var("DDAS_CLEANUP_RETENTION_DAYS", value);
            let result = Config::from_env();
            env::remove_var("DDAS_CLEANUP_RETENTION_DAYS");

            assert!(matches!(
                result,
                Err(ConfigError::Invalid { key: "DDAS_CLEANUP_RETENTION_DAYS", .. })
            ));
        }
    }
}
