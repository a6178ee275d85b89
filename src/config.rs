//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `QUERYGATE_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `QUERYGATE_CACHE_CAPACITY` | 1000 | Max cached answers |
//! | `QUERYGATE_CACHE_TTL` | 3600 | Answer lifetime (secs) |
//! | `QUERYGATE_RATE_LIMIT` | 5 | Admitted requests per caller per window |
//! | `QUERYGATE_RATE_WINDOW` | 60 | Rate window length (secs) |
//! | `QUERYGATE_RULES_PATH` | unset | TOML rule table; built-in rules when unset |
//! | `QUERYGATE_MAX_OUTPUT` | 100000 | Max sanitized answer length (bytes) |
//! | `QUERYGATE_SHUTDOWN_TIMEOUT` | 30 | Graceful shutdown timeout (secs) |
//! | `QUERYGATE_MAINTENANCE_INTERVAL` | 60 | Expiry sweep period (secs) |
//! | `QUERYGATE_MAX_CONNECTIONS` | 64 | Max concurrent IPC connections |
//! | `QUERYGATE_FRAME_LIMIT` | 1048576 | Max IPC frame size (bytes) |
//! | `QUERYGATE_LOG_FORMAT` | json | `json` or `pretty` |
//! | `QUERYGATE_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `QUERYGATE_LOG_FILE` | unset | Log file; stderr when unset |
//! | `QUERYGATE_SOCKET_PATH` | platform | IPC socket path |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheStoreConfig;
use crate::gateway::GatewayConfig;
use crate::ipc::{ConnectionConfig, IpcServerConfig};
use crate::security::{RateLimitConfig, RuleError, RuleTable, SecurityConfig};
use crate::telemetry::{LogConfig, LogFormat};
use crate::RuntimeConfig;

/// Default socket path for IPC communication.
#[cfg(unix)]
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/querygate.sock";

#[cfg(windows)]
pub const DEFAULT_SOCKET_PATH: &str = r"\\.\pipe\querygate";

const DEFAULT_FRAME: usize = 1024 * 1024; // 1 MiB
const MIN_FRAME: usize = 4096; // floor: 4 KiB

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load rules from {path}: {source}")]
    Rules {
        path: PathBuf,
        #[source]
        source: RuleError,
    },
}

/// Effective configuration summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub rate_limit: usize,
    pub rate_window_secs: u64,
    pub rules_path: Option<String>,
    pub max_output_length: usize,
    pub shutdown_timeout_secs: u64,
    pub maintenance_interval_secs: u64,
    pub max_connections: usize,
    pub ipc_frame_limit: usize,
    pub log_format: String,
    pub log_level: String,
    pub socket_path: String,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub cache: CacheStoreConfig,
    pub rate_limit: RateLimitConfig,
    pub rules_path: Option<PathBuf>,
    pub max_output_length: usize,
    pub shutdown_timeout: Duration,
    pub maintenance_interval: Duration,
    pub connections: ConnectionConfig,
    pub ipc_server: IpcServerConfig,
    pub log: LogConfig,
    /// Raw `QUERYGATE_LOG_FORMAT` when it did not parse.
    pub invalid_log_format: Option<String>,
    pub socket_path: String,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty string env var.
fn parse_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn load_cache_config() -> CacheStoreConfig {
    let capacity = parse_usize("QUERYGATE_CACHE_CAPACITY", 1000).max(1);
    let ttl_secs = parse_u64("QUERYGATE_CACHE_TTL", 3600).max(1);
    CacheStoreConfig {
        capacity,
        ttl: Duration::from_secs(ttl_secs),
    }
}

fn load_rate_limit_config() -> RateLimitConfig {
    let max_requests = parse_usize("QUERYGATE_RATE_LIMIT", 5).max(1);
    let window_secs = parse_u64("QUERYGATE_RATE_WINDOW", 60).max(1);
    RateLimitConfig {
        max_requests,
        window: Duration::from_secs(window_secs),
    }
}

fn load_log_config() -> (LogConfig, Option<String>) {
    let mut invalid = None;
    let format = match parse_string("QUERYGATE_LOG_FORMAT") {
        Some(raw) => raw.parse::<LogFormat>().unwrap_or_else(|_| {
            invalid = Some(raw);
            LogFormat::Json
        }),
        None => LogFormat::Json,
    };
    let level = parse_string("QUERYGATE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
    let output_path = parse_string("QUERYGATE_LOG_FILE").map(PathBuf::from);
    (
        LogConfig {
            format,
            level,
            output_path,
        },
        invalid,
    )
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
/// The rule file is only named here; it is read by `security_config`.
pub fn load() -> EnvConfig {
    let max_output_length = parse_usize("QUERYGATE_MAX_OUTPUT", 100_000).max(1);
    let shutdown_secs = parse_u64("QUERYGATE_SHUTDOWN_TIMEOUT", 30).max(1);
    let maintenance_secs = parse_u64("QUERYGATE_MAINTENANCE_INTERVAL", 60).max(1);
    let max_connections = parse_usize("QUERYGATE_MAX_CONNECTIONS", 64).max(1);
    let max_frame_size = parse_usize("QUERYGATE_FRAME_LIMIT", DEFAULT_FRAME).max(MIN_FRAME);
    let (log, invalid_log_format) = load_log_config();

    EnvConfig {
        cache: load_cache_config(),
        rate_limit: load_rate_limit_config(),
        rules_path: parse_string("QUERYGATE_RULES_PATH").map(PathBuf::from),
        max_output_length,
        shutdown_timeout: Duration::from_secs(shutdown_secs),
        maintenance_interval: Duration::from_secs(maintenance_secs),
        connections: ConnectionConfig { max_connections },
        ipc_server: IpcServerConfig { max_frame_size },
        log,
        invalid_log_format,
        socket_path: socket_path(),
    }
}

/// Socket path from `QUERYGATE_SOCKET_PATH`, or the platform default.
pub fn socket_path() -> String {
    parse_string("QUERYGATE_SOCKET_PATH").unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_string())
}

impl EnvConfig {
    /// Rule table from `rules_path`, or the built-in table.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        match &self.rules_path {
            Some(path) => {
                let table = RuleTable::load(path).map_err(|source| ConfigError::Rules {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!(path = %path.display(), rules = table.len(), "loaded rule table");
                Ok(table)
            }
            None => Ok(RuleTable::default()),
        }
    }

    pub fn security_config(&self) -> Result<SecurityConfig, ConfigError> {
        Ok(SecurityConfig {
            rate_limit: self.rate_limit.clone(),
            rules: self.rule_table()?,
            max_output_length: self.max_output_length,
        })
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        Ok(GatewayConfig {
            cache: self.cache.clone(),
            security: self.security_config()?,
        })
    }

    /// Everything `Runtime::new` needs.
    pub fn runtime_config(&self) -> Result<RuntimeConfig, ConfigError> {
        Ok(RuntimeConfig {
            gateway: self.gateway_config()?,
            connections: self.connections.clone(),
            ipc_server: self.ipc_server.clone(),
            shutdown_timeout: self.shutdown_timeout,
            maintenance_interval: self.maintenance_interval,
        })
    }

    /// Flat summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            cache_capacity: self.cache.capacity,
            cache_ttl_secs: self.cache.ttl.as_secs(),
            rate_limit: self.rate_limit.max_requests,
            rate_window_secs: self.rate_limit.window.as_secs(),
            rules_path: self
                .rules_path
                .as_ref()
                .map(|p| p.display().to_string()),
            max_output_length: self.max_output_length,
            shutdown_timeout_secs: self.shutdown_timeout.as_secs(),
            maintenance_interval_secs: self.maintenance_interval.as_secs(),
            max_connections: self.connections.max_connections,
            ipc_frame_limit: self.ipc_server.max_frame_size,
            log_format: match self.log.format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
            log_level: self.log.level.clone(),
            socket_path: self.socket_path.clone(),
        }
    }
}
