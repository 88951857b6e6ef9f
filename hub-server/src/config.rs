//! Configuration loading for the registry and relay services.
//!
//! Configuration is loaded from an optional TOML file, then overridden by
//! process environment variables. Both services read the same file; each uses
//! its own section plus the shared `http`, `cleanup` and `limits` sections.

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Room registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Session relay configuration.
    #[serde(default)]
    pub relay: RelayConfig,
    /// HTTP handling configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Sweep task configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Room registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Listen host (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (default: 8787).
    #[serde(default = "default_registry_port")]
    pub port: u16,
    /// Milliseconds without a heartbeat before a room is dead (default: 60s).
    #[serde(default = "default_room_ttl_ms")]
    pub room_ttl_ms: u64,
    /// Rooms a single host may have tracked at once (default: 3).
    #[serde(default = "default_max_rooms_per_host")]
    pub max_rooms_per_host: usize,
}

/// Session relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Listen host for both the API and the UDP forwarder (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP API port (default: 8790).
    #[serde(default = "default_relay_api_port")]
    pub api_port: u16,
    /// UDP forwarder port (default: 19140).
    #[serde(default = "default_relay_udp_port")]
    pub udp_port: u16,
    /// Milliseconds of silence before a session is dead (default: 120s).
    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,
    /// Host name advertised to clients when a create request names none.
    pub public_host: Option<String>,
    /// Reject binds that do not present the role token (default: false).
    #[serde(default)]
    pub require_tokens: bool,
}

/// HTTP handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Largest accepted request body in bytes (default: 2,000,000).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Sweep task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Sweep interval in milliseconds (default: 10s).
    #[serde(default = "default_cleanup_interval_ms")]
    pub interval_ms: u64,
    /// Enable the sweep task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Create/open requests allowed per client IP per minute (default: 600).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Create/open requests allowed per second across all clients (default: 1000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_registry_port() -> u16 {
    8787
}

fn default_room_ttl_ms() -> u64 {
    60_000
}

fn default_max_rooms_per_host() -> usize {
    3
}

fn default_relay_api_port() -> u16 {
    8790
}

fn default_relay_udp_port() -> u16 {
    19140
}

fn default_session_ttl_ms() -> u64 {
    120_000
}

fn default_max_body_bytes() -> usize {
    2_000_000
}

fn default_cleanup_interval_ms() -> u64 {
    10_000
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    600
}

fn default_global_requests_per_second() -> u32 {
    1000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_registry_port(),
            room_ttl_ms: default_room_ttl_ms(),
            max_rooms_per_host: default_max_rooms_per_host(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_relay_api_port(),
            udp_port: default_relay_udp_port(),
            session_ttl_ms: default_session_ttl_ms(),
            public_host: None,
            require_tokens: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_cleanup_interval_ms(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            relay: RelayConfig::default(),
            http: HttpConfig::default(),
            cleanup: CleanupConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the optional file, then apply overrides from the process environment.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(host) = lookup("HOST") {
            self.registry.host = host;
        }
        override_parsed(&lookup, "PORT", &mut self.registry.port)?;
        override_parsed(&lookup, "ROOM_TTL_MS", &mut self.registry.room_ttl_ms)?;
        override_parsed(
            &lookup,
            "MAX_ROOMS_PER_HOST",
            &mut self.registry.max_rooms_per_host,
        )?;

        if let Some(host) = lookup("RELAY_HOST") {
            self.relay.host = host;
        }
        override_parsed(&lookup, "RELAY_API_PORT", &mut self.relay.api_port)?;
        override_parsed(&lookup, "RELAY_UDP_PORT", &mut self.relay.udp_port)?;
        override_parsed(
            &lookup,
            "RELAY_SESSION_TTL_MS",
            &mut self.relay.session_ttl_ms,
        )?;
        if let Some(public_host) = lookup("RELAY_PUBLIC_HOST") {
            self.relay.public_host = Some(public_host);
        }
        override_parsed(
            &lookup,
            "RELAY_REQUIRE_TOKENS",
            &mut self.relay.require_tokens,
        )?;

        override_parsed(&lookup, "MAX_BODY_BYTES", &mut self.http.max_body_bytes)?;
        override_parsed(&lookup, "CLEANUP_INTERVAL_MS", &mut self.cleanup.interval_ms)?;

        Ok(())
    }
}

fn override_parsed<T, F>(lookup: &F, var: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(var) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {}: {source}", .path.display())]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {}: {source}", .path.display())]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.registry.port, 8787);
        assert_eq!(config.registry.room_ttl_ms, 60_000);
        assert_eq!(config.registry.max_rooms_per_host, 3);
        assert_eq!(config.relay.api_port, 8790);
        assert_eq!(config.relay.udp_port, 19140);
        assert_eq!(config.relay.session_ttl_ms, 120_000);
        assert!(!config.relay.require_tokens);
        assert_eq!(config.http.max_body_bytes, 2_000_000);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[registry]
host = "127.0.0.1"
port = 9000
max_rooms_per_host = 5

[relay]
udp_port = 20000
public_host = "relay.example.net"
require_tokens = true

[cleanup]
interval_ms = 2500
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.registry.host, "127.0.0.1");
        assert_eq!(config.registry.port, 9000);
        assert_eq!(config.registry.max_rooms_per_host, 5);
        assert_eq!(config.relay.udp_port, 20000);
        assert_eq!(config.relay.public_host.as_deref(), Some("relay.example.net"));
        assert!(config.relay.require_tokens);
        assert_eq!(config.cleanup.interval_ms, 2500);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.registry.room_ttl_ms, 60_000);
        assert_eq!(config.limits.requests_per_minute, 600);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("PORT", "8080"),
                ("ROOM_TTL_MS", "5000"),
                ("RELAY_UDP_PORT", "19999"),
                ("RELAY_PUBLIC_HOST", "play.example.org"),
                ("RELAY_REQUIRE_TOKENS", "true"),
            ]))
            .unwrap();
        assert_eq!(config.registry.port, 8080);
        assert_eq!(config.registry.room_ttl_ms, 5000);
        assert_eq!(config.relay.udp_port, 19999);
        assert_eq!(config.relay.public_host.as_deref(), Some("play.example.org"));
        assert!(config.relay.require_tokens);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.registry.port, 8787);
    }

    #[test]
    fn invalid_env_value_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("RELAY_API_PORT", "seventy")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "RELAY_API_PORT"));
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nsession_ttl_ms = 30000").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.relay.session_ttl_ms, 30_000);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/hub.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
