//! Server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::CachePolicy;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8888;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// HS256 secret used to validate bearer tokens.
    pub jwt_secret: String,
    /// Whether `nbconvert:*` scopes are checked.
    pub enforce_scopes: bool,
    /// Accept unauthenticated requests as a dev identity with every scope.
    pub allow_dev_identity: bool,
    /// Directory of plugin exporter manifests, layered over the built-ins.
    pub plugin_dir: Option<PathBuf>,
    /// How capability mappings are cached between requests.
    pub cache_policy: CachePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            cors_allowed_origins: "*".to_string(),
            jwt_secret: String::new(),
            enforce_scopes: true,
            allow_dev_identity: false,
            plugin_dir: None,
            cache_policy: CachePolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `PORT`: Server port (default: 8888)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `JWT_SECRET`: Bearer token secret (default: empty, tokens rejected)
    /// - `ENFORCE_SCOPES`: Require `nbconvert:read`/`nbconvert:write` (default: true)
    /// - `ALLOW_DEV_IDENTITY`: Accept unauthenticated requests (default: false)
    /// - `NBCONVERT_PLUGIN_DIR`: Plugin manifest directory (default: built-ins only)
    /// - `NBCONVERT_CACHE`: `off`, `process`, or `fingerprint` (default: "process")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                reason: format!("'{}' is not a valid port", value),
            })?,
            None => defaults.port,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        let cors_allowed_origins =
            lookup("CORS_ALLOWED_ORIGINS").unwrap_or(defaults.cors_allowed_origins);

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_default();

        let enforce_scopes = match lookup("ENFORCE_SCOPES") {
            Some(value) => parse_bool("ENFORCE_SCOPES", &value)?,
            None => defaults.enforce_scopes,
        };

        let allow_dev_identity = match lookup("ALLOW_DEV_IDENTITY") {
            Some(value) => parse_bool("ALLOW_DEV_IDENTITY", &value)?,
            None => defaults.allow_dev_identity,
        };

        let plugin_dir = lookup("NBCONVERT_PLUGIN_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let cache_policy = match lookup("NBCONVERT_CACHE") {
            Some(value) => value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "NBCONVERT_CACHE".to_string(),
                reason,
            })?,
            None => defaults.cache_policy,
        };

        Ok(Self {
            port,
            log_level,
            cors_allowed_origins,
            jwt_secret,
            enforce_scopes,
            allow_dev_identity,
            plugin_dir,
            cache_policy,
        })
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
