//! Server configuration read from the environment.
//!
//!   CIVICSYNC_JWT_SECRET          - HMAC secret for session tokens (required)
//!   CIVICSYNC_DATABASE_URL        - Postgres connection string (optional; in-memory stores when unset)
//!   CIVICSYNC_BIND_ADDR           - listen address (default: 0.0.0.0:3000)
//!   CIVICSYNC_STATIC_DIR          - page directory behind the gate (default: static)
//!   CIVICSYNC_SESSION_COOKIE      - session cookie name (default: token)
//!   CIVICSYNC_SECURE_COOKIES      - mark the session cookie Secure (default: false)
//!   CIVICSYNC_ANONYMOUS_COMMENTS  - accept comments without a session (default: false)
//!   CIVICSYNC_DB_MAX_CONNECTIONS  - pool size (default: 10)

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_COOKIE: &str = "token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub session_cookie: String,
    pub secure_cookies: bool,
    pub anonymous_comments: bool,
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            var("CIVICSYNC_JWT_SECRET").ok_or(ConfigError::Missing("CIVICSYNC_JWT_SECRET"))?;

        Ok(Self {
            jwt_secret,
            database_url: var("CIVICSYNC_DATABASE_URL"),
            bind_addr: var("CIVICSYNC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            static_dir: var("CIVICSYNC_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            session_cookie: var("CIVICSYNC_SESSION_COOKIE")
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.into()),
            secure_cookies: parse_flag("CIVICSYNC_SECURE_COOKIES", var("CIVICSYNC_SECURE_COOKIES"))?,
            anonymous_comments: parse_flag(
                "CIVICSYNC_ANONYMOUS_COMMENTS",
                var("CIVICSYNC_ANONYMOUS_COMMENTS"),
            )?,
            db_max_connections: match var("CIVICSYNC_DB_MAX_CONNECTIONS") {
                None => 10,
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "CIVICSYNC_DB_MAX_CONNECTIONS",
                    value: raw,
                })?,
            },
        })
    }
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}
