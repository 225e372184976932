//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use pms_auth::{MAX_TOKEN_LIFETIME_MS, MIN_TOKEN_LIFETIME_MS};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 86_400_000;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Settings for the API process.
///
/// `Debug` never prints the signing secret.
#[derive(Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub token_lifetime_ms: i64,
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    /// Argon2 memory cost in KiB; `None` keeps the library default.
    pub argon2_memory_kib: Option<u32>,
    pub argon2_iterations: Option<u32>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_lifetime_ms = match get("JWT_EXPIRATION_MS") {
            Some(raw) => parse_token_lifetime(&raw)?,
            None => DEFAULT_TOKEN_LIFETIME_MS,
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "BIND_ADDR",
            reason: e.to_string(),
        })?;

        let store_timeout_ms = match get("STORE_TIMEOUT_MS") {
            Some(raw) => parse_positive_i64("STORE_TIMEOUT_MS", &raw)? as u64,
            None => DEFAULT_STORE_TIMEOUT_MS,
        };

        Ok(Self {
            jwt_secret,
            token_lifetime_ms,
            bind_addr,
            database_url: get("DATABASE_URL"),
            store_timeout: Duration::from_millis(store_timeout_ms),
            argon2_memory_kib: get("ARGON2_MEMORY_KIB")
                .map(|raw| parse_u32("ARGON2_MEMORY_KIB", &raw))
                .transpose()?,
            argon2_iterations: get("ARGON2_ITERATIONS")
                .map(|raw| parse_u32("ARGON2_ITERATIONS", &raw))
                .transpose()?,
        })
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.token_lifetime_ms)
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime_ms", &self.token_lifetime_ms)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("store_timeout", &self.store_timeout)
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .finish()
    }
}

fn parse_positive_i64(var: &'static str, raw: &str) -> Result<i64, ConfigError> {
    let value: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_token_lifetime(raw: &str) -> Result<i64, ConfigError> {
    let value = parse_positive_i64("JWT_EXPIRATION_MS", raw)?;
    if !(MIN_TOKEN_LIFETIME_MS..=MAX_TOKEN_LIFETIME_MS).contains(&value) {
        return Err(ConfigError::Invalid {
            var: "JWT_EXPIRATION_MS",
            reason: format!(
                "must be between {MIN_TOKEN_LIFETIME_MS} and {MAX_TOKEN_LIFETIME_MS}"
            ),
        });
    }
    Ok(value)
}

fn parse_u32(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let cfg = from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.token_lifetime_ms, DEFAULT_TOKEN_LIFETIME_MS);
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.store_timeout, Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS));
        assert!(cfg.database_url.is_none());
        assert!(cfg.argon2_memory_kib.is_none());
    }

    #[test]
    fn missing_or_blank_secret_is_rejected() {
        assert_eq!(from(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(
            from(&[("JWT_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn non_positive_lifetime_names_the_variable() {
        let err = from(&[("JWT_SECRET", "s"), ("JWT_EXPIRATION_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRATION_MS", .. }));

        let err = from(&[("JWT_SECRET", "s"), ("JWT_EXPIRATION_MS", "soon")]).unwrap_err();
        assert!(err.to_string().starts_with("JWT_EXPIRATION_MS"));
    }

    #[test]
    fn token_lifetime_outside_signable_range_is_rejected() {
        for raw in ["500", "9223372036854775807"] {
            let err = from(&[("JWT_SECRET", "s"), ("JWT_EXPIRATION_MS", raw)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: "JWT_EXPIRATION_MS", .. }),
                "{raw}"
            );
        }
        let cfg = from(&[("JWT_SECRET", "s"), ("JWT_EXPIRATION_MS", "1000")]).unwrap();
        assert_eq!(cfg.token_lifetime(), chrono::Duration::seconds(1));
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let err = from(&[("JWT_SECRET", "s"), ("BIND_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BIND_ADDR", .. }));
    }

    #[test]
    fn debug_redacts_the_secret() {
        let cfg = from(&[
            ("JWT_SECRET", "top-secret-value"),
            ("DATABASE_URL", "postgres://u:pw@db/pms"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("pw@db"));
        assert!(rendered.contains("<redacted>"));
    }
}
