//! Environment-driven server configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use zeroize::Zeroizing;

use crate::domain::ports::LockoutPolicy;

/// Configuration errors carry the offending variable name.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} could not be parsed: {1}")]
    Invalid(&'static str, String),
}

/// Everything the server assembly needs, resolved from the environment.
///
/// ```text
/// HOST, PORT                      bind address        0.0.0.0:8080
/// DATABASE_URL                    optional; memory stores without it
/// JWT_ACCESS_SECRET               required in release builds
/// JWT_REFRESH_SECRET              required in release builds
/// ACCESS_TOKEN_TTL_SECS           900
/// REFRESH_TOKEN_TTL_SECS          604800
/// MAX_LOGIN_ATTEMPTS              5
/// LOCK_DURATION_SECS              900
/// ```
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub access_secret: Zeroizing<String>,
    pub refresh_secret: Zeroizing<String>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub lockout: LockoutPolicy,
}

impl AppConfig {
    /// Resolve configuration from process environment variables.
    ///
    /// # Errors
    /// [`ConfigError`] for unparsable values, or for missing token secrets
    /// in release builds. Debug builds fall back to ephemeral secrets so
    /// local runs work out of the box; every restart then invalidates all
    /// outstanding tokens.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host: IpAddr = parse_or(&lookup, "HOST", "0.0.0.0")?;
        let port: u16 = parse_or(&lookup, "PORT", "8080")?;
        let access_ttl = Duration::from_secs(parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", "900")?);
        let refresh_ttl =
            Duration::from_secs(parse_or(&lookup, "REFRESH_TOKEN_TTL_SECS", "604800")?);
        let lockout = LockoutPolicy {
            max_attempts: parse_or(&lookup, "MAX_LOGIN_ATTEMPTS", "5")?,
            lock_duration: Duration::from_secs(parse_or(&lookup, "LOCK_DURATION_SECS", "900")?),
        };

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            database_url: lookup("DATABASE_URL"),
            access_secret: secret(&lookup, "JWT_ACCESS_SECRET")?,
            refresh_secret: secret(&lookup, "JWT_REFRESH_SECRET")?,
            access_ttl,
            refresh_ttl,
            lockout,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_owned());
    raw.parse()
        .map_err(|err: T::Err| ConfigError::Invalid(name, err.to_string()))
}

fn secret(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Zeroizing<String>, ConfigError> {
    if let Some(value) = lookup(name) {
        return Ok(Zeroizing::new(value));
    }
    if cfg!(debug_assertions) {
        tracing::warn!(variable = name, "using an ephemeral token secret (dev only)");
        let generated: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();
        return Ok(Zeroizing::new(generated));
    }
    Err(ConfigError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(entries: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = entries.iter().copied().collect();
        move |name| map.get(name).map(|value| (*value).to_owned())
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_ACCESS_SECRET", "a-secret"),
            ("JWT_REFRESH_SECRET", "b-secret"),
        ]))
        .expect("config");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.access_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_ttl, Duration::from_secs(604_800));
        assert_eq!(config.lockout.max_attempts, 5);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn overrides_are_honoured() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_ACCESS_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "b"),
            ("PORT", "9090"),
            ("MAX_LOGIN_ATTEMPTS", "3"),
            ("LOCK_DURATION_SECS", "60"),
            ("DATABASE_URL", "postgres://localhost/echallan"),
        ]))
        .expect("config");
        assert_eq!(config.bind_addr.port(), 9090);
        assert_eq!(config.lockout.max_attempts, 3);
        assert_eq!(config.lockout.lock_duration, Duration::from_secs(60));
        assert!(config.database_url.is_some());
    }

    #[test]
    fn bad_numbers_are_refused() {
        let result = AppConfig::from_lookup(lookup(&[
            ("JWT_ACCESS_SECRET", "a"),
            ("JWT_REFRESH_SECRET", "b"),
            ("PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid("PORT", _))));
    }
}
