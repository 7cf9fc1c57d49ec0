mod database;

pub use database::{DatabaseConfig, SslMode};

use crate::error::{DbInitError, Result};

impl DatabaseConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD` and the
    /// optional `DB_SSL_MODE`, `DB_CONNECT_TIMEOUT_SECS`, `DB_SCHEMA`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| DbInitError::Config(format!("{} is not set", key)))
        };

        let host = strip_port(&require("DB_HOST")?).to_string();
        if host.is_empty() {
            return Err(DbInitError::Config("DB_HOST has an empty host name".into()));
        }

        // An unparsable port falls back to the default rather than failing.
        let port = get("DB_PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or_else(database::default_port);

        let ssl_mode = match get("DB_SSL_MODE") {
            Some(raw) => SslMode::parse(&raw)
                .ok_or_else(|| DbInitError::Config(format!("Unknown DB_SSL_MODE: {}", raw)))?,
            None => SslMode::default(),
        };

        let connect_timeout_secs = match get("DB_CONNECT_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DbInitError::Config(format!("Invalid DB_CONNECT_TIMEOUT_SECS: {}", raw))
            })?,
            None => database::default_connect_timeout(),
        };

        Ok(Self {
            host,
            port,
            database: require("DB_NAME")?,
            user: require("DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            ssl_mode,
            connect_timeout_secs,
            schema: get("DB_SCHEMA").unwrap_or_else(database::default_schema),
        })
    }
}

/// Drop a trailing `:port` from a host value such as `db.internal:5432`.
fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or(host).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_NAME", "app"),
            ("DB_USER", "admin"),
            ("DB_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "app");
        assert_eq!(config.user, "admin");
        assert_eq!(config.password, "secret");
        assert_eq!(config.ssl_mode, SslMode::Require);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn test_host_port_suffix_is_stripped() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "cluster.example.com:5432"),
            ("DB_PORT", "6432"),
            ("DB_NAME", "app"),
            ("DB_USER", "admin"),
        ]))
        .unwrap();

        assert_eq!(config.host, "cluster.example.com");
        assert_eq!(config.port, 6432);
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "not-a-port"),
            ("DB_NAME", "app"),
            ("DB_USER", "admin"),
        ]))
        .unwrap();

        assert_eq!(config.port, 5432);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = DatabaseConfig::from_lookup(lookup(&[("DB_HOST", "db"), ("DB_USER", "admin")]))
            .unwrap_err();
        assert!(matches!(err, DbInitError::Config(ref m) if m.contains("DB_NAME")));
    }

    #[test]
    fn test_optional_overrides() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db"),
            ("DB_NAME", "app"),
            ("DB_USER", "admin"),
            ("DB_SSL_MODE", "disable"),
            ("DB_CONNECT_TIMEOUT_SECS", "5"),
            ("DB_SCHEMA", "tenant_a"),
        ]))
        .unwrap();

        assert_eq!(config.ssl_mode, SslMode::Disable);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.schema, "tenant_a");
    }

    #[test]
    fn test_unknown_ssl_mode() {
        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DB_HOST", "db"),
            ("DB_NAME", "app"),
            ("DB_USER", "admin"),
            ("DB_SSL_MODE", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DbInitError::Config(_)));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("host:5432"), "host");
        assert_eq!(strip_port("host"), "host");
    }
}
