use sqlx::{Connection, PgConnection};
use tracing::info;

use dbinit_core::config::DatabaseConfig;
use dbinit_core::error::{DbInitError, Result};

use super::PgSession;

/// Open a single session for the configured database.
///
/// The connect timeout bounds establishment only; statements run without a
/// client-side deadline.
pub async fn connect(config: &DatabaseConfig) -> Result<PgSession> {
    info!(
        "Connecting to database: {} at {}:{}",
        config.database, config.host, config.port
    );

    let options = config.connect_options();
    let timeout = config.connect_timeout();

    let conn = tokio::time::timeout(timeout, PgConnection::connect_with(&options))
        .await
        .map_err(|_| {
            DbInitError::Connection(format!(
                "Timed out after {}s connecting to {}:{}",
                timeout.as_secs(),
                config.host,
                config.port
            ))
        })?
        .map_err(|e| DbInitError::Connection(e.to_string()))?;

    info!("Connected successfully");
    Ok(PgSession::new(conn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Port 1 on loopback is never a Postgres server
        let config = DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 1,
            database: "app".into(),
            user: "admin".into(),
            ssl_mode: dbinit_core::SslMode::Disable,
            connect_timeout_secs: 5,
            ..Default::default()
        };

        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, DbInitError::Connection(_)));
    }
}
