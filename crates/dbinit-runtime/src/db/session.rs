use sqlx::{Connection, PgConnection};
use tracing::debug;

use dbinit_core::error::DbInitError;

use crate::migrations::{SchemaSession, SessionFuture};

const TABLE_NAMES_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1
    ORDER BY table_name::text COLLATE "C"
"#;

/// Schema session over a single Postgres connection.
///
/// Transaction boundaries are issued as plain `BEGIN` / `COMMIT` /
/// `ROLLBACK` so the connection itself is never borrowed by a guard type.
pub struct PgSession {
    conn: PgConnection,
}

impl PgSession {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    /// Connect directly from a URL.
    pub async fn connect_url(url: &str) -> dbinit_core::Result<Self> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(|e| DbInitError::Connection(e.to_string()))?;
        Ok(Self::new(conn))
    }

    async fn control(&mut self, statement: &'static str) -> dbinit_core::Result<()> {
        sqlx::query(statement)
            .execute(&mut self.conn)
            .await
            .map_err(|e| DbInitError::Transaction(format!("{} failed: {}", statement, e)))?;
        debug!("{}", statement);
        Ok(())
    }
}

impl SchemaSession for PgSession {
    fn begin(&mut self) -> SessionFuture<'_, ()> {
        Box::pin(self.control("BEGIN"))
    }

    fn execute<'a>(&'a mut self, sql: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(sql).execute(&mut self.conn).await?;
            Ok(())
        })
    }

    fn commit(&mut self) -> SessionFuture<'_, ()> {
        Box::pin(self.control("COMMIT"))
    }

    fn rollback(&mut self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("ROLLBACK")
                .execute(&mut self.conn)
                .await
                .map_err(|e| DbInitError::Rollback(e.to_string()))?;
            Ok(())
        })
    }

    fn table_names<'a>(&'a mut self, schema: &'a str) -> SessionFuture<'a, Vec<String>> {
        Box::pin(async move {
            let rows: Vec<(String,)> = sqlx::query_as(TABLE_NAMES_SQL)
                .bind(schema)
                .fetch_all(&mut self.conn)
                .await
                .map_err(|e| DbInitError::Catalog(e.to_string()))?;

            Ok(rows.into_iter().map(|(name,)| name).collect())
        })
    }

    fn close(self) -> SessionFuture<'static, ()> {
        Box::pin(async move {
            self.conn
                .close()
                .await
                .map_err(|e| DbInitError::Release(e.to_string()))
        })
    }
}
