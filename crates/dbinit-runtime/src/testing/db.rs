//! Explicit database provisioning for tests.
//!
//! Database tests only run against `TEST_DATABASE_URL`, never `DATABASE_URL`
//! or the `DB_*` variables the binary reads, so a test run cannot touch a
//! real deployment by accident.

use sqlx::PgPool;

use dbinit_core::error::{DbInitError, Result};

/// Explicit database access for tests.
pub struct TestDatabase {
    pool: PgPool,
    url: String,
}

impl TestDatabase {
    /// Connect to database at the given URL.
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await
            .map_err(DbInitError::Sql)?;

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Connect using the TEST_DATABASE_URL environment variable.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var("TEST_DATABASE_URL").map_err(|_| {
            DbInitError::Config(
                "TEST_DATABASE_URL not set. Set it explicitly for database tests.".to_string(),
            )
        })?;
        Self::from_url(&url).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create a dedicated, empty database for a single test.
    pub async fn isolated(&self, test_name: &str) -> Result<IsolatedTestDb> {
        // UUID suffix prevents collisions when tests run in parallel
        let db_name = format!(
            "dbinit_test_{}_{}",
            sanitize_db_name(test_name),
            uuid::Uuid::new_v4().simple()
        );

        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&self.pool)
            .await
            .map_err(DbInitError::Sql)?;

        let url = replace_db_name(&self.url, &db_name);
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .map_err(DbInitError::Sql)?;

        Ok(IsolatedTestDb {
            pool,
            db_name,
            url,
            base_url: self.url.clone(),
        })
    }
}

/// A database that exists for the lifetime of a single test.
///
/// Call `cleanup()` at the end of the test to drop it.
pub struct IsolatedTestDb {
    pool: PgPool,
    db_name: String,
    url: String,
    base_url: String,
}

impl IsolatedTestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Connection URL for this database.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run raw SQL, e.g. to insert fixtures.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(DbInitError::Sql)?;
        Ok(())
    }

    /// Drop the database.
    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .map_err(DbInitError::Sql)?;

        // Sessions left open by a failed assertion would block the drop
        let _ = sqlx::query(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1",
        )
        .bind(&self.db_name)
        .execute(&pool)
        .await;

        sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\"", self.db_name))
            .execute(&pool)
            .await
            .map_err(DbInitError::Sql)?;

        Ok(())
    }
}

/// Sanitize a test name for use in a database name.
fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(32)
        .collect()
}

/// Replace the database name in a connection URL.
fn replace_db_name(url: &str, new_db: &str) -> String {
    let (base, query) = match url.find('?') {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };

    match base.rfind('/') {
        // `scheme://host` has no path component yet
        Some(idx) if !base[..idx].ends_with('/') => {
            format!("{}{}{}", &base[..=idx], new_db, query)
        }
        _ => format!("{}/{}{}", base, new_db, query),
    }
}
