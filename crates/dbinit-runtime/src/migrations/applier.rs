//! Transactional schema applier.
//!
//! Runs an ordered plan inside one transaction on one session. Any failure
//! before commit rolls the whole plan back. The session is closed exactly
//! once whatever the outcome, and every error ends up in the returned
//! [`SchemaApplyResult`] rather than being propagated.

use tracing::{debug, error, info, warn};

use dbinit_core::config::DatabaseConfig;
use dbinit_core::error::{DbInitError, Result};
use dbinit_core::migration::MigrationPlan;
use dbinit_core::result::{ApplyFailure, SchemaApplyResult};

use super::session::SchemaSession;

/// Applies a migration plan and reports the resulting tables.
#[derive(Debug, Clone)]
pub struct SchemaApplier {
    database: String,
    host: String,
    schema: String,
}

impl SchemaApplier {
    /// Create an applier reporting the given identifiers, listing `public`.
    pub fn new(database: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            host: host.into(),
            schema: "public".to_string(),
        }
    }

    pub fn for_config(config: &DatabaseConfig) -> Self {
        Self::new(&config.database, &config.host).with_schema(&config.schema)
    }

    /// Schema whose tables are listed after commit.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Apply `plan` on `session`, then close the session.
    pub async fn apply<S: SchemaSession>(&self, mut session: S, plan: &MigrationPlan) -> SchemaApplyResult {
        let guard = SessionGuard::new();

        let mut result = self.run(&mut session, plan).await;

        if let Err(e) = guard.release(session).await {
            error!("Error closing connection: {}", e);
            result.release_error = Some(e.message());
        }

        result
    }

    async fn run<S: SchemaSession>(&self, session: &mut S, plan: &MigrationPlan) -> SchemaApplyResult {
        if let Err(e) = plan.validate() {
            error!("Refusing to apply plan: {}", e);
            return self.failed(ApplyFailure::without_rollback(&e));
        }

        if let Err(e) = apply_in_transaction(session, plan).await {
            error!("Database error: {}", e);

            let rollback = session.rollback().await;
            match &rollback {
                Ok(()) => warn!("Transaction rolled back"),
                Err(re) => error!("Rollback error: {}", re),
            }

            return self.failed(ApplyFailure::with_rollback(&e, rollback));
        }

        match session.table_names(&self.schema).await {
            Ok(tables) => {
                info!("Tables in {}: {:?}", self.schema, tables);
                SchemaApplyResult::success(&self.database, &self.host, tables)
            }
            Err(e) => {
                error!("Failed to list tables after commit: {}", e);
                let e = match e {
                    DbInitError::Catalog(_) => e,
                    other => DbInitError::Catalog(other.message()),
                };
                self.failed(ApplyFailure::without_rollback(&e))
            }
        }
    }

    fn failed(&self, failure: ApplyFailure) -> SchemaApplyResult {
        SchemaApplyResult::failed(&self.database, &self.host, failure)
    }
}

/// Begin, run every step in order, commit. Stops at the first failure.
async fn apply_in_transaction<S: SchemaSession>(session: &mut S, plan: &MigrationPlan) -> Result<()> {
    session.begin().await?;
    debug!("Transaction started for {} steps", plan.len());

    for step in plan {
        session
            .execute(step.sql())
            .await
            .map_err(|e| DbInitError::ddl(step.label(), e.message()))?;
        info!("Applied step {}: {}", step.position(), step.label());
    }

    session.commit().await?;
    info!("All migrations committed successfully");
    Ok(())
}

/// Tracks the release of the session for one apply.
///
/// `release` consumes the session and closes it. If the apply future is
/// dropped first, the session is dropped alongside this guard, which discards
/// the connection, and the guard logs it.
struct SessionGuard {
    released: bool,
}

impl SessionGuard {
    fn new() -> Self {
        Self { released: false }
    }

    async fn release<S: SchemaSession>(mut self, session: S) -> Result<()> {
        self.released = true;
        session.close().await?;
        info!("Database connection closed");
        Ok(())
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!("Schema session dropped before release, discarding connection");
        }
    }
}
