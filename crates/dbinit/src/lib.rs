//! dbinit - idempotent, transactional schema provisioning for Postgres.
//!
//! [`provision`] connects with the configured timeout, applies the built-in
//! user schema in a single transaction and always returns a well-formed
//! [`SchemaApplyResult`].

use tracing::error;

pub use dbinit_core::{
    ApplyFailure, ApplyStatus, DatabaseConfig, DbInitError, FailureKind, MigrationPlan,
    MigrationStep, ProvisionResponse, SchemaApplyResult, SslMode, StepKind,
};
pub use dbinit_runtime::{connect, user_schema_plan, PgSession, SchemaApplier, SchemaSession};

/// Provision the built-in user schema.
pub async fn provision(config: &DatabaseConfig) -> SchemaApplyResult {
    match user_schema_plan() {
        Ok(plan) => provision_plan(config, &plan).await,
        Err(e) => {
            error!("Invalid built-in migrations: {}", e);
            SchemaApplyResult::failed(
                &config.database,
                &config.host,
                ApplyFailure::without_rollback(&e),
            )
        }
    }
}

/// Provision an arbitrary plan.
pub async fn provision_plan(config: &DatabaseConfig, plan: &MigrationPlan) -> SchemaApplyResult {
    let session = match connect(config).await {
        Ok(session) => session,
        Err(e) => {
            error!("Database error: {}", e);
            return SchemaApplyResult::failed(
                &config.database,
                &config.host,
                ApplyFailure::without_rollback(&e),
            );
        }
    };

    SchemaApplier::for_config(config).apply(session, plan).await
}
