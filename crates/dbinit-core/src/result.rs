use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::DbInitError;

/// Terminal status of one provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    Ok,
    Error,
}

/// Which stage of the run produced the primary error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Config,
    Connection,
    DdlExecution,
    Transaction,
    Catalog,
}

impl FailureKind {
    /// Map a primary error onto its failure kind.
    ///
    /// Rollback and release errors are never primary; they map to the
    /// transaction stage if one is ever passed here.
    pub fn of(error: &DbInitError) -> Self {
        match error {
            DbInitError::Config(_) => Self::Config,
            DbInitError::Connection(_) => Self::Connection,
            DbInitError::DdlExecution { .. } => Self::DdlExecution,
            DbInitError::Catalog(_) => Self::Catalog,
            DbInitError::Transaction(_)
            | DbInitError::Rollback(_)
            | DbInitError::Release(_)
            | DbInitError::Sql(_) => Self::Transaction,
        }
    }
}

/// Details of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub kind: FailureKind,
    /// The primary error message, as reported by the engine.
    pub message: String,
    /// Label of the step that failed, when a step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Whether a rollback was issued.
    pub rollback_attempted: bool,
    /// Whether the issued rollback succeeded.
    pub rolled_back: bool,
    /// Secondary diagnostic when rollback itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_error: Option<String>,
}

impl ApplyFailure {
    /// A failure for which no rollback was issued: before a transaction was
    /// opened, or after it was already committed.
    pub fn without_rollback(error: &DbInitError) -> Self {
        Self {
            kind: FailureKind::of(error),
            message: error.message(),
            step: step_of(error),
            rollback_attempted: false,
            rolled_back: false,
            rollback_error: None,
        }
    }

    /// A failure inside the transaction, with the outcome of the rollback.
    pub fn with_rollback(error: &DbInitError, rollback: std::result::Result<(), DbInitError>) -> Self {
        let rollback_error = rollback.err().map(|e| e.message());
        Self {
            kind: FailureKind::of(error),
            message: error.message(),
            step: step_of(error),
            rollback_attempted: true,
            rolled_back: rollback_error.is_none(),
            rollback_error,
        }
    }
}

fn step_of(error: &DbInitError) -> Option<String> {
    match error {
        DbInitError::DdlExecution { step, .. } => Some(step.clone()),
        _ => None,
    }
}

/// Outcome of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaApplyResult {
    pub status: ApplyStatus,
    /// Tables in the target schema after commit, ascending.
    #[serde(default)]
    pub tables: Vec<String>,
    pub database: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ApplyFailure>,
    /// Diagnostic when closing the connection failed. Never affects `status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
}

impl SchemaApplyResult {
    pub fn success(database: impl Into<String>, host: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            status: ApplyStatus::Ok,
            tables,
            database: database.into(),
            host: host.into(),
            failure: None,
            release_error: None,
        }
    }

    pub fn failed(database: impl Into<String>, host: impl Into<String>, failure: ApplyFailure) -> Self {
        Self {
            status: ApplyStatus::Error,
            tables: Vec::new(),
            database: database.into(),
            host: host.into(),
            failure: Some(failure),
            release_error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ApplyStatus::Ok
    }

    /// Primary error message, if the run failed.
    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }

    /// Map this result onto a status-coded response envelope.
    pub fn to_response(&self) -> ProvisionResponse {
        match &self.failure {
            None => ProvisionResponse {
                status_code: 200,
                body: json!({
                    "message": "All tables created successfully",
                    "tables": self.tables,
                    "database": self.database,
                    "host": self.host,
                }),
            },
            Some(failure) => ProvisionResponse {
                status_code: 500,
                body: json!({
                    "error": "Database error",
                    "message": failure.message,
                }),
            },
        }
    }
}

/// Status-coded envelope handed back to an external invoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    pub status_code: u16,
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let result = SchemaApplyResult::success(
            "app",
            "db.internal",
            vec!["user_profiles".into(), "users".into()],
        );
        assert!(result.is_ok());

        let response = result.to_response();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["message"], "All tables created successfully");
        assert_eq!(response.body["tables"][1], "users");
        assert_eq!(response.body["database"], "app");
        assert_eq!(response.body["host"], "db.internal");
    }

    #[test]
    fn test_failure_response_keeps_primary_message() {
        let error = DbInitError::ddl("0002_user_profiles: create table user_profiles", "boom");
        let failure = ApplyFailure::with_rollback(
            &error,
            Err(DbInitError::Rollback("connection reset".into())),
        );
        let result = SchemaApplyResult::failed("app", "db", failure);

        assert!(!result.is_ok());
        assert_eq!(result.error_message(), Some("boom"));

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.kind, FailureKind::DdlExecution);
        assert!(failure.rollback_attempted);
        assert!(!failure.rolled_back);
        assert_eq!(failure.rollback_error.as_deref(), Some("connection reset"));
        assert_eq!(
            failure.step.as_deref(),
            Some("0002_user_profiles: create table user_profiles")
        );

        let response = result.to_response();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body["error"], "Database error");
        assert_eq!(response.body["message"], "boom");
    }

    #[test]
    fn test_connection_failure_has_no_rollback() {
        let error = DbInitError::Connection("timed out".into());
        let failure = ApplyFailure::without_rollback(&error);
        assert_eq!(failure.kind, FailureKind::Connection);
        assert!(!failure.rollback_attempted);
        assert!(failure.step.is_none());
    }

    #[test]
    fn test_result_serializes_snake_case() {
        let error = DbInitError::Catalog("relation missing".into());
        let result = SchemaApplyResult::failed("app", "db", ApplyFailure::without_rollback(&error));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["failure"]["kind"], "catalog");
        assert!(value.get("release_error").is_none());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let response = SchemaApplyResult::success("app", "db", vec![]).to_response();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 200);
    }
}
